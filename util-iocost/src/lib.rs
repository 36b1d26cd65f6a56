// Prevent compiling outside of Linux: blk-iocost and cgroups only exist on Linux.
#[cfg(not(target_os = "linux"))]
compile_error!("only Linux is supported");

pub mod constants;
pub mod fs;
pub mod parse;
pub mod provider;
pub mod walk;

#[cfg(any(test, feature = "manually"))]
pub mod mock;

// re-exports
pub use constants::{AutoProfile, IocConstants};
pub use fs::FsSnapshot;
pub use provider::{DeviceBinding, ProviderError, QueueId, RawController, RawNode, SnapshotProvider};
pub use walk::{walk, WalkedNode};
