//! Access to the live state of an iocost hierarchy.

use std::{fmt::Debug, io, path::PathBuf};

use thiserror::Error;

use crate::IocConstants;

/// Identity of a request queue.
///
/// The accounting nodes of a hierarchy member are indexed by queue, one per block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueId(pub u64);

/// What a device name resolves to.
#[derive(Debug, Clone)]
pub struct DeviceBinding<M, C> {
    /// Root of the hierarchy of accounting nodes.
    pub root: M,
    /// Queue of the device, used to look up the accounting node of each member.
    pub queue: QueueId,
    /// The iocost controller attached to the device.
    pub controller: C,
}

/// Raw counters of an iocost controller (`struct ioc`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawController {
    pub enabled: bool,
    /// Raw running state, compare it to [`IocConstants::ioc_running`].
    pub running: u64,
    pub period_us: u64,
    /// Start of the current period, in microseconds.
    pub period_at: u64,
    /// Start of the current period, in virtual time.
    pub period_at_vtime: u64,
    /// Virtual time per microsecond at the current rate.
    pub vtime_rate: u64,
    pub busy_level: i64,
    pub autop_idx: u64,
    pub user_cost_model: bool,
    pub user_qos_params: bool,
}

/// Raw counters of an accounting node (`struct ioc_gq` and its `blkcg_gq`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNode {
    /// Opaque identity of the node, only used for display and joins.
    pub id: u64,
    /// Whether the node is on the active list of its controller.
    pub is_active: bool,
    pub weight: u64,
    pub active: u64,
    pub inuse: u64,
    pub hweight_active: u64,
    pub hweight_inuse: u64,
    pub vtime: u64,
    pub done_vtime: u64,
    pub abs_vdebt: u64,
    pub use_delay: i64,
    pub delay_nsec: u64,
    /// Write cursor of `usages`.
    pub usage_idx: u64,
    /// Usage history, in storage order.
    pub usages: Vec<u64>,
}

/// Source of point-in-time values of an iocost hierarchy.
///
/// Every read returns the current value: nothing is cached between two calls,
/// and the inspected system may change between them.
pub trait SnapshotProvider {
    /// Member of the hierarchy (a cgroup).
    type Member: Clone + Debug;
    /// Accounting node of a member for one device.
    type Node: Debug;
    /// Controller of one device.
    type Controller: Debug;

    fn constants(&self) -> &IocConstants;

    /// Finds the hierarchy root, the queue and the controller of the block device `device`.
    fn resolve_device(&self, device: &str) -> Result<DeviceBinding<Self::Member, Self::Controller>, ProviderError>;

    /// Returns the name of a member. The root of the hierarchy has an empty name.
    fn member_name(&self, member: &Self::Member) -> Result<String, ProviderError>;

    /// Returns `true` if the member is online, `false` if it is dying.
    fn is_online(&self, member: &Self::Member) -> Result<bool, ProviderError>;

    /// Returns the children of a member, in the native sibling order.
    fn children(&self, member: &Self::Member) -> Result<Vec<Self::Member>, ProviderError>;

    /// Looks up the accounting node of `member` for the device of `queue`.
    fn lookup_node(&self, member: &Self::Member, queue: QueueId) -> Result<Option<Self::Node>, ProviderError>;

    fn read_controller(&self, controller: &Self::Controller) -> Result<RawController, ProviderError>;

    fn read_node(&self, node: &Self::Node) -> Result<RawNode, ProviderError>;
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("block device {0} not found")]
    DeviceNotFound(String),
    #[error("could not find ioc for {0}")]
    NoController(String),
    #[error("unknown hierarchy member {0}")]
    UnknownMember(String),
    #[error("could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("key {key} is missing from {}", path.display())]
    MissingKey { path: PathBuf, key: String },
    #[error("invalid value {value:?} for key {key} in {}", path.display())]
    InvalidValue { path: PathBuf, key: String, value: String },
    #[error("usage history has {actual} slots, expected {expected}")]
    BadRingLength { expected: usize, actual: usize },
}

impl ProviderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
