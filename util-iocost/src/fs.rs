//! Snapshot tree on a filesystem.
//!
//! The directories of the tree mirror the cgroup hierarchy, the root directory being the
//! root cgroup. Every file is in the cgroupfs "flat keyed" format (see [`KeyedContent`]).
//!
//! ```text
//! <root>/iocost.devices       one "<device> <queue id>" line per block device
//! <root>/iocost.constants     optional, overrides the fields of IocConstants
//! <root>/ioc.<queue id>       counters of the controller of a device
//! <dir>/cgroup.online         optional, "0" if the cgroup is dying
//! <dir>/iocg.<queue id>       counters of the accounting node of the cgroup for a device
//! ```
//!
//! The identity of an accounting node is the decimal `address` key of its file if present,
//! the inode of the file otherwise.

use std::{
    io::ErrorKind,
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
};

use crate::{
    parse::{parse_single_u64, read_file, KeyedContent},
    DeviceBinding, IocConstants, ProviderError, QueueId, RawController, RawNode, SnapshotProvider,
};

pub const DEVICES_FILE: &str = "iocost.devices";
pub const CONSTANTS_FILE: &str = "iocost.constants";
pub const ONLINE_FILE: &str = "cgroup.online";

/// Name of the file that holds the counters of the controller of `queue`.
pub fn controller_file_name(queue: QueueId) -> String {
    format!("ioc.{}", queue.0)
}

/// Name of the file that holds the counters of the accounting node of a cgroup for `queue`.
pub fn node_file_name(queue: QueueId) -> String {
    format!("iocg.{}", queue.0)
}

/// A [`SnapshotProvider`] that reads a snapshot tree.
pub struct FsSnapshot {
    root: PathBuf,
    constants: IocConstants,
}

/// Accounting node file of a cgroup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsNode {
    path: PathBuf,
}

impl FsSnapshot {
    /// Opens the snapshot tree rooted at `root`, and loads its constants.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let root: PathBuf = root.into();
        let constants = load_constants(&root.join(CONSTANTS_FILE))?;
        log::debug!("snapshot tree at {}: {constants:?}", root.display());
        Ok(Self { root, constants })
    }
}

fn load_constants(path: &Path) -> Result<IocConstants, ProviderError> {
    let mut constants = IocConstants::default();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(constants),
        Err(e) => return Err(ProviderError::io(path, e)),
    };
    let keyed = KeyedContent::parse(path, &content);
    let overrides: [(&str, &mut u64); 8] = [
        ("ioc_running", &mut constants.ioc_running),
        ("hweight_whole", &mut constants.hweight_whole),
        ("vtime_per_sec", &mut constants.vtime_per_sec),
        ("vtime_per_usec", &mut constants.vtime_per_usec),
        ("autop_hdd", &mut constants.autop_hdd),
        ("autop_ssd_qd1", &mut constants.autop_ssd_qd1),
        ("autop_ssd_dfl", &mut constants.autop_ssd_dfl),
        ("autop_ssd_fast", &mut constants.autop_ssd_fast),
    ];
    for (key, field) in overrides {
        if let Some(value) = keyed.get_opt(key)? {
            *field = value;
        }
    }
    if let Some(slots) = keyed.get_opt("nr_usage_slots")? {
        constants.nr_usage_slots = slots;
    }
    Ok(constants)
}

impl SnapshotProvider for FsSnapshot {
    type Member = PathBuf;
    type Node = FsNode;
    type Controller = PathBuf;

    fn constants(&self) -> &IocConstants {
        &self.constants
    }

    fn resolve_device(&self, device: &str) -> Result<DeviceBinding<PathBuf, PathBuf>, ProviderError> {
        let devices_path = self.root.join(DEVICES_FILE);
        let content = read_file(&devices_path)?;
        let devices = KeyedContent::parse(&devices_path, &content);
        let queue = match devices.get_opt(device)? {
            Some(id) => QueueId(id),
            None => return Err(ProviderError::DeviceNotFound(device.to_owned())),
        };
        let controller = self.root.join(controller_file_name(queue));
        if !controller.is_file() {
            return Err(ProviderError::NoController(device.to_owned()));
        }
        Ok(DeviceBinding {
            root: self.root.clone(),
            queue,
            controller,
        })
    }

    fn member_name(&self, member: &PathBuf) -> Result<String, ProviderError> {
        if member == &self.root {
            return Ok(String::new());
        }
        member
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .ok_or_else(|| ProviderError::UnknownMember(member.display().to_string()))
    }

    fn is_online(&self, member: &PathBuf) -> Result<bool, ProviderError> {
        let path = member.join(ONLINE_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let online = parse_single_u64(&content).map_err(|e| ProviderError::io(&path, e))?;
                Ok(online != 0)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(ProviderError::io(path, e)),
        }
    }

    fn children(&self, member: &PathBuf) -> Result<Vec<PathBuf>, ProviderError> {
        let entries = std::fs::read_dir(member).map_err(|e| ProviderError::io(member, e))?;
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ProviderError::io(member, e))?;
            let file_type = entry.file_type().map_err(|e| ProviderError::io(entry.path(), e))?;
            if file_type.is_dir() {
                children.push(entry.path());
            }
        }
        children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(children)
    }

    fn lookup_node(&self, member: &PathBuf, queue: QueueId) -> Result<Option<FsNode>, ProviderError> {
        let path = member.join(node_file_name(queue));
        match std::fs::metadata(&path) {
            Ok(m) if m.is_file() => Ok(Some(FsNode { path })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ProviderError::io(path, e)),
        }
    }

    fn read_controller(&self, controller: &PathBuf) -> Result<RawController, ProviderError> {
        let content = read_file(controller)?;
        let c = KeyedContent::parse(controller, &content);
        Ok(RawController {
            enabled: c.flag("enabled")?,
            running: c.get("running")?,
            period_us: c.get("period_us")?,
            period_at: c.get("period_at")?,
            period_at_vtime: c.get("period_at_vtime")?,
            vtime_rate: c.get("vtime_rate")?,
            busy_level: c.get("busy_level")?,
            autop_idx: c.get("autop_idx")?,
            user_cost_model: c.flag("user_cost_model")?,
            user_qos_params: c.flag("user_qos_params")?,
        })
    }

    fn read_node(&self, node: &FsNode) -> Result<RawNode, ProviderError> {
        let content = read_file(&node.path)?;
        let n = KeyedContent::parse(&node.path, &content);
        // without an explicit address, the inode identifies the node for the lifetime of the file
        let id = match n.get_opt::<u64>("address")? {
            Some(address) => address,
            None => std::fs::metadata(&node.path)
                .map_err(|e| ProviderError::io(&node.path, e))?
                .ino(),
        };
        let usages: Vec<u64> = n.list("usages")?;
        if usages.len() != self.constants.nr_usage_slots {
            return Err(ProviderError::BadRingLength {
                expected: self.constants.nr_usage_slots,
                actual: usages.len(),
            });
        }
        Ok(RawNode {
            id,
            is_active: n.flag("active_list")?,
            weight: n.get("weight")?,
            active: n.get("active")?,
            inuse: n.get("inuse")?,
            hweight_active: n.get("hweight_active")?,
            hweight_inuse: n.get("hweight_inuse")?,
            vtime: n.get("vtime")?,
            done_vtime: n.get("done_vtime")?,
            abs_vdebt: n.get("abs_vdebt")?,
            use_delay: n.get("use_delay")?,
            delay_nsec: n.get("delay_nsec")?,
            usage_idx: n.get("usage_idx")?,
            usages,
        })
    }
}
