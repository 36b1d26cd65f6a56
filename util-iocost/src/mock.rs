//! In-memory hierarchy, for the tests of this crate and of its users.
//!
//! Enabled by the `manually` feature. A [`MockHierarchy`] can also write itself as a
//! snapshot tree, to test [`FsSnapshot`](crate::FsSnapshot) and the binaries that read one.

use std::{fs, io, path::Path};

use rustc_hash::FxHashMap;

use crate::{
    fs::{controller_file_name, node_file_name, DEVICES_FILE, ONLINE_FILE},
    DeviceBinding, IocConstants, ProviderError, QueueId, RawController, RawNode, SnapshotProvider,
};

/// Index of a member in a [`MockHierarchy`].
pub type MockMember = usize;

/// Accounting node of a [`MockHierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockNode {
    pub member: MockMember,
    pub queue: QueueId,
}

#[derive(Debug)]
struct MemberState {
    name: String,
    online: bool,
    broken: bool,
    children: Vec<MockMember>,
}

#[derive(Debug)]
struct DeviceState {
    queue: QueueId,
    controller: Option<RawController>,
}

/// In-memory hierarchy, for tests.
///
/// The root member (index `0`) is created with the hierarchy.
#[derive(Debug)]
pub struct MockHierarchy {
    constants: IocConstants,
    members: Vec<MemberState>,
    devices: FxHashMap<String, DeviceState>,
    nodes: FxHashMap<(MockMember, QueueId), RawNode>,
}

impl Default for MockHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHierarchy {
    pub const ROOT: MockMember = 0;

    pub fn new() -> Self {
        Self {
            constants: IocConstants::default(),
            members: vec![MemberState {
                name: String::new(),
                online: true,
                broken: false,
                children: Vec::new(),
            }],
            devices: FxHashMap::default(),
            nodes: FxHashMap::default(),
        }
    }

    pub fn constants_mut(&mut self) -> &mut IocConstants {
        &mut self.constants
    }

    /// Adds an online member below `parent`, after its existing children.
    pub fn add_member(&mut self, parent: MockMember, name: &str) -> MockMember {
        let id = self.members.len();
        self.members.push(MemberState {
            name: name.to_owned(),
            online: true,
            broken: false,
            children: Vec::new(),
        });
        self.members[parent].children.push(id);
        id
    }

    pub fn set_online(&mut self, member: MockMember, online: bool) {
        self.members[member].online = online;
    }

    /// Makes every lookup on `member` fail, as if it vanished during the walk.
    pub fn set_broken(&mut self, member: MockMember, broken: bool) {
        self.members[member].broken = broken;
    }

    /// Declares a block device, with or without an iocost controller.
    pub fn add_device(&mut self, name: &str, queue: QueueId, controller: Option<RawController>) {
        self.devices
            .insert(name.to_owned(), DeviceState { queue, controller });
    }

    /// Replaces the controller counters of the device attached to `queue`.
    pub fn set_controller(&mut self, queue: QueueId, controller: Option<RawController>) {
        for device in self.devices.values_mut() {
            if device.queue == queue {
                device.controller = controller.clone();
            }
        }
    }

    pub fn set_node(&mut self, member: MockMember, queue: QueueId, node: RawNode) {
        self.nodes.insert((member, queue), node);
    }

    pub fn remove_node(&mut self, member: MockMember, queue: QueueId) {
        self.nodes.remove(&(member, queue));
    }

    fn member(&self, member: MockMember) -> Result<&MemberState, ProviderError> {
        match self.members.get(member) {
            Some(m) if !m.broken => Ok(m),
            _ => Err(ProviderError::UnknownMember(member.to_string())),
        }
    }

    /// Writes the hierarchy as a snapshot tree rooted at `root`, in the format read by
    /// [`FsSnapshot`](crate::FsSnapshot). Broken members are written like the others.
    pub fn write_tree(&self, root: &Path) -> io::Result<()> {
        fs::create_dir_all(root)?;
        let mut devices = String::new();
        for (name, device) in &self.devices {
            devices.push_str(&format!("{name} {}\n", device.queue.0));
            if let Some(controller) = &device.controller {
                controller.write_to(&root.join(controller_file_name(device.queue)))?;
            }
        }
        fs::write(root.join(DEVICES_FILE), devices)?;
        self.write_member(Self::ROOT, root)
    }

    fn write_member(&self, member: MockMember, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        let state = &self.members[member];
        if !state.online {
            fs::write(dir.join(ONLINE_FILE), "0\n")?;
        }
        for ((m, queue), node) in &self.nodes {
            if *m == member {
                node.write_to(&dir.join(node_file_name(*queue)))?;
            }
        }
        for child in &state.children {
            self.write_member(*child, &dir.join(&self.members[*child].name))?;
        }
        Ok(())
    }
}

impl SnapshotProvider for MockHierarchy {
    type Member = MockMember;
    type Node = MockNode;
    type Controller = QueueId;

    fn constants(&self) -> &IocConstants {
        &self.constants
    }

    fn resolve_device(&self, device: &str) -> Result<DeviceBinding<MockMember, QueueId>, ProviderError> {
        let state = self
            .devices
            .get(device)
            .ok_or_else(|| ProviderError::DeviceNotFound(device.to_owned()))?;
        if state.controller.is_none() {
            return Err(ProviderError::NoController(device.to_owned()));
        }
        Ok(DeviceBinding {
            root: Self::ROOT,
            queue: state.queue,
            controller: state.queue,
        })
    }

    fn member_name(&self, member: &MockMember) -> Result<String, ProviderError> {
        Ok(self.member(*member)?.name.clone())
    }

    fn is_online(&self, member: &MockMember) -> Result<bool, ProviderError> {
        Ok(self.member(*member)?.online)
    }

    fn children(&self, member: &MockMember) -> Result<Vec<MockMember>, ProviderError> {
        Ok(self.member(*member)?.children.clone())
    }

    fn lookup_node(&self, member: &MockMember, queue: QueueId) -> Result<Option<MockNode>, ProviderError> {
        self.member(*member)?;
        Ok(self.nodes.contains_key(&(*member, queue)).then_some(MockNode {
            member: *member,
            queue,
        }))
    }

    fn read_controller(&self, controller: &QueueId) -> Result<RawController, ProviderError> {
        self.devices
            .iter()
            .find(|(_, d)| d.queue == *controller)
            .and_then(|(_, d)| d.controller.clone())
            .ok_or_else(|| ProviderError::NoController(format!("queue {}", controller.0)))
    }

    fn read_node(&self, node: &MockNode) -> Result<RawNode, ProviderError> {
        self.nodes
            .get(&(node.member, node.queue))
            .cloned()
            .ok_or_else(|| ProviderError::UnknownMember(node.member.to_string()))
    }
}

/// Raw counters that can be written to a flat keyed file.
pub trait MockKeyedFile {
    fn to_keyed_string(&self) -> String;

    fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_keyed_string())
    }
}

impl MockKeyedFile for RawController {
    fn to_keyed_string(&self) -> String {
        format!(
            "enabled {}
running {}
period_us {}
period_at {}
period_at_vtime {}
vtime_rate {}
busy_level {}
autop_idx {}
user_cost_model {}
user_qos_params {}
",
            u8::from(self.enabled),
            self.running,
            self.period_us,
            self.period_at,
            self.period_at_vtime,
            self.vtime_rate,
            self.busy_level,
            self.autop_idx,
            u8::from(self.user_cost_model),
            u8::from(self.user_qos_params),
        )
    }
}

impl MockKeyedFile for RawNode {
    /// The identity of the node is not written: it is given by the file itself.
    fn to_keyed_string(&self) -> String {
        let usages: Vec<String> = self.usages.iter().map(u64::to_string).collect();
        format!(
            "active_list {}
weight {}
active {}
inuse {}
hweight_active {}
hweight_inuse {}
vtime {}
done_vtime {}
abs_vdebt {}
use_delay {}
delay_nsec {}
usage_idx {}
usages {}
",
            u8::from(self.is_active),
            self.weight,
            self.active,
            self.inuse,
            self.hweight_active,
            self.hweight_inuse,
            self.vtime,
            self.done_vtime,
            self.abs_vdebt,
            self.use_delay,
            self.delay_nsec,
            self.usage_idx,
            usages.join(" "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::KeyedContent;
    use pretty_assertions::assert_eq;

    #[test]
    fn keyed_node_parses_back() -> anyhow::Result<()> {
        let node = RawNode {
            is_active: true,
            weight: 100,
            use_delay: -1,
            usages: vec![1, 2, 3],
            ..Default::default()
        };
        let s = node.to_keyed_string();
        let keyed = KeyedContent::parse("iocg.1", &s);
        assert!(keyed.flag("active_list")?);
        assert_eq!(keyed.get::<u64>("weight")?, 100);
        assert_eq!(keyed.get::<i64>("use_delay")?, -1);
        assert_eq!(keyed.list::<u64>("usages")?, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn resolve() {
        let mut h = MockHierarchy::new();
        h.add_device("sda", QueueId(3), Some(RawController::default()));
        h.add_device("sdb", QueueId(4), None);
        let binding = h.resolve_device("sda").unwrap();
        assert_eq!(binding.queue, QueueId(3));
        assert_eq!(binding.root, MockHierarchy::ROOT);
        assert!(matches!(h.resolve_device("sdb"), Err(ProviderError::NoController(_))));
        assert!(matches!(h.resolve_device("nvme0n1"), Err(ProviderError::DeviceNotFound(_))));
    }
}
