//! Constants of the blk-iocost implementation.

/// Constants of the blk-iocost implementation that produced a snapshot.
///
/// The kernel does not export them in a stable way, therefore they are part of
/// what a [`SnapshotProvider`](crate::SnapshotProvider) gives to its users.
/// The [`Default`] values are those of mainline `block/blk-iocost.c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IocConstants {
    /// Value of `ioc->running` when the controller is running.
    pub ioc_running: u64,
    /// Number of slots in the usage history of an accounting node.
    pub nr_usage_slots: usize,
    /// Fixed-point value of a 100% hierarchical weight.
    pub hweight_whole: u64,
    /// Virtual time units per second, at the nominal rate.
    pub vtime_per_sec: u64,
    /// Virtual time units per microsecond, at the nominal rate.
    pub vtime_per_usec: u64,
    pub autop_hdd: u64,
    pub autop_ssd_qd1: u64,
    pub autop_ssd_dfl: u64,
    pub autop_ssd_fast: u64,
}

const VTIME_PER_SEC_SHIFT: u32 = 37;
const USEC_PER_SEC: u64 = 1_000_000;

impl Default for IocConstants {
    fn default() -> Self {
        let vtime_per_sec = 1u64 << VTIME_PER_SEC_SHIFT;
        Self {
            ioc_running: 1,
            nr_usage_slots: 8,
            hweight_whole: 1 << 16,
            vtime_per_sec,
            vtime_per_usec: vtime_per_sec / USEC_PER_SEC,
            autop_hdd: 1,
            autop_ssd_qd1: 2,
            autop_ssd_dfl: 3,
            autop_ssd_fast: 4,
        }
    }
}

impl IocConstants {
    /// Maps the `autop_idx` of a controller to the profile it designates, if any.
    pub fn auto_profile(&self, autop_idx: u64) -> Option<AutoProfile> {
        match autop_idx {
            i if i == self.autop_ssd_fast => Some(AutoProfile::SsdFast),
            i if i == self.autop_ssd_dfl => Some(AutoProfile::SsdDfl),
            i if i == self.autop_ssd_qd1 => Some(AutoProfile::SsdQd1),
            i if i == self.autop_hdd => Some(AutoProfile::Hdd),
            _ => None,
        }
    }
}

/// Auto-tuned set of cost model and QoS parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoProfile {
    SsdFast,
    SsdDfl,
    SsdQd1,
    Hdd,
}

impl AutoProfile {
    pub fn label(&self) -> &'static str {
        match self {
            AutoProfile::SsdFast => "ssd_fast",
            AutoProfile::SsdDfl => "ssd_dfl",
            AutoProfile::SsdQd1 => "ssd_qd1",
            AutoProfile::Hdd => "hdd",
        }
    }
}
