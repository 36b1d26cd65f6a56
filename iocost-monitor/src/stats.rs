//! Statistics derived from the raw counters of a controller and its accounting nodes.

use util_iocost::{AutoProfile, IocConstants, RawController, RawNode};

const USEC_PER_MSEC: f64 = 1_000.0;
const USEC_PER_SEC: f64 = 1_000_000.0;
const NSEC_PER_MSEC: f64 = 1_000_000.0;

/// Statistics of an iocost controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStats {
    pub enabled: bool,
    pub running: bool,
    pub period_ms: f64,
    /// Start of the current period, in seconds.
    pub period_at: f64,
    /// Start of the current period, in seconds of virtual time.
    pub vperiod_at: f64,
    /// Current rate, in percent of the nominal rate.
    pub vrate_pct: f64,
    pub busy_level: i64,
    /// Auto-tuned parameters, `None` if the index is unknown.
    pub profile: Option<AutoProfile>,
    pub user_cost_model: bool,
    pub user_qos_params: bool,
}

/// State of a controller, as displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Off,
    Idle,
    Run,
}

impl ControllerState {
    pub fn label(&self) -> &'static str {
        match self {
            ControllerState::Off => "OFF",
            ControllerState::Idle => "IDLE",
            ControllerState::Run => "RUN",
        }
    }
}

impl ControllerStats {
    pub fn derive(raw: &RawController, constants: &IocConstants) -> Self {
        Self {
            enabled: raw.enabled,
            running: raw.running == constants.ioc_running,
            period_ms: raw.period_us as f64 / USEC_PER_MSEC,
            period_at: raw.period_at as f64 / USEC_PER_SEC,
            vperiod_at: ratio(raw.period_at_vtime as f64, constants.vtime_per_sec as f64),
            vrate_pct: ratio(raw.vtime_rate as f64 * 100.0, constants.vtime_per_usec as f64),
            busy_level: raw.busy_level,
            profile: constants.auto_profile(raw.autop_idx),
            user_cost_model: raw.user_cost_model,
            user_qos_params: raw.user_qos_params,
        }
    }

    pub fn state(&self) -> ControllerState {
        match (self.enabled, self.running) {
            (false, _) => ControllerState::Off,
            (true, false) => ControllerState::Idle,
            (true, true) => ControllerState::Run,
        }
    }

    /// Label of the auto-tuned parameters, `?` if unknown.
    pub fn profile_label(&self) -> &'static str {
        self.profile.as_ref().map_or("?", AutoProfile::label)
    }
}

/// Statistics of an accounting node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStats {
    pub is_active: bool,
    pub weight: u64,
    pub active: u64,
    pub inuse: u64,
    /// Active hierarchical weight, in percent.
    pub hwa_pct: f64,
    /// In-use hierarchical weight, in percent.
    pub hwi_pct: f64,
    /// Virtual time issued but not completed yet, in percent of the virtual time of a period.
    ///
    /// `None` if the period of the controller is empty, which counts as an exact zero.
    pub inflight_pct: Option<f64>,
    pub debt_ms: f64,
    pub use_delay: i64,
    pub delay_ms: f64,
    /// Usage history in percent, from the oldest to the newest slot.
    pub usages: Vec<f64>,
    /// Maximum of `usages`, `None` if no slot is above zero.
    pub usage: Option<f64>,
    pub id: u64,
}

impl NodeStats {
    pub fn derive(raw: &RawNode, controller: &RawController, constants: &IocConstants) -> Self {
        let whole = constants.hweight_whole as f64;

        let period_vtime = u128::from(controller.period_us) * u128::from(controller.vtime_rate);
        let inflight_pct = (period_vtime != 0).then(|| {
            let pending = i128::from(raw.vtime) - i128::from(raw.done_vtime);
            (pending * 100) as f64 / period_vtime as f64
        });

        let usages = ring_in_order(&raw.usages, raw.usage_idx)
            .map(|u| ratio(u as f64 * 100.0, whole))
            .collect::<Vec<_>>();
        let usage = usages.iter().copied().filter(|u| *u > 0.0).reduce(f64::max);

        Self {
            is_active: raw.is_active,
            weight: raw.weight,
            active: raw.active,
            inuse: raw.inuse,
            hwa_pct: ratio(raw.hweight_active as f64 * 100.0, whole),
            hwi_pct: ratio(raw.hweight_inuse as f64 * 100.0, whole),
            inflight_pct,
            debt_ms: ratio(raw.abs_vdebt as f64, constants.vtime_per_usec as f64) / USEC_PER_MSEC,
            use_delay: raw.use_delay,
            delay_ms: raw.delay_nsec as f64 / NSEC_PER_MSEC,
            usages,
            usage,
            id: raw.id,
        }
    }
}

/// Iterates over a ring buffer from the slot after the write cursor `idx`, wrapping around.
pub fn ring_in_order<T: Copy>(slots: &[T], idx: u64) -> impl Iterator<Item = T> + '_ {
    let n = slots.len();
    let start = if n == 0 { 0 } else { (idx % n as u64) as usize };
    (0..n).map(move |i| slots[(start + i) % n])
}

/// Divides `num` by `den`, or returns zero if `den` is zero.
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn running_controller() -> RawController {
        RawController {
            enabled: true,
            running: 1,
            period_us: 100_000,
            period_at: 2_500_000,
            period_at_vtime: 1 << 38,
            vtime_rate: IocConstants::default().vtime_per_usec,
            busy_level: -5,
            autop_idx: 3,
            user_cost_model: false,
            user_qos_params: false,
        }
    }

    #[test]
    fn controller() {
        let c = IocConstants::default();
        let stats = ControllerStats::derive(&running_controller(), &c);
        assert_eq!(stats.state(), ControllerState::Run);
        assert_eq!(stats.period_ms, 100.0);
        assert_eq!(stats.period_at, 2.5);
        assert_eq!(stats.vperiod_at, 2.0);
        assert_eq!(stats.vrate_pct, 100.0);
        assert_eq!(stats.busy_level, -5);
        assert_eq!(stats.profile_label(), "ssd_dfl");
    }

    #[test]
    fn controller_states() {
        let c = IocConstants::default();
        let mut raw = running_controller();
        raw.running = 0;
        assert_eq!(ControllerStats::derive(&raw, &c).state(), ControllerState::Idle);
        raw.running = 2;
        assert_eq!(ControllerStats::derive(&raw, &c).state(), ControllerState::Idle);
        raw.enabled = false;
        raw.running = 1;
        assert_eq!(ControllerStats::derive(&raw, &c).state(), ControllerState::Off);
    }

    #[test]
    fn unknown_profile() {
        let mut raw = running_controller();
        raw.autop_idx = 0;
        let stats = ControllerStats::derive(&raw, &IocConstants::default());
        assert_eq!(stats.profile, None);
        assert_eq!(stats.profile_label(), "?");
    }

    #[test]
    fn zero_rate_constants() {
        let c = IocConstants {
            vtime_per_usec: 0,
            vtime_per_sec: 0,
            hweight_whole: 0,
            ..Default::default()
        };
        let stats = ControllerStats::derive(&running_controller(), &c);
        assert_eq!(stats.vrate_pct, 0.0);
        assert_eq!(stats.vperiod_at, 0.0);

        let node = RawNode {
            hweight_active: 10,
            abs_vdebt: 10,
            usages: vec![1, 2],
            ..Default::default()
        };
        let stats = NodeStats::derive(&node, &running_controller(), &c);
        assert_eq!(stats.hwa_pct, 0.0);
        assert_eq!(stats.debt_ms, 0.0);
        assert_eq!(stats.usages, vec![0.0, 0.0]);
    }

    #[test]
    fn weights() {
        let c = IocConstants::default();
        let raw = RawNode {
            weight: 100,
            active: 100,
            inuse: 50,
            hweight_active: c.hweight_whole,
            hweight_inuse: c.hweight_whole / 2,
            usages: vec![0; 8],
            ..Default::default()
        };
        let stats = NodeStats::derive(&raw, &running_controller(), &c);
        assert_eq!(stats.hwa_pct, 100.0);
        assert_eq!(stats.hwi_pct, 50.0);
        assert_eq!((stats.inuse, stats.active), (50, 100));
    }

    #[test]
    fn inflight() {
        let c = IocConstants::default();
        let ctrl = running_controller();
        let period_vtime = ctrl.period_us * ctrl.vtime_rate;
        let raw = RawNode {
            vtime: 10 + period_vtime / 4,
            done_vtime: 10,
            ..Default::default()
        };
        assert_eq!(NodeStats::derive(&raw, &ctrl, &c).inflight_pct, Some(25.0));

        // completions ahead of the issued vtime
        let raw = RawNode {
            vtime: 10,
            done_vtime: 10 + period_vtime / 2,
            ..Default::default()
        };
        assert_eq!(NodeStats::derive(&raw, &ctrl, &c).inflight_pct, Some(-50.0));

        // nothing in flight is still a computed value
        let raw = RawNode {
            vtime: 10,
            done_vtime: 10,
            ..Default::default()
        };
        assert_eq!(NodeStats::derive(&raw, &ctrl, &c).inflight_pct, Some(0.0));
    }

    #[test]
    fn inflight_zero_period() {
        let c = IocConstants::default();
        let raw = RawNode {
            vtime: 1000,
            done_vtime: 10,
            ..Default::default()
        };
        for (period_us, vtime_rate) in [(0, 137_438), (100_000, 0), (0, 0)] {
            let ctrl = RawController {
                period_us,
                vtime_rate,
                ..running_controller()
            };
            let stats = NodeStats::derive(&raw, &ctrl, &c);
            assert_eq!(stats.inflight_pct, None);
        }
    }

    #[test]
    fn debt_and_delay() {
        let c = IocConstants {
            vtime_per_usec: 1_000,
            ..Default::default()
        };
        let raw = RawNode {
            abs_vdebt: 2_500_001,
            use_delay: 3,
            delay_nsec: 12_345_678,
            ..Default::default()
        };
        let stats = NodeStats::derive(&raw, &running_controller(), &c);
        assert!((stats.debt_ms - 2.500001).abs() < 1e-12, "debt_ms = {}", stats.debt_ms);
        assert_eq!(stats.delay_ms, 12.345678);
        assert_eq!(stats.use_delay, 3);
    }

    #[test]
    fn usage_ring_order() {
        let c = IocConstants {
            hweight_whole: 100,
            ..Default::default()
        };
        let raw = RawNode {
            usages: vec![10, 20, 30, 40, 50, 60, 70, 80],
            usage_idx: 5,
            ..Default::default()
        };
        let stats = NodeStats::derive(&raw, &running_controller(), &c);
        assert_eq!(stats.usages, vec![60.0, 70.0, 80.0, 10.0, 20.0, 30.0, 40.0, 50.0]);
        assert_eq!(stats.usage, Some(80.0));

        // the cursor is taken modulo the number of slots
        let wrapped = RawNode { usage_idx: 13, ..raw };
        assert_eq!(NodeStats::derive(&wrapped, &running_controller(), &c).usages, stats.usages);
    }

    #[test]
    fn usage_ring_rotation() {
        let slots = [3u64, 1, 4, 1, 5, 9, 2, 6];
        for idx in 0..slots.len() as u64 {
            let seq: Vec<u64> = ring_in_order(&slots, idx).collect();
            assert_eq!(seq.len(), slots.len());
            assert_eq!(seq[0], slots[idx as usize]);

            // rotating the storage and advancing the cursor yields the same sequence
            let mut rotated = slots;
            rotated.rotate_right(1);
            let same: Vec<u64> = ring_in_order(&rotated, idx + 1).collect();
            assert_eq!(same, seq);

            // advancing the cursor alone shifts the sequence by one
            let mut shifted = seq.clone();
            shifted.rotate_left(1);
            assert_eq!(ring_in_order(&slots, idx + 1).collect::<Vec<_>>(), shifted);
        }
    }

    #[test]
    fn empty_ring() {
        let stats = NodeStats::derive(&RawNode::default(), &running_controller(), &IocConstants::default());
        assert!(stats.usages.is_empty());
        assert_eq!(stats.usage, None);
    }

    #[test]
    fn idle_ring() {
        let raw = RawNode {
            usages: vec![0; 8],
            usage_idx: 3,
            ..Default::default()
        };
        let stats = NodeStats::derive(&raw, &running_controller(), &IocConstants::default());
        assert_eq!(stats.usages, vec![0.0; 8]);
        assert_eq!(stats.usage, None);

        let raw = RawNode {
            usages: vec![0, 0, 1, 0, 0, 0, 0, 0],
            ..raw
        };
        let stats = NodeStats::derive(&raw, &running_controller(), &IocConstants::default());
        assert_eq!(stats.usage, Some(100.0 / 65536.0));
    }
}
