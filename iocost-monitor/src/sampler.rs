//! Sampling loop.

use std::{
    convert::Infallible,
    io::Write,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use util_iocost::{walk, DeviceBinding, ProviderError, SnapshotProvider, WalkedNode};

use crate::{
    config::Settings,
    render::{NodeSample, Snapshot},
    stats::{ControllerStats, NodeStats},
};

/// Samples the iocost controller of a device and its hierarchy.
pub struct Sampler<P: SnapshotProvider> {
    provider: P,
    settings: Settings,
    binding: DeviceBinding<P::Member, P::Controller>,
}

impl<P: SnapshotProvider> Sampler<P> {
    /// Finds the controller of the configured device.
    ///
    /// Fails if the device does not exist or has no iocost controller.
    pub fn init(provider: P, settings: Settings) -> Result<Self, ProviderError> {
        let binding = provider.resolve_device(&settings.device)?;
        log::info!(
            "monitoring {} (queue {}) every {:?}",
            settings.device,
            binding.queue.0,
            settings.interval
        );
        Ok(Self {
            provider,
            settings,
            binding,
        })
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Reads the current state of the controller and of the nodes to show.
    ///
    /// The nodes that cannot be read are left out. Failing to read the controller is an error.
    pub fn sample(&self, timestamp: f64) -> anyhow::Result<Snapshot> {
        let constants = self.provider.constants();
        let raw_controller = self
            .provider
            .read_controller(&self.binding.controller)
            .with_context(|| format!("failed to read the iocost controller of {}", self.settings.device))?;
        let controller = ControllerStats::derive(&raw_controller, constants);

        let filter = &self.settings.filter;
        let walked = walk(
            &self.provider,
            &self.binding.root,
            self.binding.queue,
            self.settings.include_dying,
        );
        let mut nodes = Vec::with_capacity(walked.len());
        for WalkedNode { path, node } in walked {
            if !filter.matches(&path) {
                continue;
            }
            let raw = match self.provider.read_node(&node) {
                Ok(raw) => raw,
                Err(e) => {
                    log::debug!("skipping {path}: {e}");
                    continue;
                }
            };
            let stats = NodeStats::derive(&raw, &raw_controller, constants);
            // without filter, only show the nodes that are currently active
            if filter.is_empty() && !stats.is_active {
                continue;
            }
            nodes.push(NodeSample { path, stats });
        }

        Ok(Snapshot {
            device: self.settings.device.clone(),
            timestamp,
            controller,
            nodes,
        })
    }

    /// Samples once and writes the result to `out`.
    pub fn tick<W: Write + ?Sized>(&self, timestamp: f64, out: &mut W) -> anyhow::Result<()> {
        let snapshot = self.sample(timestamp)?;
        self.settings
            .format
            .write_snapshot(&snapshot, out)
            .context("failed to write the sample")?;
        log::trace!("flushing output");
        out.flush().context("failed to flush the output")?;
        Ok(())
    }

    /// Samples forever, waiting for the configured interval between two ticks.
    ///
    /// Only returns on error.
    pub fn run<W: Write + ?Sized>(&self, out: &mut W) -> anyhow::Result<Infallible> {
        loop {
            self.tick(unix_timestamp(), out)?;
            std::thread::sleep(self.settings.interval);
        }
    }
}

/// Current time, in seconds since the Unix epoch.
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
