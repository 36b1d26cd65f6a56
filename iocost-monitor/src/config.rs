//! Configuration of the monitor: config file, command-line overrides and resulting settings.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{filter::NameFilter, render::OutputFormat};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Options of the monitor, from the config file or from the command line.
///
/// Every option is optional, see [`Options::merge`] and [`Options::into_settings`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Options {
    /// Regular expressions selecting the cgroups to show, by path.
    #[serde(default)]
    pub cgroup: Vec<String>,
    /// Time between two samples.
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
    /// Output one JSON object per line instead of a table.
    #[serde(default)]
    pub json: bool,
    /// Also show the cgroups that are no longer online.
    #[serde(default)]
    pub include_dying: bool,
    /// Root of the snapshot tree to read.
    pub snapshot_dir: Option<PathBuf>,
}

/// Effective settings of a [`Sampler`](crate::sampler::Sampler).
#[derive(Debug, Clone)]
pub struct Settings {
    pub device: String,
    pub filter: NameFilter,
    pub interval: Duration,
    pub format: OutputFormat,
    pub include_dying: bool,
}

impl Options {
    /// Loads the options from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("could not read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Applies `overrides` on top of these options.
    ///
    /// The cgroup patterns of `overrides` replace ours if there is at least one of them.
    /// Flags are enabled if they are enabled on either side.
    pub fn merge(self, overrides: Options) -> Options {
        Options {
            cgroup: if overrides.cgroup.is_empty() {
                self.cgroup
            } else {
                overrides.cgroup
            },
            interval: overrides.interval.or(self.interval),
            json: self.json || overrides.json,
            include_dying: self.include_dying || overrides.include_dying,
            snapshot_dir: overrides.snapshot_dir.or(self.snapshot_dir),
        }
    }

    pub fn into_settings(self, device: String) -> anyhow::Result<Settings> {
        let filter = NameFilter::new(&self.cgroup).context("invalid cgroup regex")?;
        let format = if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        };
        Ok(Settings {
            device,
            filter,
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL),
            format,
            include_dying: self.include_dying,
        })
    }
}
