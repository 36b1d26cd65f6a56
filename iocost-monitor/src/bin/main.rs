use std::{
    io::{BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use anyhow::{anyhow, Context};
use clap::Parser;
use iocost_monitor::{config::Options, init_logger, sampler::Sampler};
use util_iocost::FsSnapshot;

/// Monitors the state of the iocost controller of a block device and of its cgroups.
///
/// Without `--cgroup`, only the cgroups that are currently active are shown.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Name of the block device, e.g. `sda` or `nvme0n1`.
    #[arg(value_name = "DEV")]
    devname: String,

    /// Only show the cgroups whose path matches this regex (can be repeated).
    #[arg(long = "cgroup", value_name = "REGEX")]
    cgroups: Vec<String>,

    /// Time between two samples, in seconds. Zero samples continuously.
    #[arg(short, long, value_name = "SECONDS", value_parser = parse_interval)]
    interval: Option<Duration>,

    /// Print one JSON object per line instead of a table.
    #[arg(long)]
    json: bool,

    /// Also show the cgroups that are no longer online.
    #[arg(long)]
    include_dying: bool,

    /// Root of the snapshot tree to read.
    #[arg(long, env = "IOCOST_SNAPSHOT_DIR")]
    snapshot_dir: Option<PathBuf>,

    /// Path to a TOML config file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            cgroup: self.cgroups.clone(),
            interval: self.interval,
            json: self.json,
            include_dying: self.include_dying,
            snapshot_dir: self.snapshot_dir.clone(),
        }
    }
}

/// Parses a number of seconds, which cannot be negative, infinite or NaN.
fn parse_interval(s: &str) -> Result<Duration, String> {
    let secs = s.parse::<f64>().map_err(|e| e.to_string())?;
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    init_logger();
    let args = Cli::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> anyhow::Result<()> {
    let file_options = match &args.config {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };
    let options = file_options.merge(args.options());
    let snapshot_dir = options
        .snapshot_dir
        .clone()
        .ok_or_else(|| anyhow!("no snapshot directory, use --snapshot-dir or IOCOST_SNAPSHOT_DIR"))?;
    let settings = options.into_settings(args.devname)?;
    log::debug!("settings: {settings:?}");

    let provider = FsSnapshot::open(&snapshot_dir)
        .with_context(|| format!("could not open snapshot {}", snapshot_dir.display()))?;
    let sampler = Sampler::init(provider, settings)?;

    let stdout = std::io::stdout().lock();
    let mut out = BufWriter::new(stdout);
    let res = sampler.run(&mut out);
    let _ = out.flush();
    match res {
        Ok(never) => match never {},
        Err(e) => Err(e),
    }
}
