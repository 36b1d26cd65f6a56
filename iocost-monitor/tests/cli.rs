use assert_cmd::Command;
use tempfile::tempdir;
use util_iocost::{mock::MockHierarchy, QueueId};

const BIN: &str = env!("CARGO_PKG_NAME");

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.env_remove("IOCOST_SNAPSHOT_DIR").env("RUST_LOG", "error");
    cmd
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn help() {
    let output = cmd().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--cgroup", "--interval", "--json", "--include-dying", "--snapshot-dir", "--config"] {
        assert!(stdout.contains(flag), "missing {flag} in:\n{stdout}");
    }
}

#[test]
fn device_is_required() {
    cmd().assert().failure();
}

#[test]
fn invalid_interval() {
    for interval in ["--interval=soon", "--interval=-1", "--interval=inf", "--interval=NaN"] {
        let output = cmd().args(["sda", interval]).output().unwrap();
        assert_eq!(output.status.code(), Some(2), "{interval} should be a usage error");
    }
}

#[test]
fn zero_interval_is_accepted() {
    for interval in ["0", "0.0", "0.25"] {
        // parsing succeeds, then the run stops on the missing snapshot directory
        let output = cmd().args(["sda", "-i", interval]).output().unwrap();
        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("no snapshot directory"), "{}", stderr(&output));
    }
}

#[test]
fn snapshot_dir_is_required() {
    let output = cmd().arg("sda").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("no snapshot directory"), "{}", stderr(&output));
}

#[test]
fn unknown_device() {
    let tmp = tempdir().unwrap();
    let mut h = MockHierarchy::new();
    h.add_device("sdb", QueueId(16), None);
    h.write_tree(tmp.path()).unwrap();

    let output = cmd().arg("sdz").arg("--snapshot-dir").arg(tmp.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("block device sdz not found"), "{}", stderr(&output));

    // the directory can also come from the environment
    let output = cmd().arg("sdb").env("IOCOST_SNAPSHOT_DIR", tmp.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("could not find ioc for sdb"), "{}", stderr(&output));
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_snapshot_dir() {
    let tmp = tempdir().unwrap();
    let output = cmd()
        .arg("sda")
        .arg("--snapshot-dir")
        .arg(tmp.path().join("nope"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(!stderr(&output).is_empty());
}

#[test]
fn config_file() {
    let tmp = tempdir().unwrap();
    let mut h = MockHierarchy::new();
    h.add_device("sdb", QueueId(16), None);
    h.write_tree(&tmp.path().join("tree")).unwrap();

    let config = tmp.path().join("monitor.toml");
    std::fs::write(
        &config,
        format!("snapshot_dir = {:?}\ninterval = \"250ms\"\n", tmp.path().join("tree")),
    )
    .unwrap();
    let output = cmd().arg("sdb").arg("--config").arg(&config).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("could not find ioc for sdb"), "{}", stderr(&output));

    std::fs::write(&config, "snapshot_dir = \"/\"\nfrequency = 3\n").unwrap();
    let output = cmd().arg("sdb").arg("--config").arg(&config).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("invalid config file"), "{}", stderr(&output));
}
