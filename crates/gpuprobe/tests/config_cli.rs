use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn gpuprobe(config_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_gpuprobe"));
    command
        .env("GPUPROBE_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn");
    command
}

#[test]
fn where_reports_override_directory() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");

    let output = gpuprobe(&config_dir)
        .arg("where")
        .output()
        .expect("failed to run gpuprobe where");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&config_dir.display().to_string()));
    assert!(stdout.contains("gpuprobe.toml"));
    assert!(stdout.contains("defaults apply"));
}

#[test]
fn config_init_writes_valid_defaults() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");

    let status = gpuprobe(&config_dir)
        .args(["config", "init"])
        .status()
        .expect("failed to run gpuprobe config init");
    assert!(status.success());

    let path = config_dir.join("gpuprobe.toml");
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("version = 1"));

    let check = gpuprobe(&config_dir)
        .args(["config", "check"])
        .output()
        .expect("failed to run gpuprobe config check");
    assert!(check.status.success());
    let stdout = String::from_utf8_lossy(&check.stdout);
    assert!(stdout.contains("ok"));
    assert!(stdout.contains("teardown: immediate"));
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let path = config_dir.join("gpuprobe.toml");
    fs::write(&path, "version = 1\n[device]\nlabel = \"keep me\"\n").unwrap();

    let status = gpuprobe(&config_dir)
        .args(["config", "init"])
        .status()
        .expect("failed to run gpuprobe config init");
    assert!(!status.success());
    assert!(fs::read_to_string(&path).unwrap().contains("keep me"));

    let forced = gpuprobe(&config_dir)
        .args(["config", "init", "--force"])
        .status()
        .expect("failed to run gpuprobe config init --force");
    assert!(forced.success());
    assert!(!fs::read_to_string(&path).unwrap().contains("keep me"));
}

#[test]
fn config_check_rejects_invalid_file() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    let bad = root.path().join("bad.toml");
    fs::write(
        &bad,
        "version = 1\n[teardown]\nmode = \"deferred\"\ngrace = \"30s\"\n",
    )
    .unwrap();

    let output = gpuprobe(&config_dir)
        .args(["config", "check"])
        .arg(&bad)
        .output()
        .expect("failed to run gpuprobe config check");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("teardown.grace"));
}

#[test]
fn config_check_reports_deferred_policy() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    let file = root.path().join("dev.toml");
    fs::write(
        &file,
        "version = 1\n[teardown]\nmode = \"deferred\"\n[surface]\nalpha = \"opaque\"\n",
    )
    .unwrap();

    let output = gpuprobe(&config_dir)
        .args(["config", "check"])
        .arg(&file)
        .output()
        .expect("failed to run gpuprobe config check");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("deferred (100ms grace)"));
    assert!(stdout.contains("Opaque"));
}

#[test]
fn config_check_reports_unrepresentable_grace() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    let file = root.path().join("huge.toml");
    fs::write(
        &file,
        "version = 1\n[teardown]\nmode = \"deferred\"\ngrace = inf\n",
    )
    .unwrap();

    let output = gpuprobe(&config_dir)
        .args(["config", "check"])
        .arg(&file)
        .output()
        .expect("failed to run gpuprobe config check");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid duration"));
    assert!(!stderr.contains("panicked"));
}
