use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

/// Every variable the binary reads, so the caller's shell cannot leak in.
pub const SRH_ENV_VARS: [&str; 10] = [
    "SRH_OUTPUT_FORMAT",
    "SRH_EVENT_LOG",
    "SRH_TARGET_DATA_DIR",
    "SRH_TARGET_DATABASE",
    "SRH_TARGET_BUSY_TIMEOUT_MS",
    "SRH_REPLAY_LOG_PATH",
    "SRH_WEIGHTS_OUTPUT_PATH",
    "SRH_WEIGHTS_MIN_WEIGHT",
    "SRH_WEIGHTS_MAX_WEIGHT",
    "SRH_WEIGHTS_SEED",
];

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_srh") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "srh.exe" } else { "srh" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve srh binary path for integration test"),
    }
}

/// Run `srh` with `home` as `$HOME`, so default config and event-log paths
/// stay inside the test's scratch directory.
pub fn run_cli_case_in(case_name: &str, home: &Path, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("srh-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    for key in SRH_ENV_VARS {
        command.env_remove(key);
    }
    let output = command
        .args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute srh command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Run `srh` in a fresh scratch home.
#[allow(dead_code)]
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let home = tempfile::tempdir().expect("create scratch home");
    run_cli_case_in(case_name, home.path(), args)
}
