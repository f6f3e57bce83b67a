#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome of one binary invocation plus the transcript written for it.
pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn binary() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_dashclock") {
        return PathBuf::from(path);
    }
    let name = format!("dashclock{}", std::env::consts::EXE_SUFFIX);
    // target/<profile>/deps/<test> -> target/<profile>/dashclock
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(|dir| dir.join(&name)))
        .filter(|path| path.exists())
        .unwrap_or_else(|| panic!("{name} not built; run through cargo test"))
}

fn transcript_path(case_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("dashclock-test-logs");
    fs::create_dir_all(&dir).expect("create transcript dir");
    let slug: String = case_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    dir.join(format!("{slug}-{stamp}.log"))
}

/// Run the binary with `DASHCLOCK_*` variables scrubbed and colors off.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let bin = binary();
    let mut command = Command::new(&bin);
    command.args(args).env("NO_COLOR", "1");
    for (key, _) in std::env::vars_os() {
        if key.to_string_lossy().starts_with("DASHCLOCK_") {
            command.env_remove(key);
        }
    }
    let output = command.output().expect("spawn dashclock");
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    let mut transcript = String::new();
    let _ = writeln!(transcript, "$ {} {}", bin.display(), args.join(" "));
    let _ = writeln!(transcript, "status: {}", output.status);
    let _ = writeln!(transcript, "--- stdout\n{stdout}\n--- stderr\n{stderr}");
    let log_path = transcript_path(case_name);
    fs::write(&log_path, transcript).expect("write transcript");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Write a datasource file into `dir` and return its path.
pub fn write_sources(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("dashclock.json");
    fs::write(&path, json).expect("write datasource file");
    path
}

pub const THREE_SOURCES: &str = r#"[
  {"title": "CPU", "Query": "avg(rate(cpu[5m]))", "prom": "http://ok-cpu:9090", "unit": "%", "warn": 70, "error": 90},
  {"title": "Disk", "Query": "disk_used", "prom": "http://down:9090", "unit": "%", "warn": 80, "error": 95},
  {"title": "Load", "Query": "node_load1", "prom": "http://ok-load:9090"}
]"#;
