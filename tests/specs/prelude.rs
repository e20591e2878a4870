//! Test helpers shared across the end-to-end specs.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

pub const SPEC_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const SPEC_WAIT_MAX: Duration = Duration::from_secs(15);

/// Resolve a workspace binary the same way `cargo test` builds it: relative
/// to this test binary's own `target/debug` directory, so it works whether
/// or not `CARGO_MANIFEST_DIR` matches the directory cargo actually built
/// into.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn monitor_binary() -> PathBuf {
    binary_path("heimdall-monitor")
}

pub fn monitord_binary() -> PathBuf {
    binary_path("heimdall-monitord")
}

pub fn monitor_cmd() -> Command {
    let mut cmd = Command::new(monitor_binary());
    cmd.env("HEIMDALL_MONITORD_PATH", monitord_binary());
    cmd
}

/// A temp project root with `.heimdall/docs` already created, and a fake
/// `heimdall` ingestion command recording every invocation to a call log.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join(".heimdall/docs")).expect("mkdir docs");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn docs_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(".heimdall/docs").join(name)
    }

    pub fn call_log_path(&self) -> PathBuf {
        self.dir.path().join("calls.log")
    }

    pub fn write_config(&self, toml_body: &str) {
        std::fs::write(self.dir.path().join(".heimdall/monitor.toml"), toml_body)
            .expect("write monitor.toml");
    }

    /// Write a fake `heimdall` shell script that appends `<verb> <path>` to
    /// the call log and exits with the given fixed code.
    pub fn install_fake_ingestor(&self, exit_code: i32) -> PathBuf {
        let script_path = self.dir.path().join("heimdall");
        let body = format!(
            "#!/bin/sh\necho \"$1 $2\" >> {log}\nexit {code}\n",
            log = shell_quote(&self.call_log_path()),
            code = exit_code,
        );
        std::fs::write(&script_path, body).expect("write fake heimdall script");
        make_executable(&script_path);
        script_path
    }

    /// Write a fake `heimdall` shell script that fails `fail_times` times
    /// before succeeding, tracking its own attempt count in a sibling
    /// counter file.
    pub fn install_flaky_ingestor(&self, fail_times: u32) -> PathBuf {
        let script_path = self.dir.path().join("heimdall");
        let counter_path = self.dir.path().join("attempts.count");
        std::fs::write(&counter_path, "0").expect("seed counter");
        let body = format!(
            "#!/bin/sh\n\
             count=$(cat {counter})\n\
             count=$((count + 1))\n\
             echo \"$count\" > {counter}\n\
             echo \"$1 $2\" >> {log}\n\
             if [ \"$count\" -le {fail_times} ]; then\n\
             echo \"transient failure\" 1>&2\n\
             exit 1\n\
             fi\n\
             exit 0\n",
            counter = shell_quote(&counter_path),
            log = shell_quote(&self.call_log_path()),
            fail_times = fail_times,
        );
        std::fs::write(&script_path, body).expect("write flaky heimdall script");
        make_executable(&script_path);
        script_path
    }

    pub fn call_log_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.call_log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Start the monitor daemon with a fast sweep interval and the given
    /// fake ingestor, returning a guard that stops it on drop.
    pub fn start_monitor(&self, base_command: &Path) -> MonitorGuard {
        let status = monitor_cmd()
            .args(["start", "--project-root"])
            .arg(self.root())
            .env("MONITOR_INTERVAL_SECONDS", "1")
            .env("MONITOR_BASE_COMMAND", base_command)
            .status()
            .expect("spawn monitor start");
        assert!(status.success(), "monitor start failed: {status:?}");
        MonitorGuard {
            root: self.root().to_path_buf(),
        }
    }
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display())
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path).expect("stat script").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).expect("chmod script");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

/// Stops the monitor daemon when dropped, so a failing assertion never
/// leaves an orphan process behind for the next test.
pub struct MonitorGuard {
    root: PathBuf,
}

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        let _ = monitor_cmd()
            .args(["stop", "--project-root"])
            .arg(&self.root)
            .arg("--timeout")
            .arg("5")
            .status();
    }
}

/// Poll `condition` until it returns `true` or `SPEC_WAIT_MAX` elapses.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    loop {
        if condition() {
            return true;
        }
        if start.elapsed() >= SPEC_WAIT_MAX {
            return false;
        }
        std::thread::sleep(SPEC_POLL_INTERVAL);
    }
}
