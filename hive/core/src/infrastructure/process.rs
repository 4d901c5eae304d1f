// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! OS Process Control
//!
//! Handles:
//! - Detached spawning (own process group, stdio redirected to a log file)
//! - Liveness checks (`kill(pid, 0)` on Unix, `tasklist` on Windows)
//! - Graceful termination (SIGTERM, then SIGKILL after a grace period)
//! - TCP reachability probes

use async_trait::async_trait;
use std::fs::OpenOptions;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::process::{ProcessControl, ProcessError, ProcessHandle, ServerLaunch};

const DEFAULT_GRACE: Duration = Duration::from_secs(5);
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct OsProcessControl {
    /// Time between SIGTERM and SIGKILL
    grace: Duration,
}

impl Default for OsProcessControl {
    fn default() -> Self {
        Self { grace: DEFAULT_GRACE }
    }
}

impl OsProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grace(grace: Duration) -> Self {
        Self { grace }
    }
}

#[async_trait]
impl ProcessControl for OsProcessControl {
    async fn spawn_detached(&self, launch: &ServerLaunch) -> Result<ProcessHandle, ProcessError> {
        let program = launch.program.display().to_string();
        let spawn_err = |reason: String| ProcessError::Spawn { program: program.clone(), reason };

        if let Some(parent) = launch.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stdout = OpenOptions::new().create(true).append(true).open(&launch.log_path)?;
        let stderr = stdout.try_clone()?;

        let mut cmd = std::process::Command::new(&launch.program);
        cmd.args(&launch.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        if let Some(dir) = &launch.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        let mut child = cmd.spawn().map_err(|e| spawn_err(e.to_string()))?;
        let pid = child.id();
        // Reap the child if it exits while we are still around.
        std::thread::spawn(move || {
            let _ = child.wait();
        });

        info!(pid, program = %program, log = %launch.log_path.display(), "Spawned detached process");
        Ok(ProcessHandle::new(pid))
    }

    async fn is_alive(&self, handle: &ProcessHandle) -> bool {
        process_exists(handle.pid)
    }

    async fn terminate(&self, handle: &ProcessHandle) -> Result<(), ProcessError> {
        let pid = handle.pid;
        if !process_exists(pid) {
            debug!(pid, "Process already gone");
            return Ok(());
        }

        #[cfg(unix)]
        {
            info!(pid, "Sending SIGTERM");
            send_signal(pid, libc::SIGTERM)?;

            let step = Duration::from_millis(100);
            let mut waited = Duration::ZERO;
            while waited < self.grace {
                if !process_exists(pid) {
                    return Ok(());
                }
                tokio::time::sleep(step).await;
                waited += step;
            }

            warn!(pid, "Graceful shutdown timeout, sending SIGKILL");
            send_signal(pid, libc::SIGKILL)?;
            tokio::time::sleep(step).await;
            if process_exists(pid) {
                return Err(ProcessError::Terminate {
                    pid,
                    reason: "process survived SIGKILL".to_string(),
                });
            }
            Ok(())
        }

        #[cfg(windows)]
        {
            let output = std::process::Command::new("taskkill")
                .args(["/PID", &pid.to_string(), "/T", "/F"])
                .output()?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.contains("not found") {
                    return Err(ProcessError::Terminate { pid, reason: stderr.trim().to_string() });
                }
            }
            Ok(())
        }
    }

    async fn port_reachable(&self, host: &str, port: u16) -> bool {
        let host = match host {
            "" | "0.0.0.0" => "127.0.0.1",
            "::" => "::1",
            other => other,
        };
        let addr = if host.contains(':') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };
        matches!(timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await, Ok(Ok(_)))
    }
}

#[cfg(unix)]
fn process_exists(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs permission and existence checks only.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(windows)]
fn process_exists(pid: u32) -> bool {
    std::process::Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid), "/NH"])
        .output()
        .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
        .unwrap_or(false)
}

/// Signal the process group led by `pid`, which is how servers are spawned.
/// Falls back to the bare pid for handles that do not lead a group.
#[cfg(unix)]
fn send_signal(pid: u32, signal: i32) -> Result<(), ProcessError> {
    let raw = i32::try_from(pid).map_err(|_| ProcessError::Terminate {
        pid,
        reason: "pid out of range".to_string(),
    })?;
    for target in [-raw, raw] {
        // SAFETY: plain kill(2) on a pid (or its group) we recorded ourselves.
        if unsafe { libc::kill(target, signal) } == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(ProcessError::Terminate { pid, reason: err.to_string() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_port_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let control = OsProcessControl::new();
        assert!(control.port_reachable("127.0.0.1", port).await);
        assert!(control.port_reachable("0.0.0.0", port).await);
        drop(listener);
        assert!(!control.port_reachable("127.0.0.1", port).await);
    }

    #[tokio::test]
    async fn test_current_process_is_alive() {
        let control = OsProcessControl::new();
        assert!(control.is_alive(&ProcessHandle::new(std::process::id())).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_and_terminate() {
        let dir = tempfile::TempDir::new().unwrap();
        let launch = ServerLaunch {
            program: "sleep".into(),
            args: vec!["30".to_string()],
            log_path: dir.path().join("logs").join("ui.log"),
            working_dir: None,
        };
        let control = OsProcessControl::with_grace(Duration::from_secs(2));
        let handle = control.spawn_detached(&launch).await.unwrap();
        assert!(control.is_alive(&handle).await);
        assert!(launch.log_path.exists());

        control.terminate(&handle).await.unwrap();
        assert!(!control.is_alive(&handle).await);
    }

    #[tokio::test]
    async fn test_spawn_missing_program_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let launch = ServerLaunch {
            program: dir.path().join("does-not-exist"),
            args: vec![],
            log_path: dir.path().join("ui.log"),
            working_dir: None,
        };
        let err = OsProcessControl::new().spawn_detached(&launch).await.unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_terminate_stops_whole_group() {
        fn gone(pid: u32) -> bool {
            !process_exists(pid)
                || std::fs::read_to_string(format!("/proc/{}/stat", pid))
                    .map(|stat| stat.contains(") Z "))
                    .unwrap_or(true)
        }

        let dir = tempfile::TempDir::new().unwrap();
        let child_pid_file = dir.path().join("child.pid");
        let launch = ServerLaunch {
            program: "sh".into(),
            args: vec![
                "-c".to_string(),
                format!("sleep 30 & echo $! > {}; wait", child_pid_file.display()),
            ],
            log_path: dir.path().join("ui.log"),
            working_dir: None,
        };
        let control = OsProcessControl::with_grace(Duration::from_secs(2));
        let handle = control.spawn_detached(&launch).await.unwrap();

        let mut child = None;
        for _ in 0..50 {
            if let Some(pid) = std::fs::read_to_string(&child_pid_file)
                .ok()
                .and_then(|raw| raw.trim().parse::<u32>().ok())
            {
                child = Some(pid);
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let child = child.unwrap();
        assert!(!gone(child));

        control.terminate(&handle).await.unwrap();
        for _ in 0..20 {
            if gone(child) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(gone(child));
    }
}
