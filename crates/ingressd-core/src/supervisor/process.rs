//! The process supervisor state machine:
//! `Unstarted -> Running -> {Running (post-respawn), Stopping, Stopped}`.

use crate::error::{ReconcileError, Result};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::net::TcpListener;
use std::process::Stdio;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

/// How long the supervisor polls for the child to exit after asking it to
/// quit gracefully, before force-killing its process group.
const GRACEFUL_QUIT_TIMEOUT: Duration = Duration::from_secs(30);
const GRACEFUL_QUIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SupervisorState {
    Unstarted = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl From<u8> for SupervisorState {
    fn from(v: u8) -> Self {
        match v {
            0 => SupervisorState::Unstarted,
            1 => SupervisorState::Running,
            2 => SupervisorState::Stopping,
            _ => SupervisorState::Stopped,
        }
    }
}

/// Static configuration for spawning and supervising the data plane.
#[derive(Debug, Clone)]
pub struct ProcessSupervisorConfig {
    pub binary: String,
    pub args: Vec<String>,
    pub listen_port: u16,
}

/// Supervises a single long-running child process.
pub struct ProcessSupervisor {
    config: ProcessSupervisorConfig,
    state: AtomicU8,
    pid: Mutex<Option<i32>>,
    shutdown_guard: Mutex<()>,
    exit_tx: mpsc::Sender<String>,
    exit_rx: Mutex<mpsc::Receiver<String>>,
}

impl ProcessSupervisor {
    pub fn new(config: ProcessSupervisorConfig) -> Self {
        let (exit_tx, exit_rx) = mpsc::channel(1);
        Self {
            config,
            state: AtomicU8::new(SupervisorState::Unstarted as u8),
            pid: Mutex::new(None),
            shutdown_guard: Mutex::new(()),
            exit_tx,
            exit_rx: Mutex::new(exit_rx),
        }
    }

    pub fn state(&self) -> SupervisorState {
        SupervisorState::from(self.state.load(Ordering::Acquire))
    }

    /// Starts the data plane as a child in its own process group and
    /// spawns the waiter task that reports its exit onto the single-element
    /// exit channel.
    pub async fn start(&self) -> Result<()> {
        let child = self.spawn_child()?;
        *self.pid.lock().await = child.id().map(|id| id as i32);
        self.state.store(SupervisorState::Running as u8, Ordering::Release);
        self.spawn_waiter(child);
        Ok(())
    }

    fn spawn_child(&self) -> Result<Child> {
        let mut command = Command::new(&self.config.binary);
        command
            .args(&self.config.args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        unsafe {
            use std::os::unix::process::CommandExt;
            command.pre_exec(|| {
                nix::unistd::setsid().map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
                Ok(())
            });
        }

        command
            .spawn()
            .map_err(|e| ReconcileError::ProcessExited(format!("failed to spawn data plane: {}", e)))
    }

    fn spawn_waiter(&self, mut child: Child) {
        let exit_tx = self.exit_tx.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            let message = match status {
                Ok(status) => format!("data plane exited with {}", status),
                Err(e) => format!("failed to wait on data plane: {}", e),
            };
            let _ = exit_tx.send(message).await;
        });
    }

    /// Waits for the next exit notification. Resolves once per child
    /// lifetime; callers loop, respawning as needed.
    pub async fn wait_for_exit(&self) -> Option<String> {
        self.exit_rx.lock().await.recv().await
    }

    /// True if `error` indicates the process should be respawned rather
    /// than treated as a controller-initiated stop.
    pub fn is_respawnable(&self, _error: &str) -> bool {
        self.state() != SupervisorState::Stopping && self.state() != SupervisorState::Stopped
    }

    /// Waits for the configured listen port to become free, then starts a
    /// fresh child. Called after an abnormal exit while the supervisor is
    /// not stopping.
    pub async fn respawn(&self) -> Result<()> {
        self.wait_for_port_free().await;
        self.start().await
    }

    async fn wait_for_port_free(&self) {
        loop {
            if TcpListener::bind(("127.0.0.1", self.config.listen_port)).is_ok() {
                return;
            }
            sleep(Duration::from_millis(200)).await;
        }
    }

    /// Stops the supervised process: marks shutting-down, asks it to quit
    /// gracefully, polls for exit, force-kills on timeout. Serialized by a
    /// mutex so a concurrent second call fails fast.
    pub async fn stop(&self) -> Result<()> {
        let guard = self.shutdown_guard.try_lock();
        let _guard = match guard {
            Ok(g) => g,
            Err(_) => return Err(ReconcileError::ShutdownInProgress),
        };

        if self.state() == SupervisorState::Stopping || self.state() == SupervisorState::Stopped {
            return Err(ReconcileError::ShutdownInProgress);
        }

        self.state.store(SupervisorState::Stopping as u8, Ordering::Release);

        let pid = *self.pid.lock().await;
        if let Some(pid) = pid {
            self.send_quit().await?;
            self.poll_until_gone(pid).await;
        }

        self.state.store(SupervisorState::Stopped as u8, Ordering::Release);
        Ok(())
    }

    /// Asks the data plane to quit gracefully via its own CLI (`-s quit`)
    /// rather than signaling it directly.
    async fn send_quit(&self) -> Result<()> {
        let output = Command::new(&self.config.binary)
            .arg("-s")
            .arg("quit")
            .output()
            .await
            .map_err(|e| ReconcileError::ProcessExited(format!("failed to run '{} -s quit': {}", self.config.binary, e)))?;

        if !output.status.success() {
            let combined = format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
            return Err(ReconcileError::ProcessExited(format!(
                "'{} -s quit' failed: {}",
                self.config.binary, combined
            )));
        }
        Ok(())
    }

    async fn poll_until_gone(&self, pid: i32) {
        let deadline = tokio::time::Instant::now() + GRACEFUL_QUIT_TIMEOUT;
        while tokio::time::Instant::now() < deadline {
            if signal::kill(Pid::from_raw(pid), None).is_err() {
                return;
            }
            sleep(GRACEFUL_QUIT_POLL_INTERVAL).await;
        }

        log::warn!("data plane pid {} did not exit within {:?}, force-killing process group", pid, GRACEFUL_QUIT_TIMEOUT);
        let _ = signal::killpg(Pid::from_raw(pid), Signal::SIGKILL);
    }
}
