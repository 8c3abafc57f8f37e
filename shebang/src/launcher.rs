use std::{os::unix::process::ExitStatusExt, process::ExitStatus, process::Stdio};

use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use tokio::{
    process::{Child, Command},
    signal::unix::{signal, SignalKind},
};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Wraps the finished command in the single pair of quotes `sh -c` is
/// expected to receive it in.
pub fn quote(command: &str) -> String {
    format!("\"{}\"", command)
}

/// Runs a finished command string and reports its exit code.
#[allow(async_fn_in_trait)]
pub trait Launcher {
    async fn launch(&mut self, command: &str) -> Result<i32>;
}

/// `sh -c` with inherited stdin, stdout and stderr.
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    shell: String,
}

impl ShellLauncher {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl Launcher for ShellLauncher {
    async fn launch(&mut self, command: &str) -> Result<i32> {
        // Handling these replaces the default action, so stripped copies
        // still get cleaned up when we're asked to stop.
        let install = |kind| signal(kind).map_err(|source| Error::Signals { source });
        let mut interrupt = install(SignalKind::interrupt())?;
        let mut terminate = install(SignalKind::terminate())?;
        let mut hangup = install(SignalKind::hangup())?;

        debug!("running {} -c {}", self.shell, quote(command));
        // Command hands the string over as a single argv element, which is
        // what the quotes stand for; sh doesn't see them.
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::Spawn { source })?;

        let status = loop {
            tokio::select! {
                status = child.wait() => break status.map_err(|source| Error::Spawn { source })?,
                _ = interrupt.recv() => {
                    // The terminal sent it to the child as well.
                    info!("interrupted, waiting for the command to exit");
                }
                _ = terminate.recv() => {
                    info!("terminated, passing it on to the command");
                    forward(&child, Signal::SIGTERM);
                }
                _ = hangup.recv() => {
                    info!("hung up, passing it on to the command");
                    forward(&child, Signal::SIGHUP);
                }
            }
        };

        Ok(exit_code(status))
    }
}

/// Sends `sig` to the child, which may catch it and clean up after itself.
/// `sh -c` with a single command execs it, so that command gets the signal
/// directly.
pub fn forward(child: &Child, sig: Signal) {
    let Some(id) = child.id() else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(id as i32), sig) {
        debug!("couldn't forward {:?} to {}: {}", sig, id, e);
    }
}

/// The child's exit code, or `128 + signal` if it was killed.
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}
