// Process-group signalling and exit status helpers

use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::{Child, Command};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Puts the child in its own process group so the whole tree can be signalled.
pub fn configure_command(cmd: &mut Command) {
    cmd.kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);
}

/// Exit code, or 128 + signal number for signal-terminated processes.
pub fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Negative pid addresses the process group
    unsafe { libc::kill(-pid, signal) == 0 }
}

/// Graceful signal, bounded wait, then force-kill. Never fails if the child already exited.
pub async fn terminate(child: &mut Child, grace: Duration) -> Option<ExitStatus> {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        if signal_group(pid, libc::SIGTERM) {
            if let Ok(Ok(status)) = tokio::time::timeout(grace, child.wait()).await {
                // Stragglers in the group that ignored SIGTERM
                signal_group(pid, libc::SIGKILL);
                return Some(status);
            }
            signal_group(pid, libc::SIGKILL);
        }
    }

    #[cfg(not(unix))]
    let _ = grace;

    let _ = child.start_kill();
    child.wait().await.ok()
}

/// Whether a process with this pid still exists.
#[cfg(all(unix, test))]
pub(crate) fn is_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    unsafe { libc::kill(pid, 0) == 0 }
}
