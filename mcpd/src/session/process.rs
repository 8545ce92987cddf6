//! OS process helpers: liveness probes, termination, detached spawn

use std::fs::OpenOptions;
use std::path::Path;
use std::process::{Command, Stdio};

/// Check whether `pid` exists without delivering a signal (`kill(pid, 0)`).
///
/// EPERM means the process exists but belongs to someone else, which still counts.
#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // pid 0 would address our own process group
    if pid <= 0 {
        return false;
    }
    unsafe {
        if libc::kill(pid, 0) == 0 {
            return true;
        }
    }
    matches!(
        std::io::Error::last_os_error().raw_os_error(),
        Some(libc::EPERM)
    )
}

#[cfg(not(unix))]
pub fn is_alive(_pid: u32) -> bool {
    false
}

/// Send SIGTERM. Returns false if the process was already gone.
#[cfg(unix)]
pub fn terminate(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
pub fn terminate(_pid: u32) -> bool {
    tracing::warn!("Process termination is only supported on unix");
    false
}

/// Start `program args...` in its own process group with stdin closed and
/// stdout/stderr appended to `log_path`. The caller does not wait for it.
pub fn spawn_detached(program: &Path, args: &[String], log_path: &Path) -> std::io::Result<u32> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    // The child is never waited on: it must outlive this process
    let child = cmd.spawn()?;
    Ok(child.id())
}
