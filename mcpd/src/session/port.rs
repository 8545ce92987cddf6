//! Loopback port allocation

use std::collections::HashSet;
use std::net::{Ipv4Addr, TcpListener};

use super::registry::SessionEntry;
use super::SessionError;

/// How many ports past the start port are tried
pub const PORT_SCAN_RANGE: u16 = 1000;

/// Whether `port` can be bound on 127.0.0.1 right now
pub fn is_port_free(port: u16) -> bool {
    TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok()
}

/// First port `>= start` that no live session claims and that binds right now.
///
/// Registry entries can be stale (a daemon that died without deregistering), so
/// dead sessions do not block their port; the bind probe catches real listeners,
/// ours or anyone else's.
pub fn allocate_port(sessions: &[SessionEntry], start: u16) -> Result<u16, SessionError> {
    let claimed: HashSet<u16> = sessions
        .iter()
        .filter(|entry| entry.alive)
        .map(|entry| entry.session.port)
        .collect();

    let start = start.max(1);
    let end = (u32::from(start) + u32::from(PORT_SCAN_RANGE)).min(u32::from(u16::MAX) + 1);

    for candidate in u32::from(start)..end {
        let Ok(port) = u16::try_from(candidate) else {
            break;
        };
        if claimed.contains(&port) {
            tracing::debug!("Port {} held by a live session", port);
            continue;
        }
        if is_port_free(port) {
            return Ok(port);
        }
        tracing::debug!("Port {} is in use", port);
    }

    Err(SessionError::PortExhausted { start, end })
}
