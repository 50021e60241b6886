//! Port allocation for the embedded server.
//!
//! Probing binds and immediately drops a listener, so the returned port is
//! advisory: another process can take it before the caller binds. Callers
//! must handle a bind failure on the returned port.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("no free port in range {start}-{end} after {attempts} attempts")]
    Exhausted { start: u16, end: u16, attempts: u32 },

    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
}

/// First port `>= start` that can be bound on loopback.
pub async fn find_available_port(start: u16, max_attempts: u32) -> Result<u16, PortError> {
    find_available_port_on(IpAddr::V4(Ipv4Addr::LOCALHOST), start, max_attempts).await
}

/// First port `>= start` that can be bound on `host`, probing at most
/// `max_attempts` ports in ascending order. Only "address in use" moves the
/// scan forward; any other bind error is returned as is.
///
/// The UI is opened at `localhost`, which may resolve to `::1`, so on IPv4
/// loopback a port held by an IPv6 loopback listener also counts as in use.
pub async fn find_available_port_on(
    host: IpAddr,
    start: u16,
    max_attempts: u32,
) -> Result<u16, PortError> {
    let mut port = start;
    let mut last_probed = start;
    let mut attempts = 0;

    while attempts < max_attempts {
        attempts += 1;
        last_probed = port;

        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                // port 0 asks the OS for any free port
                let bound = listener
                    .local_addr()
                    .map(|addr| addr.port())
                    .map_err(|source| PortError::Bind { port, source })?;

                if host.is_loopback() && host.is_ipv4() && ipv6_loopback_in_use(bound).await {
                    debug!(port = bound, "Port in use on [::1], trying next");
                } else {
                    drop(listener);
                    debug!(port = bound, attempts, "Allocated available port");
                    return Ok(bound);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                debug!(port, "Port in use, trying next");
            }
            Err(source) => return Err(PortError::Bind { port, source }),
        }

        match port.checked_add(1) {
            Some(next) => port = next,
            None => break,
        }
    }

    Err(PortError::Exhausted {
        start,
        end: last_probed,
        attempts,
    })
}

/// Hosts without IPv6 cannot bind `::1` at all; that counts as free.
async fn ipv6_loopback_in_use(port: u16) -> bool {
    match TcpListener::bind((Ipv6Addr::LOCALHOST, port)).await {
        Ok(_) => false,
        Err(e) => e.kind() == io::ErrorKind::AddrInUse,
    }
}
