//! # Service Manager Notification
//!
//! Tells a supervising service manager (systemd `Type=notify`) that the
//! daemon is ready or stopping, by sending one datagram to the socket named
//! in `NOTIFY_SOCKET`. Without that variable nothing is sent.

use std::io;

/// Environment variable naming the notification socket.
pub const NOTIFY_SOCKET: &str = "NOTIFY_SOCKET";

pub const READY: &str = "READY=1";
pub const STOPPING: &str = "STOPPING=1";

/// Send `state` to the socket named in `NOTIFY_SOCKET`.
///
/// Returns `Ok(false)` when no service manager is listening.
pub fn notify(state: &str) -> io::Result<bool> {
    match std::env::var(NOTIFY_SOCKET) {
        Ok(socket) if !socket.is_empty() => notify_to(&socket, state).map(|()| true),
        _ => Ok(false),
    }
}

/// Send `state` to `socket`, a filesystem path or a Linux abstract
/// socket name prefixed with `@`.
#[cfg(unix)]
pub fn notify_to(socket: &str, state: &str) -> io::Result<()> {
    use std::os::unix::net::UnixDatagram;

    let sender = UnixDatagram::unbound()?;
    match socket.strip_prefix('@') {
        #[cfg(target_os = "linux")]
        Some(name) => {
            use std::os::linux::net::SocketAddrExt;
            use std::os::unix::net::SocketAddr;

            let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
            sender.send_to_addr(state.as_bytes(), &addr)?;
        }
        _ => {
            sender.send_to(state.as_bytes(), socket)?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn notify_to(_socket: &str, _state: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "service manager notification needs unix sockets",
    ))
}
