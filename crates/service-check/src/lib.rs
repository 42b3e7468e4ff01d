//! # Service Check
//!
//! Reachability probes for services a bridge depends on, such as the media
//! center it controls. A probe opens a connection and closes it at once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::Instant;
use tracing::{debug, info};

/// Dial timeout for a single probe.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_millis(50);

/// Pause between probes while waiting for a service.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ServiceCheckError {
    #[error("Dialing {network} {address} timed out after {timeout:?}")]
    Timeout {
        network: Network,
        address: String,
        timeout: Duration,
    },

    #[error("Dialing {network} {address} failed: {source}")]
    Dial {
        network: Network,
        address: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Tcp,
    Udp,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
        }
    }
}

/// Open and immediately close a connection to `address`.
///
/// For UDP this only proves the address resolves and a socket can be
/// connected to it; nothing is sent.
pub async fn ping_service(
    network: Network,
    address: &str,
    dial_timeout: Duration,
) -> Result<(), ServiceCheckError> {
    let dial_error = |source| ServiceCheckError::Dial {
        network,
        address: address.to_string(),
        source,
    };

    let dial = async {
        match network {
            Network::Tcp => TcpStream::connect(address).await.map(drop),
            Network::Udp => {
                let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
                socket.connect(address).await
            }
        }
    };

    match tokio::time::timeout(dial_timeout, dial).await {
        Ok(result) => result.map_err(dial_error),
        Err(_) => Err(ServiceCheckError::Timeout {
            network,
            address: address.to_string(),
            timeout: dial_timeout,
        }),
    }
}

/// Polls a service until it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceChecker {
    pub dial_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ServiceChecker {
    fn default() -> Self {
        Self {
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ServiceChecker {
    pub async fn ping(&self, network: Network, address: &str) -> Result<(), ServiceCheckError> {
        ping_service(network, address, self.dial_timeout).await
    }

    /// Probe `address` every poll interval until it answers.
    ///
    /// Returns `true` on the first successful probe. Returns `false` once
    /// `timeout` has elapsed or `keep_waiting` returns `false`; it is
    /// consulted before every probe. A timeout too large to form a
    /// deadline polls without one.
    pub async fn wait_for_service(
        &self,
        network: Network,
        address: &str,
        keep_waiting: impl Fn() -> bool,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now().checked_add(timeout);

        while keep_waiting() {
            match self.ping(network, address).await {
                Ok(()) => {
                    info!(network = %network, address = %address, "Service reachable");
                    return true;
                }
                Err(e) => debug!(error = %e, "Service not reachable yet"),
            }

            let next = Instant::now().checked_add(self.poll_interval);
            match (next, deadline) {
                (Some(next), Some(deadline)) if next < deadline => {
                    tokio::time::sleep_until(next).await;
                }
                (Some(next), None) => tokio::time::sleep_until(next).await,
                (_, Some(deadline)) => {
                    tokio::time::sleep_until(deadline).await;
                    break;
                }
                (None, None) => std::future::pending::<()>().await,
            }
        }

        info!(
            network = %network,
            address = %address,
            timeout = ?timeout,
            "Gave up waiting for service"
        );
        false
    }
}
