use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::trace;

use super::LivenessProbe;

/// TCP connect probe.
///
/// A completed or refused connection both prove a live host at the address;
/// only a timeout or an unreachable-network error counts as free. Runs
/// without elevated privileges, unlike an ICMP echo.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    port: u16,
}

impl TcpProbe {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self { port: 22 }
    }
}

#[async_trait]
impl LivenessProbe for TcpProbe {
    async fn is_reachable(&self, address: IpAddr, timeout: Duration) -> bool {
        let target = SocketAddr::new(address, self.port);
        match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => true,
            Ok(Err(e)) => {
                trace!(%address, error = %e, "probe connect error, treating address as free");
                false
            }
            Err(_) => false,
        }
    }
}
