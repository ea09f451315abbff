use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpStream;

/// Connect timeout for each endpoint probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub endpoint: String,
    pub reachable: bool,
}

/// Whether a TCP connection to `endpoint` ("host:port") opens within `timeout`.
pub async fn is_reachable(endpoint: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(endpoint)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            tracing::debug!(%endpoint, error = %e, "endpoint refused connection");
            false
        }
        Err(_) => {
            tracing::debug!(%endpoint, ?timeout, "endpoint probe timed out");
            false
        }
    }
}

/// The first endpoint, in configured order, that accepts a connection.
pub async fn first_reachable(endpoints: &[String], timeout: Duration) -> Option<String> {
    for endpoint in endpoints {
        if is_reachable(endpoint, timeout).await {
            return Some(endpoint.clone());
        }
    }
    None
}

/// Probe every endpoint, for diagnostics.
pub async fn probe_all(endpoints: &[String], timeout: Duration) -> Vec<ProbeResult> {
    let mut results = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        results.push(ProbeResult {
            endpoint: endpoint.clone(),
            reachable: is_reachable(endpoint, timeout).await,
        });
    }
    results
}
