//! Shared HTTP client setup for the platform adapters.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{PlatformError, Result};

/// User-Agent string for all API requests.
pub const USER_AGENT: &str = concat!("shipper/", env!("CARGO_PKG_VERSION"));

/// Timeout for a single API request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle connections are recycled so DNS changes are picked up during long watches.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the client used for every API call.
pub fn create_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(DEFAULT_TIMEOUT)
        .read_timeout(DEFAULT_TIMEOUT)
        .tcp_nodelay(true)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| PlatformError::Client(e.to_string()))
}

/// Turn a non-success response into [`PlatformError::Api`] carrying the body.
pub(crate) async fn ensure_success(platform: &'static str, response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(PlatformError::Api {
        platform,
        status,
        body,
    })
}
