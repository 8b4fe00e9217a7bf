use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// Default request timeout; generation can take a while
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Shared HTTP client with connection pooling
pub static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)).expect("Failed to create HTTP client")
});

/// Build a pooled client with a custom timeout
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(5)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}

/// Shared client when `timeout_secs` is the default, a dedicated one otherwise
pub fn client_for(timeout_secs: u64) -> reqwest::Result<Client> {
    if timeout_secs == DEFAULT_TIMEOUT_SECS {
        Ok(HTTP_CLIENT.clone())
    } else {
        build_client(Duration::from_secs(timeout_secs))
    }
}
