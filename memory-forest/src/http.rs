use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// Shared HTTP client for all calls to the hosted backend.
///
/// `Client::clone()` is an `Arc` increment, so backends clone it freely.
/// Auth headers are added per request.
static SHARED_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .pool_max_idle_per_host(5)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("[FOREST] Falling back to default HTTP client: {}", e);
            Client::new()
        })
});

pub fn shared_client() -> &'static Client {
    &SHARED_CLIENT
}
