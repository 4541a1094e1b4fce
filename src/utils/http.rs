use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

// No overall timeout on the shared client: the analysis call sets its own
// per-request deadline, which is much longer than a sane global one.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client")
});

pub fn get_http_client() -> &'static Client {
    &HTTP_CLIENT
}
