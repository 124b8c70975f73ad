//! Staff notifications. Delivery is fire-and-forget: the gateway call runs
//! off the request path, and a failed send is logged and never rolls back
//! the transition that caused it.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

const GATEWAY_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, staff_id: i32, message: &str);
}

/// Logs messages instead of sending them. Used when no gateway is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, staff_id: i32, message: &str) {
        log::info!("📨 Notification for staff {}: {}", staff_id, message);
    }
}

#[derive(Debug, Serialize)]
struct GatewayMessage<'a> {
    staff_id: i32,
    message: &'a str,
}

/// Posts `{staff_id, message}` as JSON to an SMS/notification gateway.
pub struct SmsGatewayNotifier {
    client: reqwest::Client,
    url: String,
}

impl SmsGatewayNotifier {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client for notifications: {}", e);
                reqwest::Client::new()
            });
        Self { client, url }
    }
}

#[async_trait]
impl Notifier for SmsGatewayNotifier {
    /// Hands the POST to a background task and returns at once.
    async fn notify(&self, staff_id: i32, message: &str) {
        let client = self.client.clone();
        let url = self.url.clone();
        let message = message.to_string();

        tokio::spawn(async move {
            let body = GatewayMessage {
                staff_id,
                message: &message,
            };
            match client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    log::debug!("Notification delivered to staff {}", staff_id);
                }
                Ok(response) => {
                    log::warn!(
                        "Notification gateway returned {} for staff {}",
                        response.status(),
                        staff_id
                    );
                }
                Err(e) => {
                    log::warn!("Notification gateway unreachable for staff {}: {}", staff_id, e);
                }
            }
        });
    }
}
