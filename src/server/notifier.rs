use crate::domain_model::UserId;
use crate::domain_port::IpChangeNotifier;
use chrono::Utc;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

/// Posts the warning to a configured webhook. Delivery is best-effort;
/// the caller already treats any error here as log-and-continue.
pub struct WebhookIpChangeNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookIpChangeNotifier {
    pub fn try_new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }
}

#[async_trait::async_trait]
impl IpChangeNotifier for WebhookIpChangeNotifier {
    async fn notify_ip_change(
        &self,
        user: UserId,
        old_ip: &str,
        new_ip: &str,
    ) -> anyhow::Result<()> {
        let body = json!({
            "event": "ip_change_warning",
            "user_id": user,
            "old_ip": old_ip,
            "new_ip": new_ip,
            "observed_at": Utc::now(),
        });

        self.client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

/// Log-only backend for local runs where no webhook is wired up.
pub struct LogIpChangeNotifier;

#[async_trait::async_trait]
impl IpChangeNotifier for LogIpChangeNotifier {
    async fn notify_ip_change(
        &self,
        user: UserId,
        old_ip: &str,
        new_ip: &str,
    ) -> anyhow::Result<()> {
        warn!(%user, old_ip, new_ip, "rotation attempted from a new address");
        Ok(())
    }
}
