use std::time::Duration;
use async_trait::async_trait;
use log::warn;
use musicfig_core::providers::{CapabilityProvider, Notifier, ProviderError};

/// Posts `{"text": ...}` to a chat incoming-webhook URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    hook: Option<String>,
}

impl WebhookNotifier {
    pub fn new(hook: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Webhook client without timeout: {}", e);
                reqwest::Client::new()
            });
        Self { client, hook }
    }
}

impl CapabilityProvider for WebhookNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn configured(&self) -> bool {
        self.hook.is_some()
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, text: &str) -> Result<(), ProviderError> {
        let Some(hook) = &self.hook else {
            return Err(ProviderError::NotConfigured(self.name()));
        };
        self.client
            .post(hook)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| ProviderError::Failed(e.to_string()))?;
        Ok(())
    }
}
