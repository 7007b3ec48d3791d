use crate::core::alert::{AlertMessage, Notifier};
use crate::core::config::WhatsAppConfig;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Sends alerts as WhatsApp messages through the Twilio REST API.
pub struct WhatsAppNotifier {
    base_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

impl WhatsAppNotifier {
    /// Returns `None` unless account, token, sender and a recipient are all
    /// known. `to` takes precedence over the configured recipient.
    pub fn from_config(config: &WhatsAppConfig, to: Option<&str>) -> Option<Self> {
        let to = to
            .map(str::to_string)
            .or_else(|| config.to.clone())
            .filter(|to| !to.trim().is_empty())?;

        Some(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone()?,
            auth_token: config.auth_token.clone()?,
            from: config.from.clone()?,
            to,
        })
    }

    fn encode_form(&self, body: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Body", body)
            .append_pair("From", &self.from)
            .append_pair("To", &self.to)
            .finish()
    }
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    fn channel(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, message: &AlertMessage) -> Result<()> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        debug!("Posting WhatsApp message to {}", url);

        let client = reqwest::Client::builder()
            .user_agent("dashfin/1.0")
            .timeout(Duration::from_secs(20))
            .build()?;
        let response = client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(self.encode_form(&message.body))
            .send()
            .await
            .with_context(|| format!("Failed to send WhatsApp message to {}", self.to))?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            bail!("HTTP error: {} sending WhatsApp message: {}", status, text);
        }

        let sent: MessageResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse WhatsApp response: '{text}'"))?;
        info!("WhatsApp message sent, SID: {}", sent.sid);
        Ok(())
    }
}
