//! WhatsApp publishing
//!
//! A single templated message send through the backend proxy; media is not
//! carried on this path.

use async_trait::async_trait;
use serde_json::json;

use super::{network_error, status_error, Publisher};
use crate::error::Result;
use crate::registry::PlatformId;
use crate::types::DraftPost;

pub struct WhatsAppPublisher {
    http: reqwest::Client,
    api_base_url: String,
    access_token: String,
}

impl WhatsAppPublisher {
    pub fn new(http: reqwest::Client, api_base_url: String, access_token: String) -> Self {
        Self {
            http,
            api_base_url,
            access_token,
        }
    }
}

#[async_trait]
impl Publisher for WhatsAppPublisher {
    fn platform(&self) -> PlatformId {
        PlatformId::WhatsApp
    }

    async fn publish(&self, draft: &DraftPost) -> Result<()> {
        let platform = self.platform();

        let response = self
            .http
            .post(format!("{}/api/whatsapp/post", self.api_base_url))
            .bearer_auth(&self.access_token)
            .json(&json!({ "message": draft.text }))
            .send()
            .await
            .map_err(|e| network_error(platform, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(platform, status, &body).into());
        }
        Ok(())
    }
}
