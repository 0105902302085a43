//! TikTok publishing
//!
//! Two-step sequence through the backend proxy: upload the video binary to
//! get a media id, then issue the publish call bound to that id.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{attachment_part, network_error, status_error, Publisher};
use crate::error::{PlatformError, Result};
use crate::registry::PlatformId;
use crate::types::DraftPost;

pub struct TikTokPublisher {
    http: reqwest::Client,
    api_base_url: String,
    access_token: String,
    open_id: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

impl TikTokPublisher {
    pub fn new(
        http: reqwest::Client,
        api_base_url: String,
        access_token: String,
        open_id: String,
    ) -> Self {
        Self {
            http,
            api_base_url,
            access_token,
            open_id,
        }
    }
}

#[async_trait]
impl Publisher for TikTokPublisher {
    fn platform(&self) -> PlatformId {
        PlatformId::TikTok
    }

    async fn publish(&self, draft: &DraftPost) -> Result<()> {
        let platform = self.platform();

        // The orchestrator's validation guarantees a video attachment.
        let attachment = draft.attachment.as_ref().ok_or_else(|| {
            PlatformError::Publishing {
                platform,
                detail: "no video attached".to_string(),
            }
        })?;

        let form = reqwest::multipart::Form::new()
            .text("accessToken", self.access_token.clone())
            .text("openId", self.open_id.clone())
            .part("file", attachment_part(platform, attachment)?);
        let response = self
            .http
            .post(format!("{}/api/tiktok/upload", self.api_base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| network_error(platform, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| network_error(platform, e))?;
        if !status.is_success() {
            return Err(status_error(platform, status, &body).into());
        }

        let parsed: UploadResponse = serde_json::from_str(&body).map_err(|e| {
            PlatformError::Publishing {
                platform,
                detail: format!("malformed upload response: {}", e),
            }
        })?;
        let video_id = parsed.video_id.filter(|v| !v.is_empty()).ok_or_else(|| {
            PlatformError::Publishing {
                platform,
                detail: "upload response carried no video id".to_string(),
            }
        })?;

        let response = self
            .http
            .post(format!("{}/api/tiktok/post", self.api_base_url))
            .json(&json!({
                "accessToken": self.access_token,
                "openId": self.open_id,
                "videoId": video_id,
                "caption": draft.text,
            }))
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
