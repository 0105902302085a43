//! YouTube publishing
//!
//! Single multipart upload through the backend proxy; the post text becomes
//! the video title.

use async_trait::async_trait;

use super::{attachment_part, network_error, status_error, Publisher};
use crate::error::{PlatformError, Result};
use crate::registry::PlatformId;
use crate::types::DraftPost;

pub struct YouTubePublisher {
    http: reqwest::Client,
    api_base_url: String,
    access_token: String,
}

impl YouTubePublisher {
    pub fn new(http: reqwest::Client, api_base_url: String, access_token: String) -> Self {
        Self {
            http,
            api_base_url,
            access_token,
        }
    }
}

#[async_trait]
impl Publisher for YouTubePublisher {
    fn platform(&self) -> PlatformId {
        PlatformId::YouTube
    }

    async fn publish(&self, draft: &DraftPost) -> Result<()> {
        let platform = self.platform();

        let attachment = draft.attachment.as_ref().ok_or_else(|| {
            PlatformError::Publishing {
                platform,
                detail: "no video attached".to_string(),
            }
        })?;

        let form = reqwest::multipart::Form::new()
            .text("title", draft.text.clone())
            .part("video", attachment_part(platform, attachment)?);
        let response = self
            .http
            .post(format!("{}/api/upload-youtube-video", self.api_base_url))
            .bearer_auth(&self.access_token)
            .multipart(form)
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
