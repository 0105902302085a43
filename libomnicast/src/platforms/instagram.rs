//! Instagram publishing via a linked Facebook page
//!
//! Instagram rides on the page's token, so the sequence starts by
//! re-verifying that token; a stale page token aborts only this sequence.
//! Images are staged through the backend to obtain a public URL, then the
//! create-and-publish pair runs against the backend's Instagram proxy.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{attachment_part, network_error, status_error, Publisher};
use crate::error::{PlatformError, Result};
use crate::graph::GraphApi;
use crate::registry::PlatformId;
use crate::types::DraftPost;

pub struct InstagramPublisher {
    http: reqwest::Client,
    api_base_url: String,
    graph: Arc<dyn GraphApi>,
    page_id: String,
    page_token: String,
    instagram_user_id: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

impl InstagramPublisher {
    pub fn new(
        http: reqwest::Client,
        api_base_url: String,
        graph: Arc<dyn GraphApi>,
        page_id: String,
        page_token: String,
        instagram_user_id: String,
    ) -> Self {
        Self {
            http,
            api_base_url,
            graph,
            page_id,
            page_token,
            instagram_user_id,
        }
    }

    /// Stage the image and return its public URL
    async fn upload_image(&self, draft: &DraftPost) -> Result<Option<String>> {
        let platform = PlatformId::Instagram;
        let attachment = match &draft.attachment {
            Some(a) if a.media_type.is_image() => a,
            _ => return Ok(None),
        };

        let form = reqwest::multipart::Form::new()
            .part("file", attachment_part(platform, attachment)?);
        let response = self
            .http
            .post(format!("{}/api/instagram/upload", self.api_base_url))
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
        let url = parsed.url.filter(|u| !u.is_empty()).ok_or_else(|| {
            PlatformError::Publishing {
                platform,
                detail: "upload response carried no URL".to_string(),
            }
        })?;
        Ok(Some(url))
    }
}

#[async_trait]
impl Publisher for InstagramPublisher {
    fn platform(&self) -> PlatformId {
        PlatformId::Instagram
    }

    async fn publish(&self, draft: &DraftPost) -> Result<()> {
        let platform = self.platform();

        // Stale page tokens fail here, before any content leaves the machine.
        self.graph
            .debug_token(&self.page_token)
            .await
            .map_err(|e| PlatformError::Authentication {
                platform,
                detail: format!("page '{}' token rejected: {}", self.page_id, e),
            })?;

        let image_url = self.upload_image(draft).await?;

        let mut payload = json!({
            "pageAccessToken": self.page_token,
            "instagramUserId": self.instagram_user_id,
            "caption": draft.text,
        });
        if let Some(url) = image_url {
            payload["imageUrl"] = json!(url);
        }

        let response = self
            .http
            .post(format!("{}/api/instagram/post", self.api_base_url))
            .json(&payload)
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
