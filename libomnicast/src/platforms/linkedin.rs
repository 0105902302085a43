//! LinkedIn publishing
//!
//! Two calls: resolve the member id from the userinfo endpoint to build the
//! author URN, then post the content (and optional image) through the
//! backend proxy.

use async_trait::async_trait;
use serde::Deserialize;

use super::{attachment_part, network_error, status_error, Publisher};
use crate::error::{PlatformError, Result};
use crate::registry::PlatformId;
use crate::types::DraftPost;

pub struct LinkedInPublisher {
    http: reqwest::Client,
    api_base_url: String,
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: Option<String>,
}

impl LinkedInPublisher {
    pub fn new(http: reqwest::Client, api_base_url: String, access_token: String) -> Self {
        Self {
            http,
            api_base_url,
            access_token,
        }
    }

    async fn author_urn(&self) -> Result<String> {
        let platform = PlatformId::LinkedIn;
        let response = self
            .http
            .get(format!("{}/linkedin/userinfo", self.api_base_url))
            .bearer_auth(&self.access_token)
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

        let info: UserInfo = serde_json::from_str(&body).map_err(|e| {
            PlatformError::Publishing {
                platform,
                detail: format!("malformed userinfo response: {}", e),
            }
        })?;
        let sub = info.sub.filter(|s| !s.is_empty()).ok_or_else(|| {
            PlatformError::Authentication {
                platform,
                detail: "userinfo carried no member id".to_string(),
            }
        })?;
        Ok(format!("urn:li:person:{}", sub))
    }
}

#[async_trait]
impl Publisher for LinkedInPublisher {
    fn platform(&self) -> PlatformId {
        PlatformId::LinkedIn
    }

    async fn publish(&self, draft: &DraftPost) -> Result<()> {
        let platform = self.platform();
        let author = self.author_urn().await?;

        let mut form = reqwest::multipart::Form::new()
            .text("content", draft.text.clone())
            .text("author", author);
        if let Some(attachment) = draft.attachment.as_ref().filter(|a| a.media_type.is_image()) {
            form = form.part("image", attachment_part(platform, attachment)?);
        }

        let response = self
            .http
            .post(format!("{}/api/post-to-linkedin", self.api_base_url))
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
