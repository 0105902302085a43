//! TwitterX publishing
//!
//! Single multipart request through the backend proxy, with the image riding
//! along when one is attached.

use async_trait::async_trait;

use super::{attachment_part, network_error, status_error, Publisher};
use crate::error::Result;
use crate::registry::PlatformId;
use crate::types::DraftPost;

pub struct TwitterPublisher {
    http: reqwest::Client,
    api_base_url: String,
    access_token: String,
}

impl TwitterPublisher {
    pub fn new(http: reqwest::Client, api_base_url: String, access_token: String) -> Self {
        Self {
            http,
            api_base_url,
            access_token,
        }
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    fn platform(&self) -> PlatformId {
        PlatformId::TwitterX
    }

    async fn publish(&self, draft: &DraftPost) -> Result<()> {
        let platform = self.platform();

        let mut form = reqwest::multipart::Form::new().text("content", draft.text.clone());
        if let Some(attachment) = draft.attachment.as_ref().filter(|a| a.media_type.is_image()) {
            form = form.part("image", attachment_part(platform, attachment)?);
        }

        let response = self
            .http
            .post(format!("{}/api/twitter/post", self.api_base_url))
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
