//! Facebook page publishing
//!
//! Posts go straight to the Graph API using the page's own token: text-only
//! to the feed edge, images to the photos edge, videos to the videos edge.

use async_trait::async_trait;
use serde::Deserialize;

use super::{attachment_part, network_error, status_error, Publisher};
use crate::error::{PlatformError, Result};
use crate::registry::PlatformId;
use crate::types::DraftPost;

pub struct FacebookPublisher {
    http: reqwest::Client,
    graph_base_url: String,
    page_id: String,
    page_token: String,
}

#[derive(Deserialize)]
struct PublishResponse {
    id: Option<String>,
    post_id: Option<String>,
}

impl FacebookPublisher {
    pub fn new(
        http: reqwest::Client,
        graph_base_url: String,
        page_id: String,
        page_token: String,
    ) -> Self {
        Self {
            http,
            graph_base_url,
            page_id,
            page_token,
        }
    }

    async fn settle(&self, response: reqwest::Response) -> Result<()> {
        let platform = PlatformId::Facebook;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| network_error(platform, e))?;
        if !status.is_success() {
            return Err(status_error(platform, status, &body).into());
        }
        let parsed: PublishResponse = serde_json::from_str(&body).map_err(|e| {
            PlatformError::Publishing {
                platform,
                detail: format!("malformed response: {}", e),
            }
        })?;
        if parsed.id.is_none() && parsed.post_id.is_none() {
            return Err(PlatformError::Publishing {
                platform,
                detail: "response carried no post id".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl Publisher for FacebookPublisher {
    fn platform(&self) -> PlatformId {
        PlatformId::Facebook
    }

    async fn publish(&self, draft: &DraftPost) -> Result<()> {
        let platform = self.platform();

        let response = match &draft.attachment {
            None => self
                .http
                .post(format!("{}/{}/feed", self.graph_base_url, self.page_id))
                .form(&[
                    ("message", draft.text.as_str()),
                    ("access_token", self.page_token.as_str()),
                ])
                .send()
                .await
                .map_err(|e| network_error(platform, e))?,
            Some(attachment) => {
                let edge = if attachment.media_type.is_video() {
                    "videos"
                } else {
                    "photos"
                };
                let caption_field = if attachment.media_type.is_video() {
                    "description"
                } else {
                    "message"
                };
                let form = reqwest::multipart::Form::new()
                    .text(caption_field, draft.text.clone())
                    .text("access_token", self.page_token.clone())
                    .part("source", attachment_part(platform, attachment)?);
                self.http
                    .post(format!("{}/{}/{}", self.graph_base_url, self.page_id, edge))
                    .multipart(form)
                    .send()
                    .await
                    .map_err(|e| network_error(platform, e))?
            }
        };

        self.settle(response).await
    }
}
