//! Platform publish sequences
//!
//! Each platform implements [`Publisher`]: one `publish` call that runs the
//! platform's full sequence (upload, then create, for the two-step flows) and
//! settles as a whole. Publishers are built from [`PublishTarget`] values,
//! which carry credential snapshots taken once at submission start; a token
//! refresh landing mid-flight never changes what an in-flight sequence uses.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{PlatformError, Result};
use crate::registry::PlatformId;
use crate::types::DraftPost;

pub mod facebook;
pub mod instagram;
pub mod linkedin;
pub mod mock;
pub mod tiktok;
pub mod twitter;
pub mod whatsapp;
pub mod youtube;

/// Credential snapshot for one platform's publish sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishTarget {
    LinkedIn {
        access_token: String,
    },
    Instagram {
        page_id: String,
        page_token: String,
        instagram_user_id: String,
    },
    Facebook {
        page_id: String,
        page_token: String,
    },
    YouTube {
        access_token: String,
    },
    TwitterX {
        access_token: String,
    },
    WhatsApp {
        access_token: String,
    },
    TikTok {
        access_token: String,
        open_id: String,
    },
}

impl PublishTarget {
    pub fn platform(&self) -> PlatformId {
        match self {
            PublishTarget::LinkedIn { .. } => PlatformId::LinkedIn,
            PublishTarget::Instagram { .. } => PlatformId::Instagram,
            PublishTarget::Facebook { .. } => PlatformId::Facebook,
            PublishTarget::YouTube { .. } => PlatformId::YouTube,
            PublishTarget::TwitterX { .. } => PlatformId::TwitterX,
            PublishTarget::WhatsApp { .. } => PlatformId::WhatsApp,
            PublishTarget::TikTok { .. } => PlatformId::TikTok,
        }
    }
}

/// One platform's publish sequence
#[async_trait]
pub trait Publisher: Send + Sync {
    fn platform(&self) -> PlatformId;

    /// Run the full sequence for this platform
    ///
    /// # Errors
    ///
    /// Returns a `PlatformError` naming this platform; the orchestrator folds
    /// it into the platform's outcome without touching siblings.
    async fn publish(&self, draft: &DraftPost) -> Result<()>;
}

/// Builds publishers from credential snapshots
///
/// The orchestrator depends on this seam rather than on concrete publishers,
/// so tests swap in recording fakes.
pub trait PublisherFactory: Send + Sync {
    fn publisher(&self, target: PublishTarget) -> Box<dyn Publisher>;
}

/// Real factory wiring each platform to its HTTP sequence
pub struct HttpPublisherFactory {
    http: reqwest::Client,
    api_base_url: String,
    graph_base_url: String,
    graph: std::sync::Arc<dyn crate::graph::GraphApi>,
}

impl HttpPublisherFactory {
    pub fn new(
        config: &crate::config::Config,
        graph: std::sync::Arc<dyn crate::graph::GraphApi>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            graph_base_url: config.graph_base_url.trim_end_matches('/').to_string(),
            graph,
        }
    }
}

impl PublisherFactory for HttpPublisherFactory {
    fn publisher(&self, target: PublishTarget) -> Box<dyn Publisher> {
        match target {
            PublishTarget::LinkedIn { access_token } => Box::new(linkedin::LinkedInPublisher::new(
                self.http.clone(),
                self.api_base_url.clone(),
                access_token,
            )),
            PublishTarget::Instagram {
                page_id,
                page_token,
                instagram_user_id,
            } => Box::new(instagram::InstagramPublisher::new(
                self.http.clone(),
                self.api_base_url.clone(),
                self.graph.clone(),
                page_id,
                page_token,
                instagram_user_id,
            )),
            PublishTarget::Facebook { page_id, page_token } => {
                Box::new(facebook::FacebookPublisher::new(
                    self.http.clone(),
                    self.graph_base_url.clone(),
                    page_id,
                    page_token,
                ))
            }
            PublishTarget::YouTube { access_token } => Box::new(youtube::YouTubePublisher::new(
                self.http.clone(),
                self.api_base_url.clone(),
                access_token,
            )),
            PublishTarget::TwitterX { access_token } => Box::new(twitter::TwitterPublisher::new(
                self.http.clone(),
                self.api_base_url.clone(),
                access_token,
            )),
            PublishTarget::WhatsApp { access_token } => Box::new(whatsapp::WhatsAppPublisher::new(
                self.http.clone(),
                self.api_base_url.clone(),
                access_token,
            )),
            PublishTarget::TikTok { access_token, open_id } => {
                Box::new(tiktok::TikTokPublisher::new(
                    self.http.clone(),
                    self.api_base_url.clone(),
                    access_token,
                    open_id,
                ))
            }
        }
    }
}

/// Map a transport failure to this platform's error
pub(crate) fn network_error(platform: PlatformId, error: reqwest::Error) -> PlatformError {
    PlatformError::Network {
        platform,
        detail: error.to_string(),
    }
}

/// Map a non-2xx response to this platform's error; 401/403 become
/// authentication failures so they get the auth exit code
pub(crate) fn status_error(platform: PlatformId, status: StatusCode, body: &str) -> PlatformError {
    let detail = if body.is_empty() {
        format!("upstream returned {}", status)
    } else {
        format!("upstream returned {}: {}", status, body)
    };
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        PlatformError::Authentication { platform, detail }
    } else {
        PlatformError::Publishing { platform, detail }
    }
}

/// Build a multipart part from attachment bytes
pub(crate) fn attachment_part(
    platform: PlatformId,
    attachment: &crate::types::Attachment,
) -> Result<reqwest::multipart::Part> {
    reqwest::multipart::Part::bytes(attachment.bytes.clone())
        .file_name(attachment.file_name.clone())
        .mime_str(attachment.media_type.mime())
        .map_err(|e| network_error(platform, e).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_platform_mapping() {
        let target = PublishTarget::TikTok {
            access_token: "t".to_string(),
            open_id: "o".to_string(),
        };
        assert_eq!(target.platform(), PlatformId::TikTok);

        let target = PublishTarget::Instagram {
            page_id: "p".to_string(),
            page_token: "t".to_string(),
            instagram_user_id: "ig".to_string(),
        };
        assert_eq!(target.platform(), PlatformId::Instagram);
    }

    #[test]
    fn test_status_error_distinguishes_auth() {
        let auth = status_error(PlatformId::Facebook, StatusCode::UNAUTHORIZED, "");
        assert!(matches!(auth, PlatformError::Authentication { .. }));

        let publish = status_error(PlatformId::Facebook, StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(publish, PlatformError::Publishing { .. }));
        assert!(format!("{}", publish).contains("boom"));
    }
}
