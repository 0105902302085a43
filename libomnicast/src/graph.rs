//! Facebook Graph API client
//!
//! The Facebook family (token exchange, token introspection, page listing,
//! Instagram business account lookup) sits behind the [`GraphApi`] trait so
//! the token lifecycle and account resolver can be exercised without network
//! access. [`GraphClient`] is the real implementation.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{AuthError, Result};

/// Introspection result for a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    /// Unix timestamp at which the token expires; 0 means "never" in the
    /// Graph API's envelope
    pub expires_at: i64,
}

/// One manageable page as returned by the page listing
#[derive(Debug, Clone, Deserialize)]
pub struct PageEntry {
    pub id: String,
    pub name: String,
    pub access_token: String,
    #[serde(rename = "instagram_business_account")]
    pub instagram_business_account: Option<InstagramRef>,
}

/// Reference to a linked Instagram business account
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramRef {
    pub id: String,
    pub username: Option<String>,
}

/// Facebook-family endpoints the session depends on
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Exchange a short-lived user token for a long-lived one
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Exchange` when app credentials are misconfigured
    /// or the response carries no token.
    async fn exchange_token(&self, short_lived_token: &str) -> Result<String>;

    /// Introspect a token via the debug endpoint
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Verification` on transport failure or a malformed
    /// envelope.
    async fn debug_token(&self, token: &str) -> Result<TokenInfo>;

    /// List pages the user manages, with any linked Instagram accounts
    async fn list_pages(&self, user_token: &str) -> Result<Vec<PageEntry>>;

    /// Fetch a linked Instagram business account using the page's own token
    async fn instagram_account(&self, ig_id: &str, page_token: &str) -> Result<InstagramRef>;
}

/// Real Graph API client over HTTP
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_secret: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DebugResponse {
    data: DebugData,
}

#[derive(Debug, Deserialize)]
struct DebugData {
    #[serde(default)]
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct PagesResponse {
    #[serde(default)]
    data: Vec<PageEntry>,
}

impl GraphClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.graph_base_url.trim_end_matches('/').to_string(),
            app_id: config.facebook.app_id.clone(),
            app_secret: config.facebook.app_secret.clone(),
        }
    }

    /// App access token used for introspection calls
    fn app_token(&self) -> String {
        format!("{}|{}", self.app_id, self.app_secret)
    }
}

#[async_trait]
impl GraphApi for GraphClient {
    async fn exchange_token(&self, short_lived_token: &str) -> Result<String> {
        if self.app_id.is_empty() || self.app_secret.is_empty() {
            return Err(AuthError::Exchange(
                "missing Facebook app credentials in configuration".to_string(),
            )
            .into());
        }

        let response = self
            .http
            .get(format!("{}/oauth/access_token", self.base_url))
            .query(&[
                ("grant_type", "fb_exchange_token"),
                ("client_id", &self.app_id),
                ("client_secret", &self.app_secret),
                ("fb_exchange_token", short_lived_token),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Exchange(format!(
                "token endpoint returned {}",
                response.status()
            ))
            .into());
        }

        let body: ExchangeResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        body.access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Exchange("no access token returned in response".to_string()).into())
    }

    async fn debug_token(&self, token: &str) -> Result<TokenInfo> {
        let app_token = self.app_token();
        let response = self
            .http
            .get(format!("{}/debug_token", self.base_url))
            .query(&[("input_token", token), ("access_token", &app_token)])
            .send()
            .await
            .map_err(|e| AuthError::Verification(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Verification(format!(
                "debug endpoint returned {}",
                response.status()
            ))
            .into());
        }

        let body: DebugResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Verification(format!("malformed response: {}", e)))?;

        Ok(TokenInfo {
            expires_at: body.data.expires_at,
        })
    }

    async fn list_pages(&self, user_token: &str) -> Result<Vec<PageEntry>> {
        let response = self
            .http
            .get(format!("{}/me/accounts", self.base_url))
            .query(&[
                ("access_token", user_token),
                (
                    "fields",
                    "id,name,access_token,instagram_business_account{id,username}",
                ),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Verification(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Verification(format!(
                "page listing returned {}",
                response.status()
            ))
            .into());
        }

        let body: PagesResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Verification(format!("malformed response: {}", e)))?;

        Ok(body.data)
    }

    async fn instagram_account(&self, ig_id: &str, page_token: &str) -> Result<InstagramRef> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, ig_id))
            .query(&[
                ("access_token", page_token),
                ("fields", "id,username,profile_picture_url"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Verification(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Verification(format!(
                "instagram account lookup returned {}",
                response.status()
            ))
            .into());
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Verification(format!("malformed response: {}", e)).into())
    }
}

// Mock Graph API is available for all builds (not just tests) to support
// integration tests, following the same convention as the mock publisher.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted [`GraphApi`] implementation with call counters
    #[derive(Default)]
    pub struct MockGraph {
        /// Token handed out by `exchange_token`; None makes exchange fail
        pub long_lived_token: Option<String>,
        /// Pages returned by `list_pages`
        pub pages: Vec<PageEntry>,
        /// Tokens for which `debug_token` fails; everything else succeeds
        pub invalid_tokens: Vec<String>,
        /// `expires_at` reported for valid tokens
        pub expires_at: i64,
        /// Per-token expiry overrides, taking precedence over `expires_at`
        pub token_expiries: Mutex<HashMap<String, i64>>,
        /// Instagram accounts by id
        pub instagram_accounts: Mutex<HashMap<String, InstagramRef>>,
        pub exchange_calls: AtomicUsize,
        pub debug_calls: AtomicUsize,
        pub list_calls: AtomicUsize,
    }

    impl MockGraph {
        pub fn new() -> Self {
            Self {
                expires_at: i64::MAX / 2,
                ..Default::default()
            }
        }

        pub fn with_pages(pages: Vec<PageEntry>) -> Self {
            Self {
                pages,
                ..Self::new()
            }
        }

        pub fn total_calls(&self) -> usize {
            self.exchange_calls.load(Ordering::SeqCst)
                + self.debug_calls.load(Ordering::SeqCst)
                + self.list_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GraphApi for MockGraph {
        async fn exchange_token(&self, _short_lived_token: &str) -> Result<String> {
            self.exchange_calls.fetch_add(1, Ordering::SeqCst);
            self.long_lived_token
                .clone()
                .ok_or_else(|| AuthError::Exchange("no access token returned in response".to_string()).into())
        }

        async fn debug_token(&self, token: &str) -> Result<TokenInfo> {
            self.debug_calls.fetch_add(1, Ordering::SeqCst);
            if self.invalid_tokens.iter().any(|t| t == token) {
                return Err(AuthError::Verification("invalid token".to_string()).into());
            }
            let expires_at = self
                .token_expiries
                .lock()
                .unwrap()
                .get(token)
                .copied()
                .unwrap_or(self.expires_at);
            Ok(TokenInfo { expires_at })
        }

        async fn list_pages(&self, _user_token: &str) -> Result<Vec<PageEntry>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.pages.clone())
        }

        async fn instagram_account(&self, ig_id: &str, _page_token: &str) -> Result<InstagramRef> {
            let accounts = self.instagram_accounts.lock().unwrap();
            accounts.get(ig_id).cloned().ok_or_else(|| {
                AuthError::Verification(format!("no instagram account {}", ig_id)).into()
            })
        }
    }
}
