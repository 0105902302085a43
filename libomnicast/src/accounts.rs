//! Facebook page resolution and selection
//!
//! Facebook and Instagram publishing goes through a page, so the session
//! keeps a resolved list of pages the user manages. Each page carries its own
//! access token; pages whose token fails introspection are dropped from the
//! list rather than surfacing later as publish failures.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AuthError, Result, StoreError};
use crate::graph::GraphApi;
use crate::registry::PlatformId;
use crate::store::{CredentialStore, PAGES_KEY, SELECTED_PAGE_KEY};

/// Instagram business account linked to a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstagramLink {
    pub id: String,
    pub username: Option<String>,
}

/// One eligible page, with its own access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkedAccount {
    pub id: String,
    pub name: String,
    pub access_token: String,
    #[serde(default)]
    pub instagram: Option<InstagramLink>,
    #[serde(default)]
    pub token_expires_at: Option<i64>,
}

/// Resolves, caches, and selects among the user's pages
pub struct AccountResolver {
    graph: Arc<dyn GraphApi>,
    store: CredentialStore,
}

impl AccountResolver {
    pub fn new(graph: Arc<dyn GraphApi>, store: CredentialStore) -> Self {
        Self { graph, store }
    }

    /// Re-resolve the page list from the Graph API
    ///
    /// Lists pages with the given user token, introspects each page token,
    /// and keeps only pages whose token verifies. The surviving list replaces
    /// the cache, and the selection falls back to the first page if the
    /// previously selected one dropped out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NoEligibleAccounts` when no page survives
    /// filtering; in that case the Facebook credential and every
    /// Facebook-family cache entry are cleared, since the session cannot
    /// publish through that connection anyway.
    pub async fn refresh(&self, user_token: &str) -> Result<Vec<LinkedAccount>> {
        let pages = self.graph.list_pages(user_token).await?;

        let mut accounts = Vec::with_capacity(pages.len());
        for page in pages {
            match self.graph.debug_token(&page.access_token).await {
                Ok(info) => {
                    let mut instagram = page.instagram_business_account.map(|ig| InstagramLink {
                        id: ig.id,
                        username: ig.username,
                    });
                    // The page listing may omit the username; look it up with
                    // the page's own token. Best effort, the id is enough to
                    // publish.
                    if let Some(link) = instagram.as_mut() {
                        if link.username.is_none() {
                            match self
                                .graph
                                .instagram_account(&link.id, &page.access_token)
                                .await
                            {
                                Ok(details) => link.username = details.username,
                                Err(e) => {
                                    warn!("Could not fetch Instagram account {}: {}", link.id, e);
                                }
                            }
                        }
                    }
                    accounts.push(LinkedAccount {
                        id: page.id,
                        name: page.name,
                        access_token: page.access_token,
                        instagram,
                        token_expires_at: (info.expires_at != 0).then_some(info.expires_at),
                    });
                }
                Err(e) => {
                    warn!("Dropping page '{}', token failed verification: {}", page.name, e);
                }
            }
        }

        if accounts.is_empty() {
            self.store.clear(PlatformId::Facebook)?;
            self.store.remove_entry(crate::store::LONG_LIVED_TOKEN_KEY)?;
            self.store.remove_entry(PAGES_KEY)?;
            self.store.remove_entry(SELECTED_PAGE_KEY)?;
            return Err(AuthError::NoEligibleAccounts.into());
        }

        info!("Resolved {} eligible page(s)", accounts.len());
        let serialized = serde_json::to_string(&accounts)
            .map_err(|e| StoreError::Write(e.to_string()))?;
        self.store.set_entry(PAGES_KEY, &serialized)?;

        // The previous selection may no longer exist.
        let selected = self.store.entry(SELECTED_PAGE_KEY)?;
        let still_valid = selected
            .as_deref()
            .map(|id| accounts.iter().any(|a| a.id == id))
            .unwrap_or(false);
        if !still_valid {
            self.store.set_entry(SELECTED_PAGE_KEY, &accounts[0].id)?;
        }

        Ok(accounts)
    }

    /// Page list from the cache; empty if nothing has been resolved yet
    pub fn cached(&self) -> Result<Vec<LinkedAccount>> {
        match self.store.entry(PAGES_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                StoreError::Corrupt {
                    key: PAGES_KEY.to_string(),
                    detail: e.to_string(),
                }
                .into()
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Select a page by id
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the id is not in the cached list.
    pub fn select(&self, page_id: &str) -> Result<()> {
        let accounts = self.cached()?;
        if !accounts.iter().any(|a| a.id == page_id) {
            return Err(crate::error::OmnicastError::InvalidInput(format!(
                "no page with id '{}' in the resolved list",
                page_id
            )));
        }
        self.store.set_entry(SELECTED_PAGE_KEY, page_id)
    }

    /// The selected page, falling back to the first cached page when the
    /// stored selection is missing or stale
    pub fn selected(&self) -> Result<Option<LinkedAccount>> {
        let accounts = self.cached()?;
        if accounts.is_empty() {
            return Ok(None);
        }

        let selected_id = self.store.entry(SELECTED_PAGE_KEY)?;
        let account = selected_id
            .and_then(|id| accounts.iter().find(|a| a.id == id).cloned())
            .unwrap_or_else(|| accounts[0].clone());
        Ok(Some(account))
    }
}
