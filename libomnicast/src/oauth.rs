//! OAuth redirect front door
//!
//! Builds the authorization URLs the UI redirects to, and validates the
//! parameters a platform hands back. The anti-forgery `state` value is drawn
//! from the OS CSPRNG and persisted in the session store under the initiating
//! platform; it is compared (and consumed) on callback before any token
//! exchange happens.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use url::Url;

use crate::config::Config;
use crate::error::{AuthError, ConfigError, Result};
use crate::registry::PlatformId;
use crate::store::CredentialStore;

/// Length of the generated anti-forgery state value
const STATE_LEN: usize = 32;

/// Query parameters a platform appends to the callback redirect
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Generate an opaque anti-forgery state value
pub fn generate_state() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// Start an authorization flow for a platform
///
/// Persists a fresh `state` value and returns the URL to redirect the user
/// to. Fails if the platform has no client-side authorization endpoint or no
/// configured client id.
///
/// # Errors
///
/// Returns `ConfigError::MissingField` when the platform's OAuth client is
/// not configured.
pub fn begin_authorization(
    store: &CredentialStore,
    config: &Config,
    platform: PlatformId,
) -> Result<Url> {
    let descriptor = platform.descriptor();

    let authorize_url = descriptor.authorize_url.ok_or_else(|| {
        ConfigError::MissingField(format!(
            "{} authorization is handled by the backend; no client-side authorize URL",
            descriptor.display_name
        ))
    })?;
    let client_id = config.client_id(platform).ok_or_else(|| {
        ConfigError::MissingField(format!("oauth.client_ids.{}", platform.as_str()))
    })?;
    let scope = descriptor.default_scope.unwrap_or_default();

    let state = generate_state();
    store.set_auth_state(platform, &state)?;

    let mut url = Url::parse(authorize_url)
        .map_err(|e| ConfigError::MissingField(format!("authorize URL for {}: {}", platform, e)))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", &config.redirect_uri(platform))
        .append_pair("scope", scope)
        .append_pair("state", &state);

    Ok(url)
}

/// Validate a callback and yield the authorization code
///
/// The persisted state is consumed regardless of outcome, so a replayed
/// callback cannot pass twice.
///
/// # Errors
///
/// Returns `AuthError::Callback` when the code or state is missing, no state
/// was persisted, or the values disagree.
pub fn validate_callback(
    store: &CredentialStore,
    platform: PlatformId,
    params: &CallbackParams,
) -> Result<String> {
    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::Callback("missing code in callback URL".to_string()))?;
    let returned_state = params
        .state
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::Callback("missing state in callback URL".to_string()))?;

    let saved_state = store.take_auth_state(platform)?.ok_or_else(|| {
        AuthError::Callback(format!("no pending authorization for {}", platform.display_name()))
    })?;

    if saved_state != returned_state {
        return Err(AuthError::Callback("state mismatch".to_string()).into());
    }

    Ok(code.to_string())
}
