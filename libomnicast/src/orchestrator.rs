//! Cross-post orchestration
//!
//! The orchestrator takes the composed draft and the platform selection,
//! validates the whole submission up front (nothing is attempted when any
//! check fails), then runs every platform's publish sequence concurrently
//! and joins the results into one report. Credentials are snapshotted into
//! [`PublishTarget`] values before publishing starts, so a token refresh
//! landing mid-flight never leaks into an in-flight sequence.

use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tracing::{info, warn};

use crate::accounts::AccountResolver;
use crate::composer::Composer;
use crate::error::{OmnicastError, Result};
use crate::platforms::{PublishTarget, PublisherFactory};
use crate::registry::PlatformId;
use crate::store::CredentialStore;
use crate::types::{AggregateStatus, DraftPost, PlatformSelection, PublishOutcome, SubmissionReport};

/// Where a submission currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingPhase {
    Idle,
    Validating,
    Publishing,
    Settled(AggregateStatus),
}

pub struct Orchestrator {
    store: CredentialStore,
    resolver: AccountResolver,
    factory: Arc<dyn PublisherFactory>,
    phase: Mutex<PostingPhase>,
}

impl Orchestrator {
    pub fn new(
        store: CredentialStore,
        resolver: AccountResolver,
        factory: Arc<dyn PublisherFactory>,
    ) -> Self {
        Self {
            store,
            resolver,
            factory,
            phase: Mutex::new(PostingPhase::Idle),
        }
    }

    pub fn phase(&self) -> PostingPhase {
        *self.phase.lock().unwrap()
    }

    /// True while a submission is being validated or published
    pub fn is_posting(&self) -> bool {
        matches!(
            self.phase(),
            PostingPhase::Validating | PostingPhase::Publishing
        )
    }

    /// Return a settled orchestrator to idle
    pub fn acknowledge(&self) {
        let mut phase = self.phase.lock().unwrap();
        if let PostingPhase::Settled(_) = *phase {
            *phase = PostingPhase::Idle;
        }
    }

    fn set_phase(&self, next: PostingPhase) {
        *self.phase.lock().unwrap() = next;
    }

    /// Submit the composed post to every selected platform
    ///
    /// On a fully successful submission the composer is reset to its empty
    /// default. The posting flag is cleared on every exit path, including
    /// validation rejection.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the submission as a whole is infeasible;
    /// in that case no platform was contacted. Per-platform publish failures
    /// are not errors here: they land in the report's outcomes.
    pub async fn submit(
        &self,
        composer: &mut Composer,
        selection: &PlatformSelection,
    ) -> Result<SubmissionReport> {
        if self.is_posting() {
            return Err(OmnicastError::InvalidInput(
                "a submission is already in progress".to_string(),
            ));
        }

        self.set_phase(PostingPhase::Validating);
        let draft = composer.snapshot();

        let targets = match self.resolve_targets(&draft, selection) {
            Ok(targets) => targets,
            Err(e) => {
                self.set_phase(PostingPhase::Idle);
                return Err(e);
            }
        };

        self.set_phase(PostingPhase::Publishing);
        info!("Publishing to {} platform(s)", targets.len());

        let attempts = targets.into_iter().map(|target| {
            let platform = target.platform();
            let publisher = self.factory.publisher(target);
            let draft = &draft;
            async move {
                match publisher.publish(draft).await {
                    Ok(()) => {
                        info!("Published to {}", platform.display_name());
                        PublishOutcome::success(platform)
                    }
                    Err(e) => {
                        warn!("Publish to {} failed: {}", platform.display_name(), e);
                        PublishOutcome::failure(platform, e.to_string())
                    }
                }
            }
        });
        let outcomes = join_all(attempts).await;

        let report = SubmissionReport::from_outcomes(outcomes);
        if report.status == AggregateStatus::Success {
            composer.reset();
        }
        self.set_phase(PostingPhase::Settled(report.status));
        Ok(report)
    }

    /// Check submission feasibility and snapshot credentials per platform
    ///
    /// Fails fast on the first violation; no target list is produced and no
    /// network call is made.
    fn resolve_targets(
        &self,
        draft: &DraftPost,
        selection: &PlatformSelection,
    ) -> Result<Vec<PublishTarget>> {
        if selection.is_empty() {
            return Err(OmnicastError::Validation(
                "no platform selected".to_string(),
            ));
        }
        if !draft.has_content() {
            return Err(OmnicastError::Validation(
                "post content is empty".to_string(),
            ));
        }

        let mut targets = Vec::with_capacity(selection.len());
        for platform in selection.iter() {
            if platform.descriptor().requires_video && !draft.has_video() {
                return Err(OmnicastError::Validation(format!(
                    "{} requires a video file",
                    platform.display_name()
                )));
            }
            targets.push(self.target_for(platform)?);
        }
        Ok(targets)
    }

    fn target_for(&self, platform: PlatformId) -> Result<PublishTarget> {
        let credential = self.store.get(platform)?;

        let target = match platform {
            PlatformId::Facebook => {
                if !credential.is_connected() {
                    return Err(not_connected(platform));
                }
                let page = self.resolver.selected()?.ok_or_else(|| {
                    OmnicastError::Validation("no Facebook page selected".to_string())
                })?;
                PublishTarget::Facebook {
                    page_id: page.id,
                    page_token: page.access_token,
                }
            }
            PlatformId::Instagram => {
                // The page token rides on the Facebook connection; a cached
                // page list from a disconnected account is stale.
                if !self.store.is_connected(PlatformId::Facebook)? {
                    return Err(OmnicastError::Validation(
                        "Instagram needs a Facebook page connection".to_string(),
                    ));
                }
                let page = self.resolver.selected()?.ok_or_else(|| {
                    OmnicastError::Validation(
                        "Instagram needs a Facebook page connection".to_string(),
                    )
                })?;
                // Direct connection wins; otherwise fall back to the page's
                // linked business account.
                let instagram_user_id = if credential.is_connected() {
                    credential.primary_token
                } else {
                    page.instagram
                        .as_ref()
                        .map(|ig| ig.id.clone())
                        .ok_or_else(|| {
                            OmnicastError::Validation(
                                "no Instagram account connected or linked to the selected page"
                                    .to_string(),
                            )
                        })?
                };
                PublishTarget::Instagram {
                    page_id: page.id,
                    page_token: page.access_token,
                    instagram_user_id,
                }
            }
            PlatformId::TikTok => {
                if !credential.is_connected() {
                    return Err(not_connected(platform));
                }
                let open_id = credential
                    .secondary_token
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| not_connected(platform))?;
                PublishTarget::TikTok {
                    access_token: credential.primary_token,
                    open_id,
                }
            }
            PlatformId::LinkedIn => {
                if !credential.is_connected() {
                    return Err(not_connected(platform));
                }
                PublishTarget::LinkedIn {
                    access_token: credential.primary_token,
                }
            }
            PlatformId::YouTube => {
                if !credential.is_connected() {
                    return Err(not_connected(platform));
                }
                PublishTarget::YouTube {
                    access_token: credential.primary_token,
                }
            }
            PlatformId::TwitterX => {
                if !credential.is_connected() {
                    return Err(not_connected(platform));
                }
                PublishTarget::TwitterX {
                    access_token: credential.primary_token,
                }
            }
            PlatformId::WhatsApp => {
                if !credential.is_connected() {
                    return Err(not_connected(platform));
                }
                PublishTarget::WhatsApp {
                    access_token: credential.primary_token,
                }
            }
        };
        Ok(target)
    }
}

fn not_connected(platform: PlatformId) -> OmnicastError {
    OmnicastError::Validation(format!("{} is not connected", platform.display_name()))
}
