//! Recording publisher for tests
//!
//! The factory hands out publishers that record every call instead of
//! touching the network, and can be scripted to fail for chosen platforms.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Publisher, PublisherFactory, PublishTarget};
use crate::error::{PlatformError, Result};
use crate::registry::PlatformId;
use crate::types::DraftPost;

/// One observed publish call
#[derive(Debug, Clone)]
pub struct RecordedPublish {
    pub target: PublishTarget,
    pub text: String,
    pub has_attachment: bool,
}

/// Factory producing recording publishers
#[derive(Default)]
pub struct MockPublisherFactory {
    calls: Arc<Mutex<Vec<RecordedPublish>>>,
    failures: Arc<Mutex<HashMap<PlatformId, String>>>,
}

impl MockPublisherFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a failure for one platform's publishes
    pub fn fail_platform(&self, platform: PlatformId, detail: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(platform, detail.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedPublish> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Calls recorded for one platform
    pub fn calls_for(&self, platform: PlatformId) -> Vec<RecordedPublish> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.target.platform() == platform)
            .cloned()
            .collect()
    }
}

impl PublisherFactory for MockPublisherFactory {
    fn publisher(&self, target: PublishTarget) -> Box<dyn Publisher> {
        Box::new(MockPublisher {
            target,
            calls: self.calls.clone(),
            failures: self.failures.clone(),
        })
    }
}

struct MockPublisher {
    target: PublishTarget,
    calls: Arc<Mutex<Vec<RecordedPublish>>>,
    failures: Arc<Mutex<HashMap<PlatformId, String>>>,
}

#[async_trait]
impl Publisher for MockPublisher {
    fn platform(&self) -> PlatformId {
        self.target.platform()
    }

    async fn publish(&self, draft: &DraftPost) -> Result<()> {
        self.calls.lock().unwrap().push(RecordedPublish {
            target: self.target.clone(),
            text: draft.text.clone(),
            has_attachment: draft.attachment.is_some(),
        });

        let platform = self.platform();
        if let Some(detail) = self.failures.lock().unwrap().get(&platform) {
            return Err(PlatformError::Publishing {
                platform,
                detail: detail.clone(),
            }
            .into());
        }
        Ok(())
    }
}
