//! Omnicast - multi-platform social cross-posting core
//!
//! This library tracks per-platform OAuth sessions, keeps Facebook-family
//! tokens fresh, resolves page prerequisites, and fans a composed post out to
//! every selected platform with independent per-platform outcomes.

pub mod accounts;
pub mod composer;
pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod oauth;
pub mod orchestrator;
pub mod platforms;
pub mod registry;
pub mod store;
pub mod tokens;
pub mod types;

// Re-export commonly used types
pub use accounts::{AccountResolver, LinkedAccount};
pub use composer::Composer;
pub use config::Config;
pub use error::{OmnicastError, Result};
pub use orchestrator::{Orchestrator, PostingPhase};
pub use registry::PlatformId;
pub use store::{Credential, CredentialStore, FileStorage, MemoryStorage, StorageBackend};
pub use types::{AggregateStatus, DraftPost, PlatformSelection, PublishOutcome, SubmissionReport};
