//! Shared post and outcome types

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::PlatformId;

/// Media type of an attachment, restricted to the upload allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Jpeg,
    Png,
    Gif,
    Webp,
    Mp4,
    Avi,
    Mov,
    Wmv,
    Flv,
}

impl MediaType {
    /// Parse a MIME string; None for anything outside the allow-list
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(MediaType::Jpeg),
            "image/png" => Some(MediaType::Png),
            "image/gif" => Some(MediaType::Gif),
            "image/webp" => Some(MediaType::Webp),
            "video/mp4" => Some(MediaType::Mp4),
            "video/x-msvideo" => Some(MediaType::Avi),
            "video/quicktime" => Some(MediaType::Mov),
            "video/x-ms-wmv" => Some(MediaType::Wmv),
            "video/x-flv" => Some(MediaType::Flv),
            _ => None,
        }
    }

    /// Guess from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            "gif" => Some(MediaType::Gif),
            "webp" => Some(MediaType::Webp),
            "mp4" => Some(MediaType::Mp4),
            "avi" => Some(MediaType::Avi),
            "mov" => Some(MediaType::Mov),
            "wmv" => Some(MediaType::Wmv),
            "flv" => Some(MediaType::Flv),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Gif => "image/gif",
            MediaType::Webp => "image/webp",
            MediaType::Mp4 => "video/mp4",
            MediaType::Avi => "video/x-msvideo",
            MediaType::Mov => "video/quicktime",
            MediaType::Wmv => "video/x-ms-wmv",
            MediaType::Flv => "video/x-flv",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            MediaType::Mp4 | MediaType::Avi | MediaType::Mov | MediaType::Wmv | MediaType::Flv
        )
    }

    pub fn is_image(&self) -> bool {
        !self.is_video()
    }
}

/// An accepted attachment, already validated by the composer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
    /// Content digest, used for logging and dedup without dumping bytes
    pub sha256: String,
}

impl Attachment {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Immutable snapshot of the composed post taken at submission time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftPost {
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl DraftPost {
    /// A draft is submittable when it carries text or an attachment
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty() || self.attachment.is_some()
    }

    pub fn has_video(&self) -> bool {
        self.attachment
            .as_ref()
            .map(|a| a.media_type.is_video())
            .unwrap_or(false)
    }
}

/// Which platforms to include in a submission
///
/// Selection is independent of connection state; connection is checked at
/// validation time, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformSelection {
    selected: BTreeSet<PlatformId>,
}

impl PlatformSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, platform: PlatformId) {
        self.selected.insert(platform);
    }

    pub fn deselect(&mut self, platform: PlatformId) {
        self.selected.remove(&platform);
    }

    /// Flip a platform's inclusion; returns the new state
    pub fn toggle(&mut self, platform: PlatformId) -> bool {
        if !self.selected.remove(&platform) {
            self.selected.insert(platform);
            true
        } else {
            false
        }
    }

    pub fn is_selected(&self, platform: PlatformId) -> bool {
        self.selected.contains(&platform)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = PlatformId> + '_ {
        self.selected.iter().copied()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}

impl FromIterator<PlatformId> for PlatformSelection {
    fn from_iter<I: IntoIterator<Item = PlatformId>>(iter: I) -> Self {
        Self {
            selected: iter.into_iter().collect(),
        }
    }
}

/// Result of one platform's publish sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub platform: PlatformId,
    pub status: PublishStatus,
    /// Human-readable cause, present on failure
    pub detail: Option<String>,
}

impl PublishOutcome {
    pub fn success(platform: PlatformId) -> Self {
        Self {
            platform,
            status: PublishStatus::Success,
            detail: None,
        }
    }

    pub fn failure(platform: PlatformId, detail: impl Into<String>) -> Self {
        Self {
            platform,
            status: PublishStatus::Failed,
            detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PublishStatus::Success
    }
}

/// Combined result across every platform attempted in one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    Success,
    PartialFailure,
    Failure,
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateStatus::Success => "success",
            AggregateStatus::PartialFailure => "partial_failure",
            AggregateStatus::Failure => "failure",
        };
        write!(f, "{}", s)
    }
}

/// Everything a caller needs to render the result of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub status: AggregateStatus,
    pub outcomes: Vec<PublishOutcome>,
}

impl SubmissionReport {
    /// Fold per-platform outcomes into the aggregate verdict
    pub fn from_outcomes(outcomes: Vec<PublishOutcome>) -> Self {
        let successes = outcomes.iter().filter(|o| o.is_success()).count();
        let status = if successes == outcomes.len() {
            AggregateStatus::Success
        } else if successes == 0 {
            AggregateStatus::Failure
        } else {
            AggregateStatus::PartialFailure
        };
        Self { status, outcomes }
    }

    /// One-line status message
    pub fn summary(&self) -> String {
        match self.status {
            AggregateStatus::Success => {
                format!("Posted to {} platform(s)", self.outcomes.len())
            }
            AggregateStatus::PartialFailure => {
                let failed: Vec<&str> = self
                    .outcomes
                    .iter()
                    .filter(|o| !o.is_success())
                    .map(|o| o.platform.display_name())
                    .collect();
                format!("Posted with failures on: {}", failed.join(", "))
            }
            AggregateStatus::Failure => "All publishes failed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_allow_list() {
        assert_eq!(MediaType::from_mime("image/png"), Some(MediaType::Png));
        assert_eq!(MediaType::from_mime("video/quicktime"), Some(MediaType::Mov));
        assert_eq!(MediaType::from_mime("application/pdf"), None);
        assert_eq!(MediaType::from_mime("text/plain"), None);
    }

    #[test]
    fn test_media_type_video_split() {
        assert!(MediaType::Mp4.is_video());
        assert!(MediaType::Flv.is_video());
        assert!(MediaType::Webp.is_image());
        assert!(!MediaType::Jpeg.is_video());
    }

    #[test]
    fn test_extension_lookup_is_case_insensitive() {
        assert_eq!(MediaType::from_extension("JPG"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_extension("MoV"), Some(MediaType::Mov));
        assert_eq!(MediaType::from_extension("exe"), None);
    }

    #[test]
    fn test_draft_content_check() {
        let mut draft = DraftPost::default();
        assert!(!draft.has_content());

        draft.text = "   ".to_string();
        assert!(!draft.has_content());

        draft.text = "hello".to_string();
        assert!(draft.has_content());
    }

    #[test]
    fn test_selection_toggle_is_idempotent_in_pairs() {
        let mut selection = PlatformSelection::new();
        let original = selection.clone();

        selection.select(PlatformId::TikTok);
        selection.deselect(PlatformId::TikTok);
        assert_eq!(selection, original);

        assert!(selection.toggle(PlatformId::TikTok));
        assert!(!selection.toggle(PlatformId::TikTok));
        assert_eq!(selection, original);
    }

    #[test]
    fn test_selection_reselect_matches_original() {
        let mut a = PlatformSelection::new();
        a.select(PlatformId::Facebook);
        let snapshot = a.clone();

        a.deselect(PlatformId::Facebook);
        a.select(PlatformId::Facebook);
        assert_eq!(a, snapshot);
    }

    #[test]
    fn test_aggregate_all_success() {
        let report = SubmissionReport::from_outcomes(vec![
            PublishOutcome::success(PlatformId::Facebook),
            PublishOutcome::success(PlatformId::Instagram),
        ]);
        assert_eq!(report.status, AggregateStatus::Success);
    }

    #[test]
    fn test_aggregate_partial_failure() {
        let report = SubmissionReport::from_outcomes(vec![
            PublishOutcome::failure(PlatformId::TikTok, "upstream 500"),
            PublishOutcome::success(PlatformId::WhatsApp),
        ]);
        assert_eq!(report.status, AggregateStatus::PartialFailure);
        assert!(report.summary().contains("TikTok"));
    }

    #[test]
    fn test_aggregate_all_failed() {
        let report = SubmissionReport::from_outcomes(vec![PublishOutcome::failure(
            PlatformId::YouTube,
            "upload rejected",
        )]);
        assert_eq!(report.status, AggregateStatus::Failure);
    }

    #[test]
    fn test_report_serializes_for_machine_output() {
        let report = SubmissionReport::from_outcomes(vec![PublishOutcome::success(
            PlatformId::LinkedIn,
        )]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"success\""));
        assert!(json.contains("\"platform\":\"linkedin\""));
    }
}
