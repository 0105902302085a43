//! In-progress post state
//!
//! The composer holds the draft while the user edits it and guards the
//! attachment slot: a file outside the size cap or media allow-list is
//! rejected without touching the current draft. Accepted attachments get a
//! transient preview handle; the registry tracks how many are live so tests
//! can prove replacements do not leak.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{ComposeError, Result};
use crate::types::{Attachment, DraftPost, MediaType};

/// Maximum accepted attachment size (50 MiB)
pub const MAX_ATTACHMENT_BYTES: u64 = 50 * 1024 * 1024;

/// Tracks live preview resources across a composer's lifetime
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&self) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.active.lock().unwrap().insert(id);
        PreviewHandle {
            id,
            registry: self.clone(),
        }
    }

    /// Number of preview resources currently held
    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }
}

/// A display-only preview resource; released on drop
pub struct PreviewHandle {
    id: Uuid,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.active.lock().unwrap().remove(&self.id);
    }
}

/// Mutable draft plus its preview slot
pub struct Composer {
    draft: DraftPost,
    previews: PreviewRegistry,
    preview: Option<PreviewHandle>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    pub fn new() -> Self {
        Self::with_registry(PreviewRegistry::new())
    }

    /// Share a registry so callers can observe preview lifetimes
    pub fn with_registry(previews: PreviewRegistry) -> Self {
        Self {
            draft: DraftPost::default(),
            previews,
            preview: None,
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.draft.text
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.draft.attachment.as_ref()
    }

    /// Preview id for the current attachment, if one is held
    pub fn preview_id(&self) -> Option<Uuid> {
        self.preview.as_ref().map(PreviewHandle::id)
    }

    /// Accept a new attachment, replacing any existing one
    ///
    /// Validation happens before any state changes: on rejection the current
    /// draft and preview are untouched.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::UnsupportedType` for media outside the
    /// allow-list and `ComposeError::TooLarge` past the size cap.
    pub fn attach(&mut self, file_name: &str, mime: &str, bytes: Vec<u8>) -> Result<()> {
        let media_type =
            MediaType::from_mime(mime).ok_or_else(|| ComposeError::UnsupportedType(mime.to_string()))?;
        let size = bytes.len() as u64;
        if size > MAX_ATTACHMENT_BYTES {
            return Err(ComposeError::TooLarge {
                size,
                max: MAX_ATTACHMENT_BYTES,
            }
            .into());
        }

        let sha256 = format!("{:x}", Sha256::digest(&bytes));

        // The old preview must be released before the replacement exists.
        self.preview = None;
        self.preview = Some(self.previews.create());
        self.draft.attachment = Some(Attachment {
            file_name: file_name.to_string(),
            media_type,
            bytes,
            sha256,
        });
        Ok(())
    }

    /// Attach a file from disk, inferring its media type from the extension
    pub fn attach_path(&mut self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let media_type = MediaType::from_extension(&extension)
            .ok_or_else(|| ComposeError::UnsupportedType(extension.clone()))?;
        let bytes = std::fs::read(path)
            .map_err(|e| crate::error::OmnicastError::InvalidInput(format!("{}: {}", path.display(), e)))?;
        self.attach(&file_name, media_type.mime(), bytes)
    }

    /// Drop the attachment and release its preview
    pub fn remove_attachment(&mut self) {
        self.preview = None;
        self.draft.attachment = None;
    }

    /// Immutable copy of the draft for submission
    pub fn snapshot(&self) -> DraftPost {
        self.draft.clone()
    }

    /// Return to the empty default (text cleared, attachment released)
    pub fn reset(&mut self) {
        self.preview = None;
        self.draft = DraftPost::default();
    }

    pub fn active_previews(&self) -> usize {
        self.previews.active_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_accepts_image_within_cap() {
        let mut composer = Composer::new();
        composer.attach("photo.png", "image/png", vec![1, 2, 3]).unwrap();

        let attachment = composer.attachment().unwrap();
        assert_eq!(attachment.file_name, "photo.png");
        assert_eq!(attachment.media_type, MediaType::Png);
        assert!(!attachment.sha256.is_empty());
        assert_eq!(composer.active_previews(), 1);
    }

    #[test]
    fn test_oversize_rejection_leaves_draft_untouched() {
        let mut composer = Composer::new();
        composer.set_text("draft in progress");

        let oversized = vec![0u8; (MAX_ATTACHMENT_BYTES + 1) as usize];
        let result = composer.attach("huge.mp4", "video/mp4", oversized);

        assert!(matches!(
            result,
            Err(crate::error::OmnicastError::Compose(ComposeError::TooLarge { .. }))
        ));
        assert_eq!(composer.text(), "draft in progress");
        assert!(composer.attachment().is_none());
        assert_eq!(composer.active_previews(), 0);
    }

    #[test]
    fn test_unsupported_type_rejected_before_size_check() {
        let mut composer = Composer::new();
        let result = composer.attach("doc.pdf", "application/pdf", vec![0u8; 16]);

        assert!(matches!(
            result,
            Err(crate::error::OmnicastError::Compose(ComposeError::UnsupportedType(_)))
        ));
        assert_eq!(composer.active_previews(), 0);
    }

    #[test]
    fn test_replacement_releases_previous_preview() {
        let mut composer = Composer::new();
        composer.attach("a.png", "image/png", vec![1]).unwrap();
        let first_preview = composer.preview_id().unwrap();

        composer.attach("b.jpg", "image/jpeg", vec![2]).unwrap();

        assert_eq!(composer.active_previews(), 1);
        assert_ne!(composer.preview_id().unwrap(), first_preview);
    }

    #[test]
    fn test_failed_replacement_keeps_existing_attachment() {
        let mut composer = Composer::new();
        composer.attach("a.png", "image/png", vec![1]).unwrap();

        let result = composer.attach("doc.txt", "text/plain", vec![2]);
        assert!(result.is_err());

        assert_eq!(composer.attachment().unwrap().file_name, "a.png");
        assert_eq!(composer.active_previews(), 1);
    }

    #[test]
    fn test_remove_releases_preview() {
        let mut composer = Composer::new();
        composer.attach("a.png", "image/png", vec![1]).unwrap();

        composer.remove_attachment();

        assert!(composer.attachment().is_none());
        assert_eq!(composer.active_previews(), 0);
    }

    #[test]
    fn test_reset_restores_empty_default() {
        let mut composer = Composer::new();
        composer.set_text("posted");
        composer.attach("a.png", "image/png", vec![1]).unwrap();

        composer.reset();

        assert_eq!(composer.text(), "");
        assert!(composer.attachment().is_none());
        assert_eq!(composer.active_previews(), 0);
        assert!(!composer.snapshot().has_content());
    }

    #[test]
    fn test_snapshot_is_independent_of_later_edits() {
        let mut composer = Composer::new();
        composer.set_text("original");
        let snapshot = composer.snapshot();

        composer.set_text("edited");
        assert_eq!(snapshot.text, "original");
    }

    #[test]
    fn test_attach_path_rejects_unknown_extension() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, b"plain text").unwrap();

        let mut composer = Composer::new();
        assert!(composer.attach_path(&path).is_err());
    }

    #[test]
    fn test_attach_path_reads_image() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("pic.jpg");
        std::fs::write(&path, b"\xff\xd8\xff").unwrap();

        let mut composer = Composer::new();
        composer.attach_path(&path).unwrap();
        assert_eq!(composer.attachment().unwrap().media_type, MediaType::Jpeg);
    }
}
