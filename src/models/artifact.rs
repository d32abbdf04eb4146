//! # Produced Artifacts
//!
//! Artifact naming and the transient image buffer handed from the producer to
//! the artifact store. Filenames follow `<prefix>-<tag>-<n>.<ext>` where the
//! tag is either derived from the batch identifier or stamped from the clock,
//! and `<n>` is the 1-based item position within the batch. Collisions are
//! avoided by this naming, not by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix stripped from batch identifiers when deriving a batch tag
pub const BATCH_KEY_PREFIX: &str = "generated-prompts-";

/// Suffix stripped from batch identifiers when deriving a batch tag
pub const BATCH_KEY_SUFFIX: &str = ".json";

/// Opaque image buffer produced for a single prompt.
///
/// Created transiently per item and handed straight to the artifact store;
/// never retained after the item completes.
#[derive(Debug, Clone)]
pub struct ProducedImage {
    pub bytes: Vec<u8>,
}

impl ProducedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// How the tag segment of artifact filenames is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMode {
    /// Tag comes from the batch identifier, stripped of its known
    /// prefix/suffix
    BatchTag,
    /// Tag is a 14-character compact UTC timestamp (`YYYYMMDDHHmmss`)
    /// generated at artifact-creation time
    Timestamp,
}

/// Derives artifact filenames for produced images
#[derive(Debug, Clone)]
pub struct ArtifactNamer {
    prefix: String,
    extension: String,
    mode: TagMode,
}

impl ArtifactNamer {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>, mode: TagMode) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
            mode,
        }
    }

    /// Namer producing the conventional `image-<tag>-<n>.png` names
    pub fn standard(mode: TagMode) -> Self {
        Self::new("image", "png", mode)
    }

    pub fn mode(&self) -> TagMode {
        self.mode
    }

    /// Derive the filename for the item at `index` (0-based) within the batch
    /// identified by `unit_id`. In timestamp mode the tag is stamped from
    /// `now` instead of the identifier.
    pub fn filename_for(&self, unit_id: &str, index: usize, now: DateTime<Utc>) -> String {
        let tag = match self.mode {
            TagMode::BatchTag => batch_tag_from_unit_id(unit_id),
            TagMode::Timestamp => timestamp_tag(now),
        };
        format!("{}-{}-{}.{}", self.prefix, tag, index + 1, self.extension)
    }
}

impl Default for ArtifactNamer {
    fn default() -> Self {
        Self::standard(TagMode::BatchTag)
    }
}

/// Extract the batch tag from a unit identifier by stripping the known
/// prefix and suffix when present. Identifiers without them (database row
/// ids, custom keys) pass through unchanged.
pub fn batch_tag_from_unit_id(unit_id: &str) -> String {
    let tag = unit_id.strip_prefix(BATCH_KEY_PREFIX).unwrap_or(unit_id);
    let tag = tag.strip_suffix(BATCH_KEY_SUFFIX).unwrap_or(tag);
    tag.to_string()
}

/// Compact 14-character UTC timestamp tag
pub fn timestamp_tag(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_batch_tag_extraction() {
        assert_eq!(
            batch_tag_from_unit_id("generated-prompts-20240101.json"),
            "20240101"
        );
        assert_eq!(batch_tag_from_unit_id("20240101"), "20240101");
        assert_eq!(batch_tag_from_unit_id("42"), "42");
    }

    #[test]
    fn test_filename_batch_tag_mode() {
        let namer = ArtifactNamer::standard(TagMode::BatchTag);
        let name = namer.filename_for("generated-prompts-20240101.json", 2, Utc::now());
        assert_eq!(name, "image-20240101-3.png");
    }

    #[test]
    fn test_filename_timestamp_mode() {
        let namer = ArtifactNamer::standard(TagMode::Timestamp);
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let name = namer.filename_for("ignored", 0, now);
        assert_eq!(name, "image-20240102030405-1.png");
    }

    #[test]
    fn test_timestamp_tag_is_fourteen_chars() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(timestamp_tag(now).len(), 14);
    }
}
