//! Archive metadata types.

use serde::{Deserialize, Deserializer};

/// Format label assigned to files whose metadata omits one.
pub const UNKNOWN_FORMAT: &str = "Other";

/// One downloadable file within an archive item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    /// File name, unique within its archive.
    pub name: String,
    /// Size in bytes; 0 when the metadata omits or mangles it.
    pub size: u64,
    /// Coarse classification label, e.g. "ZIP" or "Other".
    pub format: String,
}

/// Raw metadata blob for an archive identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    files: Vec<MetadataFile>,
}

impl Metadata {
    /// Lists the item's files as [`ArchiveFile`] descriptors, in the
    /// order the metadata reports them.
    pub fn list_files(&self) -> Vec<ArchiveFile> {
        self.files
            .iter()
            .map(|f| ArchiveFile {
                name: f.name.clone(),
                size: f.size,
                format: f
                    .format
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_FORMAT.to_string()),
            })
            .collect()
    }
}

/// A file entry as it appears in the metadata JSON.
///
/// archive.org reports `size` as a decimal string on most items and as a
/// bare number on some older ones; both shapes are accepted.
#[derive(Debug, Clone, Deserialize)]
struct MetadataFile {
    name: String,
    #[serde(default, deserialize_with = "size_from_string_or_number")]
    size: u64,
    #[serde(default)]
    format: Option<String>,
}

fn size_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Ok(n),
        Some(Raw::Text(s)) => Ok(s.trim().parse().unwrap_or(0)),
        None => Ok(0),
    }
}
