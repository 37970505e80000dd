//! archive.org metadata client.
//!
//! Provides item-URL parsing, metadata lookup with file listing, and
//! streaming per-file downloads. The [`ArchiveFile`] descriptor defined
//! here is the shared file type the rest of the workspace works with.

pub mod client;
pub mod types;

pub use client::{ArchiveClient, Download, FetchError};
pub use types::{ArchiveFile, Metadata};

/// Extracts the archive identifier from an item URL.
///
/// Accepts `details` and `download` links, with or without trailing path
/// segments, query strings or fragments:
///
/// ```
/// use arcferry_archive::parse_archive_url;
///
/// assert_eq!(
///     parse_archive_url("https://archive.org/details/some-item/page2?q=x"),
///     Some("some-item".to_string()),
/// );
/// assert_eq!(parse_archive_url("https://example.com/details/x"), None);
/// ```
pub fn parse_archive_url(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;

    let mut segments = rest.split('/');
    let host = segments.next()?;
    if host != "archive.org" && host != "www.archive.org" {
        return None;
    }

    match (segments.next()?, segments.next()) {
        ("details" | "download", Some(identifier)) => {
            let identifier = identifier.split(['?', '#']).next()?;
            if identifier.is_empty() {
                None
            } else {
                Some(identifier.to_string())
            }
        }
        _ => None,
    }
}
