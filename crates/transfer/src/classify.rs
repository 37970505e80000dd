//! Failure classification for copy and fetch errors.
//!
//! Pure decision functions: no I/O, just mapping a failure signal onto
//! the recovery policy the pipeline applies per file.

use arcferry_archive::FetchError;

/// Token-expiry markers matched against copy-tool diagnostic output.
///
/// Substring match, case-sensitive: the diagnostic text is free-form and
/// these phrases appear embedded in larger messages.
pub const AUTH_MARKERS: &[&str] = &["invalid_grant", "maybe token expired"];

/// Coarse failure classes deciding per-file recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferClass {
    /// Remote credentials expired; terminates the whole job.
    AuthExpired,
    /// The file does not exist at the source; skip to the next file.
    NotFound,
    /// A retry might plausibly help; skip to the next file.
    Transient,
    /// Unrecoverable; terminates the whole job.
    Fatal,
}

impl TransferClass {
    /// True for classes that end the job before its file list is exhausted.
    pub fn is_hard_stop(self) -> bool {
        matches!(self, TransferClass::AuthExpired | TransferClass::Fatal)
    }
}

/// Classifies a copy-tool failure from its captured diagnostic text.
///
/// Any non-zero exit is fatal unless the diagnostic carries one of the
/// token-expiry markers.
pub fn classify_copy_failure(diagnostic: &str) -> TransferClass {
    if AUTH_MARKERS.iter().any(|m| diagnostic.contains(m)) {
        TransferClass::AuthExpired
    } else {
        TransferClass::Fatal
    }
}

/// Classifies a fetch failure by HTTP status and error kind.
///
/// 404 means the listed file is gone from the source. Server-side errors
/// and connection-level failures are worth retrying on a later job; the
/// remaining client errors are not.
pub fn classify_fetch_failure(err: &FetchError) -> TransferClass {
    match err.status() {
        Some(404) => TransferClass::NotFound,
        Some(status) if status >= 500 => TransferClass::Transient,
        Some(_) => TransferClass::Fatal,
        None if err.is_timeout_or_connect() => TransferClass::Transient,
        None => TransferClass::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_markers_match_as_substrings() {
        let diag = "2026/01/02 ERROR: couldn't fetch token: invalid_grant (oauth2)";
        assert_eq!(classify_copy_failure(diag), TransferClass::AuthExpired);

        let diag = "Failed to copy: drive: maybe token expired - try refreshing";
        assert_eq!(classify_copy_failure(diag), TransferClass::AuthExpired);
    }

    #[test]
    fn auth_match_is_case_sensitive() {
        assert_eq!(
            classify_copy_failure("ERROR: Invalid_Grant returned"),
            TransferClass::Fatal
        );
        assert_eq!(
            classify_copy_failure("Maybe Token Expired"),
            TransferClass::Fatal
        );
    }

    #[test]
    fn other_copy_failures_are_fatal() {
        assert_eq!(
            classify_copy_failure("directory not writable"),
            TransferClass::Fatal
        );
        assert_eq!(classify_copy_failure(""), TransferClass::Fatal);
    }

    #[test]
    fn fetch_404_is_not_found() {
        let err = FetchError::NotFound("item/a.zip".into());
        assert_eq!(classify_fetch_failure(&err), TransferClass::NotFound);

        let err = FetchError::Status {
            status: 404,
            url: "u".into(),
        };
        assert_eq!(classify_fetch_failure(&err), TransferClass::NotFound);
    }

    #[test]
    fn fetch_5xx_is_transient() {
        for status in [500, 502, 503] {
            let err = FetchError::Status {
                status,
                url: "u".into(),
            };
            assert_eq!(classify_fetch_failure(&err), TransferClass::Transient);
        }
    }

    #[test]
    fn fetch_other_4xx_is_fatal() {
        let err = FetchError::Status {
            status: 403,
            url: "u".into(),
        };
        assert_eq!(classify_fetch_failure(&err), TransferClass::Fatal);
    }

    #[test]
    fn fetch_json_error_is_fatal() {
        let json_err = serde_json::from_str::<arcferry_archive::Metadata>("x").unwrap_err();
        let err = FetchError::Json(json_err);
        assert_eq!(classify_fetch_failure(&err), TransferClass::Fatal);
    }

    #[test]
    fn hard_stop_classes() {
        assert!(TransferClass::AuthExpired.is_hard_stop());
        assert!(TransferClass::Fatal.is_hard_stop());
        assert!(!TransferClass::NotFound.is_hard_stop());
        assert!(!TransferClass::Transient.is_hard_stop());
    }
}
