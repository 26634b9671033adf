use thiserror::Error;

/// Failures raised by the inspection, merge and packaging stages.
///
/// Inspection failures (`Decode`, `Io` while reading an input) are isolated per
/// archive. Everything raised after inspection aborts the whole combine.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("archive '{archive}' could not be decoded: {source}")]
    Decode {
        archive: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive '{archive}' contains no message log")]
    MissingLog { archive: String },

    #[error(
        "archives describe different conversations: '{expected_archive}' has chat id {expected}, \
         '{found_archive}' has chat id {found}"
    )]
    IdentityMismatch {
        expected: i64,
        expected_archive: String,
        found: i64,
        found_archive: String,
    },

    #[error("message log in archive '{archive}' is malformed: {detail}")]
    LogParse { archive: String, detail: String },

    #[error("raw contents of archive '{archive}' are no longer available")]
    MissingSource { archive: String },

    #[error("at least two valid archives are required to merge, found {found}")]
    NotEnoughArchives { found: usize },

    #[error("failed to read '{archive}': {source}")]
    Io {
        archive: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write the combined archive: {source}")]
    Package {
        #[source]
        source: zip::result::ZipError,
    },
}

impl MergeError {
    pub(crate) fn log_parse(archive: &str, detail: impl Into<String>) -> Self {
        MergeError::LogParse {
            archive: archive.to_string(),
            detail: detail.into(),
        }
    }

    /// Whether the error only concerns a single input archive
    pub fn is_per_archive(&self) -> bool {
        matches!(
            self,
            MergeError::Decode { .. } | MergeError::MissingLog { .. } | MergeError::Io { .. }
        )
    }
}

pub type EngineResult<T> = std::result::Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mismatch_names_both_ids() {
        let err = MergeError::IdentityMismatch {
            expected: 100,
            expected_archive: "a.zip".to_string(),
            found: 200,
            found_archive: "b.zip".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("200"));
        assert!(msg.contains("a.zip"));
        assert!(msg.contains("b.zip"));
        assert!(!err.is_per_archive());
    }

    #[test]
    fn test_missing_log_is_per_archive() {
        let err = MergeError::MissingLog {
            archive: "broken.zip".to_string(),
        };
        assert!(err.is_per_archive());
        assert!(err.to_string().contains("broken.zip"));
    }
}
