/// Default name of the message log inside an export
pub const DEFAULT_MESSAGE_LOG: &str = "result.json";

/// Directory name macOS adds to archives it creates
pub const MACOS_METADATA_DIR: &str = "__MACOSX";

/// Describes what an export looks like inside its archive: the message log's file
/// name and which archive paths never belong to the logical export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLayout {
    /// File name of the structured message log
    pub message_log: String,

    /// Platform metadata directory names, matched against every path component
    pub metadata_dirs: Vec<String>,

    /// Additional glob-style patterns (`*` wildcards) matched against the raw path
    pub exclude_patterns: Vec<String>,
}

impl Default for ExportLayout {
    fn default() -> Self {
        ExportLayout {
            message_log: DEFAULT_MESSAGE_LOG.to_string(),
            metadata_dirs: vec![MACOS_METADATA_DIR.to_string()],
            exclude_patterns: Vec::new(),
        }
    }
}

impl ExportLayout {
    /// Check whether a raw archive path is part of the logical export
    pub fn should_include(&self, path: &str) -> bool {
        // Hidden entries (".DS_Store", ".git/...")
        if path.starts_with('.') {
            return false;
        }

        if path
            .split('/')
            .any(|component| self.metadata_dirs.iter().any(|dir| dir == component))
        {
            return false;
        }

        !self
            .exclude_patterns
            .iter()
            .any(|pattern| glob_match(pattern, path))
    }

    /// Check whether `path` names the message log, either bare or nested
    pub fn is_message_log(&self, path: &str) -> bool {
        path == self.message_log
            || path
                .strip_suffix(self.message_log.as_str())
                .is_some_and(|head| head.ends_with('/'))
    }
}

/// Simple glob pattern matching
fn glob_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return text.contains(pattern);
    }

    let parts: Vec<_> = pattern.split('*').collect();
    let last = parts.len() - 1;
    let mut pos = 0;

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !text.starts_with(part) {
                return false;
            }
            pos = part.len();
        } else if i == last {
            return text.len() >= pos + part.len() && text[pos..].ends_with(part);
        } else if let Some(idx) = text[pos..].find(part) {
            pos += idx + part.len();
        } else {
            return false;
        }
    }

    true
}
