//! FEAT feature-map parsing and storage (RFC 2389 §3)
//!
//! The FEAT command returns one feature per continuation line, each
//! optionally followed by a parameter string (e.g. the MLST facts
//! selector or `REST STREAM`).

use std::collections::HashMap;

/// The set of extension features advertised by a server
///
/// Populated once per session after a successful FEAT exchange and
/// read-only thereafter; lookups never touch the network.
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct Features {
    /// Map of upper-cased feature token to its parameter string
    /// Example: "MLST" -> "type*;size*;modify*;"
    features: HashMap<String, String>,
}

impl Features {
    /// Create an empty Features instance
    pub fn new() -> Self {
        Self {
            features: HashMap::new(),
        }
    }

    /// Parse features from the raw lines of a FEAT reply
    ///
    /// Per RFC 2389 each feature line begins with a single space; the
    /// coded first and last lines are skipped. Blank or malformed lines
    /// are ignored, never an error.
    ///
    /// # Example
    /// ```text
    /// 211-Features:
    ///  MLST type*;size*;modify*;
    ///  REST STREAM
    ///  UTF8
    /// 211 End
    /// ```
    pub fn parse(lines: &[String]) -> Self {
        let mut features = HashMap::new();

        for line in lines {
            let Some(rest) = line.strip_prefix(' ') else {
                continue;
            };
            let rest = rest.trim();
            if rest.is_empty() {
                continue;
            }
            let (name, param) = match rest.split_once(char::is_whitespace) {
                Some((name, param)) => (name, param.trim()),
                None => (rest, ""),
            };
            features.insert(name.to_ascii_uppercase(), param.to_string());
        }

        Self { features }
    }

    /// Check if a feature is advertised
    #[must_use]
    pub fn has(&self, feature: &str) -> bool {
        self.features.contains_key(&feature.to_ascii_uppercase())
    }

    /// Get the parameter string for a feature
    ///
    /// Returns None if the feature is not advertised; an advertised
    /// feature without parameters yields an empty string.
    #[must_use]
    pub fn param(&self, feature: &str) -> Option<&str> {
        self.features
            .get(&feature.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// All advertised feature tokens
    pub fn names(&self) -> Vec<String> {
        self.features.keys().cloned().collect()
    }

    /// True when no features are known (FEAT failed or not yet issued)
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
