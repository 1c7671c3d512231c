//! Fill configuration
//!
//! A [`FillConfig`] is built once and passed by reference into every
//! transcode call. It is never mutated during a run, so a single value can be
//! reused across any number of documents.

use crate::error::{FillError, FillResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Main document body part inside a DOCX package
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Element that wraps literal run text in WordprocessingML
pub const TEXT_RUN_ELEMENT: &str = "w:t";

/// Number of tokens held back before a pending variable is given up on
pub const DEFAULT_BUFFER_CAPACITY: usize = 50;

/// Characters that open and close a variable reference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Delimiters {
    pub opening: char,
    pub closing: char,
}

impl Delimiters {
    pub fn new(opening: char, closing: char) -> Self {
        Self { opening, closing }
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new('[', ']')
    }
}

/// Variables and the values they should be replaced with.
///
/// Keys include their delimiters, e.g. `"[name]"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Dictionary(BTreeMap<String, String>);

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Find the key to substitute inside `text`.
    ///
    /// The key whose first occurrence starts earliest wins; when two keys
    /// start at the same offset the longer one wins.
    pub fn find_in(&self, text: &str) -> Option<(&str, &str)> {
        self.iter()
            .filter(|(key, _)| !key.is_empty())
            .filter_map(|(key, value)| text.find(key).map(|pos| (pos, key, value)))
            .min_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.len().cmp(&a.1.len())))
            .map(|(_, key, value)| (key, value))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<HashMap<String, String>> for Dictionary {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for Dictionary {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Everything a transcode call needs to know
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FillConfig {
    /// Variable delimiters
    pub delimiters: Delimiters,
    /// Replacement values keyed by variable (delimiters included)
    pub dictionary: Dictionary,
    /// Archive entry whose text is rewritten
    pub target_part: String,
    /// Qualified name of the element holding run text
    pub text_run_element: String,
    /// Maximum number of tokens held while waiting for a closing delimiter
    pub buffer_capacity: usize,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            dictionary: Dictionary::default(),
            target_part: DOCUMENT_PART.to_string(),
            text_run_element: TEXT_RUN_ELEMENT.to_string(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl FillConfig {
    /// Create a configuration with default settings for the given dictionary
    pub fn new(dictionary: impl Into<Dictionary>) -> Self {
        Self {
            dictionary: dictionary.into(),
            ..Self::default()
        }
    }

    pub fn with_delimiters(mut self, opening: char, closing: char) -> Self {
        self.delimiters = Delimiters::new(opening, closing);
        self
    }

    pub fn with_target_part(mut self, part: impl Into<String>) -> Self {
        self.target_part = part.into();
        self
    }

    pub fn with_text_run_element(mut self, element: impl Into<String>) -> Self {
        self.text_run_element = element.into();
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(content: &str) -> FillResult<Self> {
        let config: FillConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: &Path) -> FillResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Check the configuration before any output is produced
    pub fn validate(&self) -> FillResult<()> {
        if self.delimiters.opening == self.delimiters.closing {
            return Err(FillError::InvalidConfig(format!(
                "opening and closing delimiters are both '{}'",
                self.delimiters.opening
            )));
        }
        if self.buffer_capacity == 0 {
            return Err(FillError::InvalidConfig(
                "buffer capacity must be at least 1".to_string(),
            ));
        }
        if self.target_part.is_empty() {
            return Err(FillError::InvalidConfig("target part is empty".to_string()));
        }
        if self.text_run_element.is_empty() {
            return Err(FillError::InvalidConfig(
                "text run element is empty".to_string(),
            ));
        }
        if self.dictionary.iter().any(|(key, _)| key.is_empty()) {
            return Err(FillError::InvalidConfig(
                "dictionary contains an empty key".to_string(),
            ));
        }
        Ok(())
    }
}
