//! Stream labels
//!
//! A [`LabelSet`] is an ordered list of unique key/value pairs. The static
//! part is built once per sink from [`StaticLabelOptions`]; the
//! [`LabelAssembler`] copies it for every record and layers the dynamic
//! labels on top. The template itself is never mutated.

use super::log_context::ORIGINAL_FORMAT_KEY;
use super::log_entry::LogEntry;
use super::options::{DynamicLabelOptions, StaticLabelOptions};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

pub const JOB_LABEL: &str = "job";
pub const INSTANCE_LABEL: &str = "instance";
pub const CATEGORY_LABEL: &str = "category";
pub const LEVEL_LABEL: &str = "level";
pub const EVENT_ID_LABEL: &str = "eventId";
pub const EXCEPTION_LABEL: &str = "exception";

/// Ordered set of unique labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelSet {
    labels: Vec<(String, String)>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self { labels: Vec::new() }
    }

    /// Build the static template
    ///
    /// `job` and `instance` are set first and are not overwritten by
    /// additional labels of the same name.
    pub fn from_static(options: &StaticLabelOptions, hostname: &str) -> Self {
        let mut set = Self::new();

        if !options.job_name.trim().is_empty() {
            set.insert_if_absent(JOB_LABEL, options.job_name.as_str());
        }

        if options.include_instance_label {
            set.insert_if_absent(INSTANCE_LABEL, hostname);
        }

        for (key, value) in &options.additional_static_labels {
            if !value.is_null() {
                set.insert_if_absent(key, value.to_string());
            }
        }

        set
    }

    /// Insert or overwrite; an overwritten label keeps its position
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        let key = normalize_key(key.as_ref());
        let value = value.into();
        match self.labels.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.labels.push((key, value)),
        }
    }

    /// Insert only when the normalized key is not present yet
    pub fn insert_if_absent(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        let key = normalize_key(key.as_ref());
        if !self.contains_key(&key) {
            self.labels.push((key, value.into()));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.labels.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl fmt::Display for LabelSet {
    /// Loki selector syntax: `{job="api",level="Error"}`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}=\"{}\"", key, value)?;
        }
        write!(f, "}}")
    }
}

impl Serialize for LabelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.labels.len()))?;
        for (key, value) in &self.labels {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Remove every whitespace character from a label key
pub fn normalize_key(key: &str) -> String {
    if key.chars().any(char::is_whitespace) {
        key.chars().filter(|c| !c.is_whitespace()).collect()
    } else {
        key.to_string()
    }
}

/// Merges the static template with per-entry labels
#[derive(Debug, Clone)]
pub struct LabelAssembler {
    static_labels: LabelSet,
    options: DynamicLabelOptions,
}

impl LabelAssembler {
    pub fn new(static_labels: LabelSet, options: DynamicLabelOptions) -> Self {
        Self {
            static_labels,
            options,
        }
    }

    pub fn static_labels(&self) -> &LabelSet {
        &self.static_labels
    }

    /// Labels for one entry; dynamic values override static ones
    pub fn build(&self, entry: &LogEntry) -> LabelSet {
        let mut labels = self.static_labels.clone();

        if self.options.include_category && !entry.category.is_empty() {
            labels.insert(CATEGORY_LABEL, entry.category.as_str());
        }

        if self.options.include_log_level {
            labels.insert(LEVEL_LABEL, entry.level.to_str());
        }

        if self.options.include_event_id {
            labels.insert(EVENT_ID_LABEL, entry.event_id.to_string());
        }

        if self.options.include_exception {
            if let Some(error) = &entry.error {
                labels.insert(EXCEPTION_LABEL, error.type_name.as_str());
            }
        }

        if self.options.include_dynamic_tags {
            if let Some(pairs) = entry.state.pairs() {
                for (key, value) in pairs {
                    if key != ORIGINAL_FORMAT_KEY && !value.is_null() {
                        labels.insert(key, value.to_string());
                    }
                }
            }
        }

        labels
    }
}

/// Host name for the `instance` label
///
/// A non-empty `HOSTNAME` environment variable wins; otherwise the machine
/// name is asked from the OS. Falls back to `localhost`.
pub fn hostname() -> String {
    resolve_hostname(std::env::var("HOSTNAME").ok())
}

fn resolve_hostname(env_override: Option<String>) -> String {
    env_override
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .or_else(system_hostname)
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => name
            .to_str()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty()),
        Err(e) => {
            eprintln!("[LOKI WARNING] Failed to get system hostname: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
}
