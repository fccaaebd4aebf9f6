//! Workload environment: env-file parsing, merging and rendering.
//!
//! Pure functions only. Reading the env file is the caller's job.

use indexmap::IndexMap;

/// Variables consulted, in order, for the environment label.
pub const ENV_LABEL_KEYS: &[&str] = &["NODE_ENV", "ENV"];

/// Label used when neither `NODE_ENV` nor `ENV` is set.
pub const DEFAULT_ENV_LABEL: &str = "development";

/// Ordered variable mapping handed to the container through `--env-file`.
///
/// Keys are unique. Re-inserting a key replaces the value but keeps the key
/// at its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: IndexMap<String, String>,
}

impl Environment {
    /// Merge env-file content (first) with inline entries (second).
    #[must_use]
    pub fn build(file_content: Option<&str>, inline: &[(String, String)]) -> Self {
        let mut env = Self::default();
        if let Some(content) = file_content {
            for (key, value) in parse_env_file(content) {
                env.set(key, value);
            }
        }
        for (key, value) in inline {
            env.set(key.clone(), value.clone());
        }
        env
    }

    pub fn set(&mut self, key: String, value: String) {
        self.vars.insert(key, value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// The environment name the workload runs as: `NODE_ENV`, then `ENV`.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        ENV_LABEL_KEYS
            .iter()
            .find_map(|k| self.get(k))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// `label()` or `development`.
    #[must_use]
    pub fn label_or_default(&self) -> &str {
        self.label().unwrap_or(DEFAULT_ENV_LABEL)
    }

    /// Whether the label matches one of `markers` (case-insensitive).
    #[must_use]
    pub fn is_production(&self, markers: &[String]) -> bool {
        self.label()
            .is_some_and(|label| markers.iter().any(|m| m.trim().eq_ignore_ascii_case(label)))
    }

    /// Render as `KEY=value` lines in insertion order.
    #[must_use]
    pub fn render(&self) -> String {
        self.vars
            .iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect()
    }
}

/// Parse `KEY=value` lines.
///
/// Blank lines and `#` comments are skipped, a leading `export ` is dropped,
/// the value is everything after the first `=`, and one pair of matching
/// surrounding quotes is stripped. Lines without a key are ignored.
#[must_use]
pub fn parse_env_file(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=').unwrap_or((line, ""));
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
