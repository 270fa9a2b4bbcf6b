//! Header redaction for execution records.

use std::collections::BTreeMap;

pub const REDACTED: &str = "<redacted>";

/// Header names whose values are masked in [`apiflow_core::ExecutionRecord`]s.
///
/// Only telemetry is affected; requests still carry the real values.
#[derive(Debug, Clone)]
pub struct SensitiveHeadersConfig {
    /// Matched case-insensitively.
    pub always_redact: Vec<String>,
}

impl Default for SensitiveHeadersConfig {
    fn default() -> Self {
        Self {
            always_redact: ["authorization", "proxy-authorization", "cookie", "set-cookie"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl SensitiveHeadersConfig {
    pub fn with_header(mut self, name: impl Into<String>) -> Self {
        self.always_redact.push(name.into());
        self
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.always_redact
            .iter()
            .any(|h| h.eq_ignore_ascii_case(name))
    }

    pub fn redact(&self, headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        headers
            .iter()
            .map(|(name, value)| {
                let value = if self.is_sensitive(name) {
                    REDACTED.to_string()
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }
}
