use std::collections::BTreeMap;
use std::time::Duration;

use crate::sanitize::SensitiveHeadersConfig;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Base that relative step routes (e.g. `/Users`) are joined onto.
    pub base_url: Option<url::Url>,
    /// Applies when the step's client config sets no timeout.
    pub timeout: Duration,
    pub max_response_bytes: usize,
    /// Sent with every request; step client headers take precedence.
    pub default_headers: BTreeMap<String, String>,
    /// Redacted in execution records only.
    pub sensitive_headers: SensitiveHeadersConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_response_bytes: 4 * 1024 * 1024, // 4MB
            default_headers: [("accept".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            sensitive_headers: SensitiveHeadersConfig::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn with_base_url(mut self, base_url: url::Url) -> Self {
        self.base_url = Some(base_url);
        self
    }
}
