use std::collections::BTreeMap;
use std::time::Duration;

/// Outgoing request settings a step may customize before it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub headers: BTreeMap<String, String>,
    /// Overrides the executor's default timeout for this step.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn bearer_auth(&mut self, token: impl AsRef<str>) -> &mut Self {
        self.header("Authorization", format!("Bearer {}", token.as_ref()))
    }

    pub fn with_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }
}
