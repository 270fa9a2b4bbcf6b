//! Per-request execution records accumulated over the lifetime of a flow.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::step::HttpVerb;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestInfo {
    pub headers: BTreeMap<String, String>,
    /// Body as sent; `None` when the request carried no body.
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseInfo {
    pub status: u16,
    pub reason_phrase: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRecord {
    pub step: String,
    pub method: HttpVerb,
    pub url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub request: RequestInfo,
    pub response: ResponseInfo,
}

impl ExecutionRecord {
    pub fn execution_time(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.response.status)
    }
}

/// Append-only list of [`ExecutionRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    records: Vec<ExecutionRecord>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: ExecutionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&ExecutionRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_execution_time(&self) -> Duration {
        self.records.iter().map(ExecutionRecord::execution_time).sum()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let failed = self.records.iter().filter(|r| !r.is_success()).count();
        serde_json::json!({
            "requests": self.records.len(),
            "failed": failed,
            "duration_ms": self.total_execution_time().as_millis() as u64,
            "records": self.records,
        })
    }
}
