use std::collections::BTreeMap;
use std::sync::Arc;

use apiflow_core::{
    Codec, ExecutionRecord, FlowError, InputForwardingMap, JsonCodec, RequestExecutor, RequestInfo,
    ResponseInfo, Statistics, StepInstance,
};
use async_trait::async_trait;
use chrono::Utc;

use crate::executor::http::{HttpClient, HttpRequestParts, ReqwestHttpClient};
use crate::executor::types::ExecutorConfig;

/// Default [`RequestExecutor`]: sends the step over HTTP, records the exchange
/// and materializes the response into a new instance of the same step type.
///
/// The status code never gates the result. A failed call is still recorded
/// and still materialized; problems surface when the body cannot be decoded
/// into the step's value type.
pub struct HttpDataExtender {
    http: Arc<dyn HttpClient>,
    codec: Arc<dyn Codec>,
    config: ExecutorConfig,
}

impl Default for HttpDataExtender {
    fn default() -> Self {
        Self::with_config(ExecutorConfig::default())
    }
}

impl HttpDataExtender {
    pub fn new(http: Arc<dyn HttpClient>, codec: Arc<dyn Codec>, config: ExecutorConfig) -> Self {
        Self { http, codec, config }
    }

    /// reqwest transport with the JSON codec.
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self::new(Arc::new(ReqwestHttpClient::default()), Arc::new(JsonCodec), config)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn resolve_url(&self, step: &dyn StepInstance) -> Result<url::Url, FlowError> {
        let endpoint = step.endpoint();
        let invalid = |message: String| FlowError::InvalidEndpoint {
            step: step.step_name().to_string(),
            endpoint: endpoint.to_string(),
            message,
        };

        match url::Url::parse(endpoint) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.config.base_url {
                Some(base) => base.join(endpoint).map_err(|e| invalid(e.to_string())),
                None => Err(invalid("relative endpoint requires a base_url".to_string())),
            },
            Err(e) => Err(invalid(e.to_string())),
        }
    }

    fn encode_body(&self, step: &dyn StepInstance) -> Result<Option<Vec<u8>>, FlowError> {
        let codec_error = |source| FlowError::Codec {
            step: step.step_name().to_string(),
            source,
        };
        let Some(value) = step.object_value().map_err(codec_error)? else {
            return Ok(None);
        };
        self.codec.encode(&value).map(Some).map_err(codec_error)
    }
}

#[async_trait]
impl RequestExecutor for HttpDataExtender {
    async fn execute(
        &self,
        step: &dyn StepInstance,
        _inputs: &InputForwardingMap,
        statistics: &mut Statistics,
    ) -> Result<Vec<Box<dyn StepInstance>>, FlowError> {
        let name = step.step_name();
        let verb = step
            .descriptor()
            .verb
            .ok_or_else(|| FlowError::VerbConfiguration {
                step: name.to_string(),
            })?;
        let url = self.resolve_url(step)?;

        let mut headers = merge_headers(&self.config.default_headers, &step.client().headers);

        let body = if verb.allows_body() && step.has_body() {
            self.encode_body(step)?
        } else {
            None
        };
        if body.is_some() && !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
            headers.insert(
                "content-type".to_string(),
                self.codec.content_type().to_string(),
            );
        }

        let timeout = step.client().timeout.unwrap_or(self.config.timeout);
        let request = HttpRequestParts {
            method: verb.as_str().to_string(),
            url: url.clone(),
            headers: headers.clone(),
            body: body.clone().unwrap_or_default(),
        };

        tracing::debug!(step = name, method = %verb, url = %url, "sending request");
        let started_at = Utc::now();
        let response = self
            .http
            .send(request, timeout, self.config.max_response_bytes)
            .await
            .map_err(|source| FlowError::Transport {
                step: name.to_string(),
                source,
            })?;
        let finished_at = Utc::now();

        if !(200..300).contains(&response.status) {
            tracing::warn!(step = name, status = response.status, url = %url, "endpoint returned a non-success status");
        }

        statistics.record(ExecutionRecord {
            step: name.to_string(),
            method: verb,
            url: url.to_string(),
            started_at,
            finished_at,
            request: RequestInfo {
                headers: self.config.sensitive_headers.redact(&headers),
                body: body.as_deref().map(|b| String::from_utf8_lossy(b).into_owned()),
            },
            response: ResponseInfo {
                status: response.status,
                reason_phrase: response.reason_phrase().map(str::to_string),
                headers: self.config.sensitive_headers.redact(&response.headers),
                body: String::from_utf8_lossy(&response.body).into_owned(),
            },
        });

        // An empty body (e.g. 204) leaves the new instance unbound.
        let value = if response.body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            let decoded = self
                .codec
                .decode(&response.body)
                .map_err(|source| FlowError::ResponseDecode {
                    step: name.to_string(),
                    source,
                })?;
            Some(decoded)
        };

        Ok(vec![step.materialize(value)?])
    }
}

/// Defaults overlaid by the step's own headers. Names compare case-insensitively,
/// so a step's `Accept` replaces the default `accept`.
fn merge_headers(
    defaults: &BTreeMap<String, String>,
    step: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = defaults
        .iter()
        .filter(|(name, _)| !step.keys().any(|k| k.eq_ignore_ascii_case(name)))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    merged.extend(step.iter().map(|(name, value)| (name.clone(), value.clone())));
    merged
}
