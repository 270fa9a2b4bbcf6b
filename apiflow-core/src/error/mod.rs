use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error("step `{step}` could not resolve any forwarded inputs matching `{input}`")]
    ModelResolution { step: String, input: String },
    #[error("step `{step}` does not declare an HTTP verb (GET, POST, PUT, PATCH or DELETE)")]
    VerbConfiguration { step: String },
    #[error("step `{step}` could not resolve model type `{value_type}`")]
    ModelTypeResolution { step: String, value_type: String },
    #[error("step `{step}` has an invalid endpoint `{endpoint}`: {message}")]
    InvalidEndpoint {
        step: String,
        endpoint: String,
        message: String,
    },
    #[error("step `{step}` transport failure: {source}")]
    Transport {
        step: String,
        #[source]
        source: TransportError,
    },
    #[error("step `{step}` response could not be decoded: {source}")]
    ResponseDecode {
        step: String,
        #[source]
        source: CodecError,
    },
    #[error("step `{step}` value could not be encoded: {source}")]
    Codec {
        step: String,
        #[source]
        source: CodecError,
    },
    #[error("step `{step}` produced no value")]
    EmptyResponse { step: String },
}

impl FlowError {
    pub fn model_resolution(step: impl Into<String>, input: impl Into<String>) -> Self {
        Self::ModelResolution {
            step: step.into(),
            input: input.into(),
        }
    }

    /// Name of the step type the error was raised for.
    pub fn step(&self) -> &str {
        match self {
            Self::Route(RouteError::Missing { step } | RouteError::Empty { step }) => step,
            Self::ModelResolution { step, .. }
            | Self::VerbConfiguration { step }
            | Self::ModelTypeResolution { step, .. }
            | Self::InvalidEndpoint { step, .. }
            | Self::Transport { step, .. }
            | Self::ResponseDecode { step, .. }
            | Self::Codec { step, .. }
            | Self::EmptyResponse { step } => step,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("step `{step}` is missing a route declaration")]
    Missing { step: String },
    #[error("step `{step}` declares a route without a value")]
    Empty { step: String },
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,
    #[error("connect/dns/tls error: {0}")]
    Network(String),
    #[error("response too large (>{max_bytes} bytes)")]
    ResponseTooLarge { max_bytes: usize },
    #[error("http error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml codec error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
