use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
    #[error("failed to read key file `{path}`: {source}")]
    KeyFile {
        path: String,
        source: std::io::Error,
    },
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("index discovery at `{url}` failed: {message}")]
    Discovery { url: String, message: String },
}

impl InfraError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }

    pub fn discovery(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Discovery {
            url: url.into(),
            message: message.into(),
        }
    }
}
