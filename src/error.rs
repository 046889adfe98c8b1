use thiserror::Error;

/// Fatal at startup: the assistant cannot serve without a catalog.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Catalog source not readable: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog source is not valid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Catalog is missing required column '{0}'")]
    MissingColumn(String),
}

/// Any failure contacting the language model or interpreting its output.
/// Always recovered by a deterministic fallback, never surfaced to callers.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("No API key configured for provider '{0}'")]
    MissingApiKey(String),

    #[error("LLM returned an empty completion")]
    Empty,

    #[error("LLM output is not a usable intent record: {0}")]
    Parse(String),
}
