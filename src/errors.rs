use thiserror::Error;

/// Application-wide error type - single point of truth for the CLI layer
#[derive(Error, Debug)]
pub enum AppError {
    /// Transaction construction failures
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Backend provider failures surfaced directly (e.g. `fetch` commands)
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// File I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration issues
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation/parsing
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Base64 decoding
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Hex decoding
    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Errors raised while selecting, encoding or assembling a transaction
///
/// Every variant is terminal for the build: callers never receive a partially
/// assembled draft alongside one of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Candidates cannot cover the requested outputs plus fee (and dust-safe change)
    #[error("Insufficient funds: available {available} sats, required {required} sats")]
    InsufficientFunds { available: u64, required: u64 },

    /// Malformed `txid:vout` reference or an output index the parent does not have
    #[error("Invalid UTXO reference: {0}")]
    InvalidUtxoReference(String),

    /// Address parsed but belongs to a different network
    #[error("Network mismatch: {address} is not valid for {expected}")]
    NetworkMismatch { address: String, expected: String },

    /// Script or address could not be placed into a supported kind
    #[error("Unsupported script type: {0}")]
    UnsupportedScriptType(String),

    /// Every backend in the provider chain failed
    #[error("All data providers failed for {operation}")]
    ProviderExhausted { operation: String },

    /// Assembled outputs are worth more than the inputs funding them
    #[error("Outputs exceed inputs: inputs {inputs} sats, outputs {outputs} sats")]
    OutputsExceedInputs { inputs: u64, outputs: u64 },

    /// No valid curve point found for a payload segment within the attempt cap
    #[error("Point validation exhausted after {attempts} attempts")]
    PointValidationExhausted { attempts: u32 },

    /// Framed payload does not fit the 2-byte length prefix
    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Decoded bytes are not a well-formed framed payload
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Legacy input whose parent transaction bytes are unavailable
    #[error("Missing previous transaction: {txid}")]
    MissingPreviousTransaction { txid: String },

    /// Caller error (no outputs, bad fee rate, unusable PSBT, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller-level deadline exceeded while fetching
    #[error("Timed out after {timeout_seconds}s during {operation}")]
    Timeout {
        timeout_seconds: u64,
        operation: String,
    },
}

/// Failures of a single data-provider backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Payment/authorisation (402) or other client error; never retried
    #[error("{provider} rejected request with HTTP {status}")]
    Fatal { provider: String, status: u16 },

    /// Network failure, 5xx or RPC error object; retried per policy
    #[error("{provider} transient failure: {message}")]
    Transient { provider: String, message: String },

    /// The backend answered but has no such object
    #[error("{provider}: not found: {what}")]
    NotFound { provider: String, what: String },

    /// Response could not be normalised into the common shape
    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse { provider: String, message: String },
}

impl ProviderError {
    /// Only transient failures consume the retry budget
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient { .. })
    }
}

/// Application-wide result type - single point of truth
pub type AppResult<T> = Result<T, AppError>;

/// Result type for selection/encoding/assembly
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type for a single provider backend
pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidData(format!("JSON error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
