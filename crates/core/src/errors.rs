use thiserror::Error;

/// Unified error type for the entire portfolio-forecast-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Market Data ─────────────────────────────────────────────────
    #[error("Market data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("API error ({provider}): {message}")]
    Api { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request to {provider} timed out after {millis} ms")]
    Timeout { provider: String, millis: u64 },

    #[error("No market data provider registered")]
    NoProvider,

    #[error("Invalid price series for {symbol}: {reason}")]
    InvalidPriceSeries { symbol: String, reason: String },

    // ── Forecasting ─────────────────────────────────────────────────
    #[error("Insufficient data for {symbol}: need at least 2 price points, got {points}")]
    InsufficientData { symbol: String, points: usize },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Simulation task failed: {0}")]
    SimulationAborted(String),

    // ── Ledger ──────────────────────────────────────────────────────
    #[error("Holding {0} is already in the ledger")]
    DuplicateSymbol(String),

    #[error("Holding not found: {0}")]
    HoldingNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ── Output ──────────────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Render error: {0}")]
    Render(String),
}

impl CoreError {
    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::Network(_) | CoreError::Timeout { .. } | CoreError::Api { .. }
        )
    }

    /// Normalize any market-data failure into `DataUnavailable` for `symbol`.
    /// Errors that already are `DataUnavailable` pass through untouched.
    pub fn data_unavailable(symbol: &str, err: CoreError) -> CoreError {
        match err {
            e @ CoreError::DataUnavailable { .. } => e,
            other => CoreError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// The symbol this error refers to, if any.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            CoreError::DataUnavailable { symbol, .. }
            | CoreError::InvalidPriceSeries { symbol, .. }
            | CoreError::InsufficientData { symbol, .. } => Some(symbol),
            CoreError::DuplicateSymbol(symbol) | CoreError::HoldingNotFound(symbol) => {
                Some(symbol)
            }
            _ => None,
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors carry the full URL, which includes the API key.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
