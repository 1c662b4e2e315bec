#[derive(Debug, thiserror::Error)]
pub enum WheelError {
    /// A caller broke a precondition (empty pool, slot out of range, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("config: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WheelError {
    pub fn invalid(message: impl Into<String>) -> Self {
        WheelError::InvalidInput(message.into())
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, WheelError::InvalidInput(_))
    }
}

pub type WheelResult<T> = Result<T, WheelError>;
