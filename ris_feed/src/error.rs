use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("upstream url has no host")]
    InvalidUrl,
    #[error("proxy CONNECT failed: {0}")]
    ProxyConnectFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("frame decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("exhausted connect retry budget")]
    RetryBudgetExhausted,
}
