use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// 模擬器外圍錯誤。繪圖操作本身永不回傳錯誤，這裡只涵蓋設定、日誌與觀察者註冊。
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("observer expects {expected}, emitter produces {produced}")]
    FormatMismatch {
        expected: String,
        produced: String,
    },
    #[error("logger setup failed: {0}")]
    Logger(String),
}
