//! 執行設定 (JSON)

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// 顯示更新間隔 (毫秒)
    pub refresh_interval_ms: u64,
    pub log_file: String,
    /// trace / debug / info / warn / error
    pub log_level: String,
    /// ChannelSink 的 channel 深度
    pub frame_queue_depth: usize,
    pub demo_seconds: u64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            refresh_interval_ms: 16,
            log_file: "logs/emulator.log".to_string(),
            log_level: "info".to_string(),
            frame_queue_depth: 4,
            demo_seconds: 2,
        }
    }
}

impl EmulatorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        Ok(config)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}
