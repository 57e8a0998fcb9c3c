use std::fs::{self, OpenOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use tracing::Level;

use crate::config::EmulatorConfig;
use crate::core::error::{Error, Result};

pub fn parse_level(name: &str) -> Result<Level> {
    Level::from_str(name.trim()).map_err(|_| Error::Logger(format!("unknown log level {:?}", name)))
}

/// 安裝全域 tracing subscriber，寫入設定指定的 log 檔案 (預設 logs/emulator.log)。
/// 已經安裝過時直接略過。
pub fn init(config: &EmulatorConfig) -> Result<()> {
    let level = parse_level(&config.log_level)?;
    let path = Path::new(&config.log_file);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    // Mutex 包住檔案，避免多執行緒寫入交錯
    let installed = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .with_max_level(level)
        .try_init()
        .is_ok();
    if installed {
        tracing::info!("logger ready: {} ({})", path.display(), level);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_level("TRACE").unwrap(), Level::TRACE);
        assert!(matches!(parse_level("loud"), Err(Error::Logger(_))));
    }

    #[test]
    fn test_init_creates_log_dir_and_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmulatorConfig {
            log_file: dir.path().join("nested/emu.log").to_string_lossy().into_owned(),
            ..Default::default()
        };
        init(&config).unwrap();
        init(&config).unwrap();
        assert!(dir.path().join("nested/emu.log").exists());
    }

    #[test]
    fn test_init_rejects_bad_level() {
        let config = EmulatorConfig {
            log_level: "chatty".into(),
            ..Default::default()
        };
        assert!(init(&config).is_err());
    }
}
