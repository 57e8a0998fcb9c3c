//! 執行環境：持有共享的 FrameStore / 模式狀態 / 鍵盤佇列，並執行顯示更新執行緒

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::config::EmulatorConfig;
use crate::core::address::STORE_CAPACITY;
use crate::core::error::Result;
use crate::core::framestore::FrameStore;
use crate::core::graphics::Graphics;
use crate::core::mode::ModeState;
use crate::core::palette::PaletteMapper;
use crate::display::DisplayManager;
use crate::input::KeyQueue;

#[derive(Debug)]
pub struct Emulator {
    config: EmulatorConfig,
    graphics: Graphics,
    display: Arc<DisplayManager>,
    keys: KeyQueue,
    shutdown: Arc<AtomicBool>,
    display_thread: Option<JoinHandle<()>>,
}

impl Emulator {
    /// 配置共享實例並啟動顯示執行緒
    pub fn start(config: EmulatorConfig) -> Result<Self> {
        let store = Arc::new(FrameStore::new(STORE_CAPACITY));
        let mode = Arc::new(ModeState::new());
        let palette = PaletteMapper::new();
        let graphics = Graphics::new(Arc::clone(&store), Arc::clone(&mode), palette);
        let display = Arc::new(DisplayManager::new(store, mode, palette));
        let shutdown = Arc::new(AtomicBool::new(false));

        let interval = config.refresh_interval();
        let thread_display = Arc::clone(&display);
        let thread_shutdown = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("display".into())
            .spawn(move || {
                let ticker = crossbeam::channel::tick(interval);
                while !thread_shutdown.load(Ordering::Acquire) {
                    if ticker.recv().is_err() || thread_shutdown.load(Ordering::Acquire) {
                        break;
                    }
                    thread_display.emit();
                }
                tracing::debug!(
                    "[Emulator] display thread exit after {} frames",
                    thread_display.frames_emitted()
                );
            })?;

        tracing::info!("[Emulator] started, refresh every {:?}", interval);
        Ok(Emulator {
            config,
            graphics,
            display,
            keys: KeyQueue::new(),
            shutdown,
            display_thread: Some(handle),
        })
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// 繪圖引擎的複本，可交給產生者執行緒
    pub fn graphics(&self) -> Graphics {
        self.graphics.clone()
    }

    pub fn display(&self) -> &Arc<DisplayManager> {
        &self.display
    }

    pub fn keys(&self) -> &KeyQueue {
        &self.keys
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn is_running(&self) -> bool {
        self.display_thread.is_some() && !self.shutdown.load(Ordering::Acquire)
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.display_thread.take() {
            if handle.join().is_err() {
                tracing::error!("[Emulator] display thread panicked");
            } else {
                tracing::info!("[Emulator] stopped");
            }
        }
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        self.stop();
    }
}
