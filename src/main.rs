use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use rust_ega::config::EmulatorConfig;
use rust_ega::core::address::SCREEN_WIDTH;
use rust_ega::core::error::Result;
use rust_ega::core::graphics::{CLEAR_WINDOW_BYTES, Graphics};
use rust_ega::core::mode::DisplayMode;
use rust_ega::core::rotoscope::{Content, Rotoscope};
use rust_ega::emulator::Emulator;
use rust_ega::input::KeyQueue;
use rust_ega::interface::video::{ChannelSink, DebugFrame, DisplayFrame};
use rust_ega::utils::logger;

const FRONT_PAGE: u16 = 0xA000;
const BACK_PAGE: u16 = 0xA200;
const KEY_ESCAPE: u16 = 0x011B;

fn main() {
    if let Err(e) = run() {
        eprintln!("錯誤: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    println!("=== 啟動 EGA 模擬器 ===");

    // 可選的設定檔路徑
    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => EmulatorConfig::load(path)?,
        None => EmulatorConfig::default(),
    };
    logger::init(&config)?;

    let mut emu = Emulator::start(config.clone())?;
    let (frame_sink, frames) = ChannelSink::<DisplayFrame>::new(config.frame_queue_depth);
    let (debug_sink, debugs) = ChannelSink::<DebugFrame>::new(config.frame_queue_depth);
    emu.display().register_frame_observer(Arc::new(frame_sink))?;
    emu.display().register_debug_observer(Arc::new(debug_sink))?;

    let gfx = emu.graphics();
    let keys = emu.keys().clone();
    let shutdown = emu.shutdown_flag();
    let producer = thread::Builder::new()
        .name("producer".into())
        .spawn(move || demo_producer(gfx, keys, shutdown))?;

    let deadline = Instant::now() + Duration::from_secs(config.demo_seconds);
    let mut display_count = 0u64;
    let mut text_count = 0u64;
    let mut last_debug: Option<DebugFrame> = None;
    let mut debug_count = 0u64;
    while Instant::now() < deadline {
        crossbeam::channel::select! {
            recv(frames) -> frame => {
                if let Ok(frame) = frame {
                    display_count += 1;
                    if frame.width != SCREEN_WIDTH {
                        text_count += 1;
                    }
                }
            }
            recv(debugs) -> frame => {
                if let Ok(frame) = frame {
                    debug_count += 1;
                    last_debug = Some(frame);
                }
            }
            default(Duration::from_millis(50)) => {}
        }
    }

    emu.keys().push(KEY_ESCAPE);
    if producer.join().is_err() {
        tracing::error!("producer thread panicked");
    }
    emu.stop();

    println!(
        "畫面: {} (文字模式 {})，除錯畫面: {}，顯示執行緒共產生 {} 次",
        display_count,
        text_count,
        debug_count,
        emu.display().frames_emitted()
    );

    if let Some(frame) = last_debug {
        let dir = Path::new(&config.log_file)
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;
        let path = dir.join("debug_texels.json");
        serde_json::to_writer(BufWriter::new(File::create(&path)?), &frame.texels)?;
        println!("除錯中繼資料已寫入 {}", path.display());
    }
    Ok(())
}

/// 示範用的產生者：先在文字模式輸出，再切換圖形模式以雙緩衝繪圖
fn demo_producer(gfx: Graphics, keys: KeyQueue, shutdown: Arc<AtomicBool>) {
    gfx.text(b"RUST EGA");
    gfx.carriage_return();
    gfx.text(b"TEXT MODE, SWITCHING TO GRAPHICS...");
    thread::sleep(Duration::from_millis(300));
    gfx.set_mode(DisplayMode::Graphics);

    let mut frame = 0i32;
    while !shutdown.load(Ordering::Acquire) && keys.get_key() != KEY_ESCAPE {
        gfx.clear(0, BACK_PAGE, CLEAR_WINDOW_BYTES);

        // 星芒：從中心放射的線段
        for i in 0..16 {
            let angle = (frame as f32 * 0.05) + i as f32 * std::f32::consts::TAU / 16.0;
            let x1 = 80 + (angle.cos() * 60.0) as i32;
            let y1 = 100 + (angle.sin() * 80.0) as i32;
            gfx.line(80, 100, x1, y1, (i % 15 + 1) as u8, false, BACK_PAGE);
        }

        let mut x = 8;
        for &ch in b"RUST EGA" {
            x += gfx.draw_glyph(2, ch as u32, x, 190, 15, false, BACK_PAGE) as i32;
        }
        let mut x = 4;
        for &ch in b"FRAME" {
            x += gfx.draw_glyph(1, ch as u32, x, 12, 14, false, BACK_PAGE) as i32;
        }

        // 以 XOR 移動的方塊
        let bx = frame % 140;
        gfx.blit(
            bx,
            30,
            16,
            16,
            &[0xFF; 32],
            12,
            true,
            BACK_PAGE,
            Rotoscope::new(Content::BoxFill),
        );

        gfx.copy_region(BACK_PAGE, FRONT_PAGE, 0, 0, CLEAR_WINDOW_BYTES as u16);
        frame += 1;
        thread::sleep(Duration::from_millis(16));
    }
    tracing::info!("producer finished after {} frames", frame);
}
