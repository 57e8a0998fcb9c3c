//! 每個顯示 tick 產生顯示畫面與 rotoscope 除錯畫面，並推送給觀察者。
//!
//! 流程：鎖內複製快照 -> 釋放鎖 -> 鎖外轉換影像 -> 呼叫觀察者。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::address::{AddressTranslator, GRAPHICS_SEGMENT, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::core::error::{Error, Result};
use crate::core::fonts::vga_row;
use crate::core::framestore::FrameStore;
use crate::core::mode::{DisplayMode, ModeSnapshot, ModeState, TEXT_COLUMNS, TEXT_ROWS};
use crate::core::palette::{PaletteMapper, PixelColor};
use crate::core::rotoscope::{Content, Rotoscope};
use crate::interface::video::{
    DebugFrame, DebugObserver, DebugTexel, DisplayFrame, FrameFormat, FrameObserver,
};

const TEXT_CHAR_WIDTH: usize = 8;
const TEXT_CHAR_HEIGHT: usize = 8;

pub const GRAPHICS_FORMAT: FrameFormat = FrameFormat::rgba8(SCREEN_WIDTH, SCREEN_HEIGHT);
pub const TEXT_FORMAT: FrameFormat = FrameFormat::rgba8(
    TEXT_COLUMNS * TEXT_CHAR_WIDTH,
    TEXT_ROWS * TEXT_CHAR_HEIGHT,
);
pub const DEBUG_FORMAT: FrameFormat = FrameFormat::rgba8(SCREEN_WIDTH, SCREEN_HEIGHT);

/// 除錯畫面每種內容的固定顏色
pub fn content_color(content: &Content) -> [u8; 3] {
    match content {
        Content::Clear => [0x00, 0x00, 0x00],
        Content::Navigational => [0x00, 0x80, 0xFF],
        Content::Text(_) => [0xFF, 0xFF, 0xFF],
        Content::Line(_) => [0xFF, 0x00, 0x00],
        Content::Ellipse => [0xFF, 0x80, 0x00],
        Content::BoxFill => [0x00, 0xFF, 0x00],
        Content::PolyFill => [0x00, 0xA0, 0x50],
        Content::Picture => [0xFF, 0x00, 0xFF],
        Content::Plot => [0xFF, 0xFF, 0x00],
        Content::Tile => [0x80, 0x40, 0x00],
        Content::RunBit => [0x00, 0xFF, 0xFF],
        Content::AuxSystem => [0x80, 0x80, 0xFF],
        Content::StarMap => [0xFF, 0xC0, 0xCB],
        Content::SpaceMan => [0xA0, 0x20, 0xF0],
    }
}

pub fn texel(roto: &Rotoscope) -> DebugTexel {
    let (font, character, flags) = match roto.content {
        Content::Text(glyph) => (
            glyph.font as u8,
            glyph.character as u8,
            if glyph.xor { DebugTexel::FLAG_XOR } else { 0 },
        ),
        _ => (0, 0, 0),
    };
    DebugTexel {
        content: roto.content.tag(),
        font,
        character,
        flags,
        glyph_x: roto.blt.x,
        glyph_y: roto.blt.y,
        glyph_w: roto.blt.w,
        glyph_h: roto.blt.h,
        fg: roto.fg,
        bg: roto.bg,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverHandle(u64);

type Registry<T> = Mutex<Vec<(ObserverHandle, Arc<T>)>>;

fn lock_registry<T: ?Sized>(
    registry: &Registry<T>,
) -> MutexGuard<'_, Vec<(ObserverHandle, Arc<T>)>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 顯示管理器：持有 FrameStore 與模式狀態的共享參考，以及觀察者註冊表
pub struct DisplayManager {
    store: Arc<FrameStore>,
    mode: Arc<ModeState>,
    palette: PaletteMapper,
    visible_base: usize,
    frame_observers: Registry<dyn FrameObserver>,
    debug_observers: Registry<dyn DebugObserver>,
    next_handle: AtomicU64,
    frames_emitted: AtomicU64,
}

impl fmt::Debug for DisplayManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayManager")
            .field("visible_base", &self.visible_base)
            .field("frame_observers", &lock_registry(&self.frame_observers).len())
            .field("debug_observers", &lock_registry(&self.debug_observers).len())
            .field("frames_emitted", &self.frames_emitted())
            .finish()
    }
}

impl DisplayManager {
    pub fn new(store: Arc<FrameStore>, mode: Arc<ModeState>, palette: PaletteMapper) -> Self {
        // 顯示頁固定是預設圖形頁 (0xA000 -> 槽位 0)
        let visible_base = AddressTranslator::new(store.capacity())
            .page_base(GRAPHICS_SEGMENT)
            .unwrap_or(0);
        DisplayManager {
            store,
            mode,
            palette,
            visible_base,
            frame_observers: Mutex::new(Vec::new()),
            debug_observers: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            frames_emitted: AtomicU64::new(0),
        }
    }

    fn allocate_handle(&self) -> ObserverHandle {
        ObserverHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    /// 註冊顯示觀察者；固定格式必須是文字或圖形模式的輸出格式之一
    pub fn register_frame_observer(
        &self,
        observer: Arc<dyn FrameObserver>,
    ) -> Result<ObserverHandle> {
        if let Some(format) = observer.format() {
            if format != GRAPHICS_FORMAT && format != TEXT_FORMAT {
                return Err(Error::FormatMismatch {
                    expected: format.to_string(),
                    produced: format!("{} or {}", GRAPHICS_FORMAT, TEXT_FORMAT),
                });
            }
        }
        let handle = self.allocate_handle();
        lock_registry(&self.frame_observers).push((handle, observer));
        tracing::info!("[Display] frame observer {:?} registered", handle);
        Ok(handle)
    }

    pub fn register_debug_observer(
        &self,
        observer: Arc<dyn DebugObserver>,
    ) -> Result<ObserverHandle> {
        if let Some(format) = observer.format() {
            if format != DEBUG_FORMAT {
                return Err(Error::FormatMismatch {
                    expected: format.to_string(),
                    produced: DEBUG_FORMAT.to_string(),
                });
            }
        }
        let handle = self.allocate_handle();
        lock_registry(&self.debug_observers).push((handle, observer));
        tracing::info!("[Display] debug observer {:?} registered", handle);
        Ok(handle)
    }

    pub fn unregister_frame_observer(&self, handle: ObserverHandle) -> bool {
        let mut observers = lock_registry(&self.frame_observers);
        let before = observers.len();
        observers.retain(|(h, _)| *h != handle);
        before != observers.len()
    }

    pub fn unregister_debug_observer(&self, handle: ObserverHandle) -> bool {
        let mut observers = lock_registry(&self.debug_observers);
        let before = observers.len();
        observers.retain(|(h, _)| *h != handle);
        before != observers.len()
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted.load(Ordering::Relaxed)
    }

    fn visible_snapshot(&self) -> (Vec<PixelColor>, Vec<Rotoscope>) {
        let range = self.visible_base..self.visible_base + SCREEN_WIDTH * SCREEN_HEIGHT;
        self.store.snapshot(range).unwrap_or_else(|| {
            (
                vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
                vec![Rotoscope::default(); SCREEN_WIDTH * SCREEN_HEIGHT],
            )
        })
    }

    fn graphics_frame(&self, pixels: &[PixelColor]) -> DisplayFrame {
        let mut rgba = vec![0u8; pixels.len() * 4];
        // 寫入時已翻轉，儲存順序即為由上往下
        for (dst, &color) in rgba.chunks_exact_mut(4).zip(pixels) {
            dst.copy_from_slice(&self.palette.rgba(color));
        }
        DisplayFrame {
            pixels: rgba,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            stride: SCREEN_WIDTH * 4,
        }
    }

    fn text_frame(&self, snapshot: &ModeSnapshot) -> DisplayFrame {
        let width = TEXT_FORMAT.width;
        let height = TEXT_FORMAT.height;
        let mut rgba = vec![0u8; width * height * 4];
        for row in 0..TEXT_ROWS {
            for col in 0..TEXT_COLUMNS {
                let cell = snapshot.cells[row * TEXT_COLUMNS + col];
                let fg = self.palette.rgba(self.palette.index_to_color(cell.foreground()));
                let bg = self.palette.rgba(self.palette.index_to_color(cell.background()));
                for cy in 0..TEXT_CHAR_HEIGHT {
                    let bits = vga_row(cell.character, cy);
                    for cx in 0..TEXT_CHAR_WIDTH {
                        let on = bits & (0x80 >> cx) != 0;
                        let px = col * TEXT_CHAR_WIDTH + cx;
                        let py = row * TEXT_CHAR_HEIGHT + cy;
                        let o = (py * width + px) * 4;
                        rgba[o..o + 4].copy_from_slice(if on { &fg } else { &bg });
                    }
                }
            }
        }
        DisplayFrame {
            pixels: rgba,
            width,
            height,
            stride: width * 4,
        }
    }

    fn debug_frame(&self, roto: &[Rotoscope]) -> DebugFrame {
        let mut rgba = vec![0u8; roto.len() * 4];
        for (dst, r) in rgba.chunks_exact_mut(4).zip(roto) {
            let [red, green, blue] = content_color(&r.content);
            dst.copy_from_slice(&[red, green, blue, 0xFF]);
        }
        DebugFrame {
            pixels: rgba,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            stride: SCREEN_WIDTH * 4,
            texels: roto.iter().map(texel).collect(),
        }
    }

    /// 依目前模式產生顯示畫面
    pub fn render_display_frame(&self) -> DisplayFrame {
        let snapshot = self.mode.snapshot();
        match snapshot.mode {
            DisplayMode::Text => self.text_frame(&snapshot),
            DisplayMode::Graphics => {
                let (pixels, _) = self.visible_snapshot();
                self.graphics_frame(&pixels)
            }
        }
    }

    pub fn render_debug_frame(&self) -> DebugFrame {
        let (_, roto) = self.visible_snapshot();
        self.debug_frame(&roto)
    }

    /// 一個顯示 tick。沒有觀察者時略過對應的轉換。
    pub fn emit(&self) {
        let frame_observers: Vec<Arc<dyn FrameObserver>> = lock_registry(&self.frame_observers)
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        let debug_observers: Vec<Arc<dyn DebugObserver>> = lock_registry(&self.debug_observers)
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        if frame_observers.is_empty() && debug_observers.is_empty() {
            return;
        }

        let mode = self.mode.snapshot();
        let need_store = !debug_observers.is_empty() || mode.mode == DisplayMode::Graphics;
        let (pixels, roto) = if need_store {
            self.visible_snapshot()
        } else {
            (Vec::new(), Vec::new())
        };

        if !frame_observers.is_empty() {
            let frame = match mode.mode {
                DisplayMode::Text => self.text_frame(&mode),
                DisplayMode::Graphics => self.graphics_frame(&pixels),
            };
            let format = frame.format();
            for observer in &frame_observers {
                if observer.format().is_none_or(|f| f == format) {
                    observer.on_frame(&frame);
                }
            }
        }

        if !debug_observers.is_empty() {
            let frame = self.debug_frame(&roto);
            for observer in &debug_observers {
                observer.on_debug(&frame);
            }
        }

        let n = self.frames_emitted.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!("[Display] frame {} emitted ({:?})", n, mode.mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::address::STORE_CAPACITY;
    use crate::core::graphics::Graphics;
    use crate::interface::video::ChannelSink;

    fn setup() -> (Graphics, DisplayManager) {
        let store = Arc::new(FrameStore::new(STORE_CAPACITY));
        let mode = Arc::new(ModeState::new());
        let palette = PaletteMapper::new();
        let gfx = Graphics::new(Arc::clone(&store), Arc::clone(&mode), palette);
        let display = DisplayManager::new(store, mode, palette);
        (gfx, display)
    }

    #[test]
    fn test_graphics_frame_is_top_down_rgba() {
        let (gfx, display) = setup();
        gfx.set_mode(DisplayMode::Graphics);
        gfx.set_pixel(0, 199, 4, 0, Rotoscope::new(Content::Plot));
        gfx.set_pixel(159, 0, 15, 0, Rotoscope::new(Content::Plot));
        let frame = display.render_display_frame();
        assert_eq!(frame.format(), GRAPHICS_FORMAT);
        assert_eq!(frame.stride, 640);
        // 呈現 y=199 是畫面最上方
        assert_eq!(frame.pixel(0, 0), Some([0xAA, 0x00, 0x00, 0xFF]));
        assert_eq!(frame.pixel(159, 199), Some([0xFF, 0xFF, 0xFF, 0xFF]));
        assert_eq!(frame.pixel(1, 1), Some([0x00, 0x00, 0x00, 0xFF]));
    }

    #[test]
    fn test_text_frame_ignores_store() {
        let (gfx, display) = setup();
        gfx.clear(15, 0, 0);
        gfx.set_cursor(0, 0);
        gfx.put_char(b'_');
        let frame = display.render_display_frame();
        assert_eq!(frame.format(), TEXT_FORMAT);
        // '_' 第 7 列全亮 (淺灰)，第 0 列為黑底
        assert_eq!(frame.pixel(3, 7), Some([0xAA, 0xAA, 0xAA, 0xFF]));
        assert_eq!(frame.pixel(3, 0), Some([0x00, 0x00, 0x00, 0xFF]));
    }

    #[test]
    fn test_debug_frame_colors_and_texels() {
        let (gfx, display) = setup();
        gfx.draw_glyph(2, b'_' as u32, 10, 7, 12, true, 0);
        gfx.line(0, 100, 5, 100, 2, false, 0);
        let frame = display.render_debug_frame();
        assert_eq!(frame.format(), DEBUG_FORMAT);
        assert_eq!(frame.texels.len(), 160 * 200);

        // 呈現 y=0 -> 儲存列 199
        let t = frame.texel(10, 199).unwrap();
        assert_eq!(t.content, 2);
        assert_eq!(t.font, 2);
        assert_eq!(t.character, b'_');
        assert_eq!(t.flags & DebugTexel::FLAG_XOR, DebugTexel::FLAG_XOR);
        assert_eq!((t.glyph_w, t.glyph_h), (8, 8));
        assert_eq!((t.glyph_x, t.glyph_y), (0, 7));
        assert_eq!(t.fg, 12);

        let line = frame.texel(3, 99).unwrap();
        assert_eq!(line.content, 3);
        let o = (99 * 160 + 3) * 4;
        assert_eq!(&frame.pixels[o..o + 4], &[0xFF, 0x00, 0x00, 0xFF]);
        assert_eq!(frame.texel(50, 50).unwrap().content, 0);
    }

    #[test]
    fn test_emit_delivers_same_frame_to_all_observers() {
        let (gfx, display) = setup();
        gfx.set_mode(DisplayMode::Graphics);
        gfx.set_pixel(1, 1, 9, 0, Rotoscope::new(Content::Tile));
        let (a, rx_a) = ChannelSink::<DisplayFrame>::new(2);
        let (b, rx_b) = ChannelSink::<DisplayFrame>::new(2);
        let (d, rx_d) = ChannelSink::<DebugFrame>::new(2);
        display.register_frame_observer(Arc::new(a)).unwrap();
        display.register_frame_observer(Arc::new(b)).unwrap();
        display.register_debug_observer(Arc::new(d)).unwrap();
        display.emit();
        let fa = rx_a.try_recv().unwrap();
        let fb = rx_b.try_recv().unwrap();
        assert_eq!(fa, fb);
        let dbg = rx_d.try_recv().unwrap();
        assert_eq!(dbg.texel(1, 198).unwrap().content, 9);
        assert_eq!(display.frames_emitted(), 1);
    }

    #[test]
    fn test_emit_without_observers_skips_work() {
        let (_, display) = setup();
        display.emit();
        assert_eq!(display.frames_emitted(), 0);
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let (_, display) = setup();
        let (sink, rx) = ChannelSink::<DisplayFrame>::new(4);
        let handle = display.register_frame_observer(Arc::new(sink)).unwrap();
        display.emit();
        assert!(display.unregister_frame_observer(handle));
        assert!(!display.unregister_frame_observer(handle));
        display.emit();
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_format_mismatch_rejected_at_registration() {
        let (_, display) = setup();
        let (sink, _rx) = ChannelSink::<DisplayFrame>::new(1);
        let err = display
            .register_frame_observer(Arc::new(sink.with_format(FrameFormat::rgba8(320, 200))))
            .unwrap_err();
        assert!(matches!(err, Error::FormatMismatch { .. }));

        let (dbg, _rx) = ChannelSink::<DebugFrame>::new(1);
        assert!(
            display
                .register_debug_observer(Arc::new(dbg.with_format(TEXT_FORMAT)))
                .is_err()
        );
    }

    #[test]
    fn test_fixed_format_observer_only_sees_matching_mode() {
        let (gfx, display) = setup();
        let (sink, rx) = ChannelSink::<DisplayFrame>::new(4);
        display
            .register_frame_observer(Arc::new(sink.with_format(GRAPHICS_FORMAT)))
            .unwrap();
        display.emit();
        assert!(rx.try_recv().is_err());
        gfx.set_mode(DisplayMode::Graphics);
        display.emit();
        assert_eq!(rx.try_recv().unwrap().format(), GRAPHICS_FORMAT);
    }

    #[test]
    fn test_content_colors_are_distinct() {
        let all = [
            Content::Clear,
            Content::Navigational,
            Content::Text(Default::default()),
            Content::Line(Default::default()),
            Content::Ellipse,
            Content::BoxFill,
            Content::PolyFill,
            Content::Picture,
            Content::Plot,
            Content::Tile,
            Content::RunBit,
            Content::AuxSystem,
            Content::StarMap,
            Content::SpaceMan,
        ];
        let mut colors: Vec<[u8; 3]> = all.iter().map(content_color).collect();
        colors.sort();
        colors.dedup();
        assert_eq!(colors.len(), all.len());
    }
}
