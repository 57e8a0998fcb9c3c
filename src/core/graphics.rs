//! 繪圖原語：像素、清除、線段、單色 blit、字形、區塊複製
//!
//! 所有座標皆為舊版介面的呈現座標 (y 由下往上)，翻轉只在
//! `AddressTranslator::pixel_index` 發生一次。繪圖操作永不回傳錯誤：
//! 位址無效時直接略過。

use std::sync::Arc;

use crate::core::address::{AddressTranslator, SCREEN_HEIGHT, SCREEN_WIDTH, SLOTS_PER_BYTE};
use crate::core::fonts::Font;
use crate::core::framestore::{FrameStore, Planes};
use crate::core::mode::{DisplayMode, ModeState};
use crate::core::palette::PaletteMapper;
use crate::core::rotoscope::{Content, LineSegment, Rotoscope};

/// 清除固定使用的視窗大小 (舊版位元組)
pub const CLEAR_WINDOW_BYTES: usize = 0x2000;

/// 超過這個步數的線段改為只走可見部分
const LINE_WALK_LIMIT: u32 = 4 * (SCREEN_WIDTH + SCREEN_HEIGHT) as u32;

// 某一軸落在 [-1, size] 內的步數區間 (截斷取整前)，之後逐點再檢查邊界
fn visible_steps(start: i32, step: f64, size: usize) -> Option<(f64, f64)> {
    let (lo, hi) = (-1.0 - start as f64, size as f64 - start as f64);
    if step == 0.0 {
        return (lo < 0.0 && 0.0 < hi).then_some((f64::NEG_INFINITY, f64::INFINITY));
    }
    let (a, b) = (lo / step, hi / step);
    Some((a.min(b), a.max(b)))
}

#[derive(Debug, Clone)]
pub struct Graphics {
    store: Arc<FrameStore>,
    mode: Arc<ModeState>,
    palette: PaletteMapper,
    translator: AddressTranslator,
}

impl Graphics {
    pub fn new(store: Arc<FrameStore>, mode: Arc<ModeState>, palette: PaletteMapper) -> Self {
        let translator = AddressTranslator::new(store.capacity());
        Graphics {
            store,
            mode,
            palette,
            translator,
        }
    }

    pub fn store(&self) -> &Arc<FrameStore> {
        &self.store
    }

    pub fn translator(&self) -> &AddressTranslator {
        &self.translator
    }

    // 鎖內讀取：超出範圍回傳 (0, 預設紀錄)
    fn peek(&self, planes: &Planes, x: i32, y: i32, segment: u16) -> (u8, Rotoscope) {
        self.translator
            .pixel_index(segment, x, y)
            .and_then(|idx| planes.get(idx))
            .map(|(color, roto)| (self.palette.color_to_index(color), roto))
            .unwrap_or_default()
    }

    // 鎖內寫入：顏色與紀錄一起覆蓋
    fn plot(&self, planes: &mut Planes, x: i32, y: i32, color: u8, segment: u16, roto: Rotoscope) {
        if let Some(idx) = self.translator.pixel_index(segment, x, y) {
            planes.set(idx, self.palette.index_to_color(color), roto);
        }
    }

    pub fn set_pixel(&self, x: i32, y: i32, color: u8, segment: u16, roto: Rotoscope) {
        self.store
            .with_lock(|planes| self.plot(planes, x, y, color, segment, roto));
    }

    pub fn get_pixel(&self, x: i32, y: i32, segment: u16) -> (u8, Rotoscope) {
        self.store
            .with_lock(|planes| self.peek(planes, x, y, segment))
    }

    /// 清除固定 0x2000 位元組的視窗。`_byte_count` 與舊版一樣不採用。
    pub fn clear(&self, color: u8, segment: u16, _byte_count: usize) {
        let Some(range) = self
            .translator
            .span(segment, 0, CLEAR_WINDOW_BYTES, SLOTS_PER_BYTE)
        else {
            tracing::trace!("[Graphics] clear skipped, segment={:#06X}", segment);
            return;
        };
        let fill = self.palette.index_to_color(color);
        self.store
            .with_lock(|planes| planes.fill(range, fill, Rotoscope::default()));
    }

    /// 以浮點增量走 max(|dx|,|dy|)+1 步 (非 Bresenham)。
    /// 線段一律以 `color` 覆寫，`_xor` 不採用；原本的顏色只記進 rotoscope 的 bg。
    /// 超長線段只走與可見視窗相交的那幾步。
    #[allow(clippy::too_many_arguments)]
    pub fn line(&self, x0: i32, y0: i32, x1: i32, y1: i32, color: u8, _xor: bool, segment: u16) {
        let dx = x1 as i64 - x0 as i64;
        let dy = y1 as i64 - y0 as i64;
        // |dx|、|dy| 最多 2^32 - 1，放得進 u32
        let n = dx.unsigned_abs().max(dy.unsigned_abs()) as u32;

        let mut roto = Rotoscope::new(Content::Line(LineSegment {
            x0,
            y0,
            x1,
            y1,
            step: 0,
            total: n,
        }));
        roto.fg = color;

        let mut step = |planes: &mut Planes, i: u32, px: i32, py: i32| {
            let (existing, _) = self.peek(planes, px, py, segment);
            if let Content::Line(ref mut seg) = roto.content {
                seg.step = i;
            }
            roto.bg = existing;
            self.plot(planes, px, py, color, segment, roto);
        };

        if n <= LINE_WALK_LIMIT {
            let (step_x, step_y) = if n == 0 {
                (0.0, 0.0)
            } else {
                (dx as f32 / n as f32, dy as f32 / n as f32)
            };
            self.store.with_lock(|planes| {
                let mut x = x0 as f32;
                let mut y = y0 as f32;
                for i in 0..=n {
                    step(planes, i, x as i32, y as i32);
                    x += step_x;
                    y += step_y;
                }
            });
            return;
        }

        let step_x = dx as f64 / n as f64;
        let step_y = dy as f64 / n as f64;
        let Some((lo, hi)) = visible_steps(x0, step_x, SCREEN_WIDTH)
            .zip(visible_steps(y0, step_y, SCREEN_HEIGHT))
            .map(|((ax, bx), (ay, by))| (ax.max(ay).max(0.0), bx.min(by).min(n as f64)))
            .filter(|(lo, hi)| lo <= hi)
        else {
            tracing::trace!("[Graphics] line ({},{})-({},{}) misses window", x0, y0, x1, y1);
            return;
        };
        self.store.with_lock(|planes| {
            for i in lo.floor() as u32..=hi.ceil() as u32 {
                let x = x0 as f64 + i as f64 * step_x;
                let y = y0 as f64 + i as f64 * step_y;
                step(planes, i, x as i32, y as i32);
            }
        });
    }

    /// 單色點陣圖：每列 (w+7)/8 位元組、最高位元在左，第 r 列落在 y0 + r。
    /// XOR 且目標原本是文字時，保留原紀錄只對其前景/背景做 XOR。
    #[allow(clippy::too_many_arguments)]
    pub fn blit(
        &self,
        x0: i32,
        y0: i32,
        w: i16,
        h: i16,
        bitmap: &[u8],
        color: u8,
        xor: bool,
        segment: u16,
        template: Rotoscope,
    ) {
        if w <= 0 || h <= 0 {
            return;
        }
        let row_bytes = (w as usize).div_ceil(8);
        if bitmap.len() < row_bytes * h as usize {
            tracing::trace!(
                "[Graphics] blit bitmap too short: {} < {}",
                bitmap.len(),
                row_bytes * h as usize
            );
            return;
        }
        let color = color & 0x0F;

        self.store.with_lock(|planes| {
            for r in 0..h {
                for c in 0..w {
                    let byte = bitmap[r as usize * row_bytes + c as usize / 8];
                    if byte & (0x80 >> (c % 8)) == 0 {
                        continue;
                    }
                    let (Some(x), Some(y)) = (x0.checked_add(c as i32), y0.checked_add(r as i32))
                    else {
                        continue;
                    };
                    if self.translator.pixel_index(segment, x, y).is_none() {
                        continue;
                    }
                    let (existing, existing_roto) = self.peek(planes, x, y, segment);
                    if xor && existing_roto.is_text() {
                        let mut roto = existing_roto;
                        roto.fg ^= color;
                        roto.bg ^= color;
                        self.plot(planes, x, y, existing ^ color, segment, roto);
                        continue;
                    }
                    let mut roto = template;
                    roto.fg = color;
                    roto.bg = existing;
                    roto.blt.x = c;
                    // 文字的字形列由上往下數 (最上列為 0)
                    roto.blt.y = if roto.is_text() { h - 1 - r } else { r };
                    roto.blt.w = w;
                    roto.blt.h = h;
                    let value = if xor { existing ^ color } else { color };
                    self.plot(planes, x, y, value, segment, roto);
                }
            }
        });
    }

    /// 以內建字型畫一個字元，(x, y) 為字形左上角；回傳前進寬度。
    /// 未知字型編號代表模擬器資料損毀，直接 panic。
    #[allow(clippy::too_many_arguments)]
    pub fn draw_glyph(
        &self,
        font: u16,
        character: u32,
        x: i32,
        y: i32,
        color: u8,
        xor: bool,
        segment: u16,
    ) -> i16 {
        let Some(table) = Font::lookup(font) else {
            panic!("unknown font number {}", font);
        };
        let Some(glyph) = table.glyph(character) else {
            return table.advance;
        };

        // blit 由 y0 往上逐列繪製，所以字形列倒序交給它，字形才會正立
        let h = glyph.height as usize;
        let Some(y0) = y.checked_sub(h as i32 - 1) else {
            return table.advance;
        };
        let mut bitmap = [0u8; 16];
        for (r, dst) in bitmap.iter_mut().take(h).enumerate() {
            *dst = glyph.rows[h - 1 - r];
        }
        let template = Rotoscope::text(
            font,
            character,
            xor,
            glyph.width as i16,
            glyph.height as i16,
            color,
        );
        self.blit(
            x,
            y0,
            glyph.width as i16,
            glyph.height as i16,
            &bitmap[..h],
            color,
            xor,
            segment,
            template,
        );
        table.advance
    }

    /// 區塊複製顏色與紀錄 (count 以舊版位元組計)，用於換頁雙緩衝
    pub fn copy_region(
        &self,
        src_segment: u16,
        dest_segment: u16,
        src_offset: u16,
        dest_offset: u16,
        count: u16,
    ) {
        let src = self.translator.span(
            src_segment,
            src_offset as usize,
            count as usize,
            SLOTS_PER_BYTE,
        );
        let dest = self.translator.span(
            dest_segment,
            dest_offset as usize,
            count as usize,
            SLOTS_PER_BYTE,
        );
        let (Some(src), Some(dest)) = (src, dest) else {
            tracing::trace!(
                "[Graphics] copy skipped: {:#06X}:{:#06X} -> {:#06X}:{:#06X} x{}",
                src_segment,
                src_offset,
                dest_segment,
                dest_offset,
                count
            );
            return;
        };
        self.store
            .with_lock(|planes| planes.copy_within(src, dest.start));
    }

    pub fn set_mode(&self, mode: DisplayMode) {
        tracing::debug!("[Graphics] mode -> {:?}", mode);
        self.mode.set_mode(mode);
    }

    pub fn put_char(&self, ch: u8) {
        self.mode.put_char(ch);
    }

    pub fn text(&self, s: &[u8]) {
        self.mode.text(s);
    }

    pub fn carriage_return(&self) {
        self.mode.carriage_return();
    }

    pub fn set_cursor(&self, x: usize, y: usize) {
        self.mode.set_cursor(x, y);
    }
}
