//! 區段:位移 -> 線性槽位索引
//!
//! 舊版 EGA 記憶體以 segment << 4 取得 20 位元實體位址，減去 0xA0000 後
//! 每個位元組對應後備儲存的 4 個像素槽。所有結果都在這裡驗證範圍，
//! 超出範圍回傳 None，呼叫端一律略過該操作。

use std::ops::Range;

/// 可見圖形視窗
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 200;

/// 後備儲存容量 (兩個 32768 槽的頁面)
pub const STORE_CAPACITY: usize = 0x1_0000;

/// 預設圖形頁區段
pub const GRAPHICS_SEGMENT: u16 = 0xA000;

/// 視訊記憶體實體基址
pub const VIDEO_BASE: u32 = 0xA_0000;

/// 每個舊版位元組對應的槽數
pub const SLOTS_PER_BYTE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressTranslator {
    capacity: usize,
}

impl Default for AddressTranslator {
    fn default() -> Self {
        Self::new(STORE_CAPACITY)
    }
}

impl AddressTranslator {
    pub fn new(capacity: usize) -> Self {
        AddressTranslator { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 區段起點的槽位索引；0 代表預設圖形頁
    pub fn page_base(&self, segment: u16) -> Option<usize> {
        let segment = if segment == 0 {
            GRAPHICS_SEGMENT
        } else {
            segment
        };
        let physical = (segment as u32) << 4;
        // 低於視訊基址在舊版會繞回成巨大的無號數，這裡直接拒絕
        let linear = physical.checked_sub(VIDEO_BASE)? as usize;
        let base = linear * SLOTS_PER_BYTE;
        (base < self.capacity).then_some(base)
    }

    /// 區段 + 位移 (以 bytes_per_pixel 縮放) -> 單一槽位
    pub fn translate(&self, segment: u16, offset: usize, bytes_per_pixel: usize) -> Option<usize> {
        let index = self
            .page_base(segment)?
            .checked_add(offset.checked_mul(bytes_per_pixel)?)?;
        (index < self.capacity).then_some(index)
    }

    /// 整段範圍都必須落在容量內，否則整段拒絕
    pub fn span(
        &self,
        segment: u16,
        offset: usize,
        count: usize,
        bytes_per_pixel: usize,
    ) -> Option<Range<usize>> {
        let start = self
            .page_base(segment)?
            .checked_add(offset.checked_mul(bytes_per_pixel)?)?;
        let end = start.checked_add(count.checked_mul(bytes_per_pixel)?)?;
        (end <= self.capacity).then_some(start..end)
    }

    /// 由下往上的 y 轉成由上往下的儲存列
    pub fn flip_y(y: usize) -> usize {
        SCREEN_HEIGHT - 1 - y
    }

    /// 繪圖原語的唯一入口：邊界檢查、翻轉 y、加上頁面基址
    pub fn pixel_index(&self, segment: u16, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= SCREEN_WIDTH || y as usize >= SCREEN_HEIGHT {
            return None;
        }
        let row = Self::flip_y(y as usize);
        self.translate(segment, row * SCREEN_WIDTH + x as usize, 1)
    }
}
