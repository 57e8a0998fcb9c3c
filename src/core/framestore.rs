//! 共享的顏色 + rotoscope 雙緩衝區
//!
//! 兩個陣列放在同一把鎖之後，對外只提供鎖定範圍內的操作，
//! 同一槽位的顏色與來源紀錄不會被觀察到只更新了一半。

use std::ops::Range;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::palette::PixelColor;
use crate::core::rotoscope::Rotoscope;

/// 鎖內的兩個平面。只能經由 `FrameStore::with_lock` 取得。
#[derive(Debug)]
pub struct Planes {
    pixels: Vec<PixelColor>,
    roto: Vec<Rotoscope>,
}

impl Planes {
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(PixelColor, Rotoscope)> {
        Some((*self.pixels.get(index)?, *self.roto.get(index)?))
    }

    pub fn set(&mut self, index: usize, color: PixelColor, roto: Rotoscope) -> bool {
        if index >= self.pixels.len() {
            return false;
        }
        self.pixels[index] = color;
        self.roto[index] = roto;
        true
    }

    pub fn fill(&mut self, range: Range<usize>, color: PixelColor, roto: Rotoscope) -> bool {
        if range.end > self.pixels.len() || range.start > range.end {
            return false;
        }
        self.pixels[range.clone()].fill(color);
        self.roto[range].fill(roto);
        true
    }

    /// 以 memmove 語意複製兩個平面
    pub fn copy_within(&mut self, src: Range<usize>, dest: usize) -> bool {
        let len = src.end.saturating_sub(src.start);
        if src.end > self.pixels.len() || src.start > src.end || dest + len > self.pixels.len() {
            return false;
        }
        self.pixels.copy_within(src.clone(), dest);
        self.roto.copy_within(src, dest);
        true
    }
}

#[derive(Debug)]
pub struct FrameStore {
    planes: Mutex<Planes>,
}

impl FrameStore {
    /// 一次配置全部容量，填入索引 0 顏色與 Clear 紀錄
    pub fn new(capacity: usize) -> Self {
        FrameStore {
            planes: Mutex::new(Planes {
                pixels: vec![0; capacity],
                roto: vec![Rotoscope::default(); capacity],
            }),
        }
    }

    // 槽位都是純值，任一操作中途 panic 也不會留下不一致的單一槽位
    fn lock(&self) -> MutexGuard<'_, Planes> {
        self.planes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.lock().len()
    }

    pub fn read_slot(&self, index: usize) -> Option<(PixelColor, Rotoscope)> {
        self.lock().get(index)
    }

    pub fn write_slot(&self, index: usize, color: PixelColor, roto: Rotoscope) -> bool {
        self.lock().set(index, color, roto)
    }

    /// 多槽位操作 (清除、區塊複製、blit) 在單一鎖定區間內完成
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut Planes) -> R) -> R {
        let mut planes = self.lock();
        f(&mut planes)
    }

    /// 在鎖內複製出指定範圍，鎖外再處理
    pub fn snapshot(&self, range: Range<usize>) -> Option<(Vec<PixelColor>, Vec<Rotoscope>)> {
        let planes = self.lock();
        if range.end > planes.len() || range.start > range.end {
            return None;
        }
        Some((
            planes.pixels[range.clone()].to_vec(),
            planes.roto[range].to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rotoscope::Content;

    #[test]
    fn test_new_store_is_zero_filled() {
        let store = FrameStore::new(64);
        assert_eq!(store.capacity(), 64);
        for i in 0..64 {
            assert_eq!(store.read_slot(i), Some((0, Rotoscope::default())));
        }
    }

    #[test]
    fn test_write_then_read() {
        let store = FrameStore::new(16);
        let rs = Rotoscope::new(Content::Plot);
        assert!(store.write_slot(3, 0x00AA_0000, rs));
        assert_eq!(store.read_slot(3), Some((0x00AA_0000, rs)));
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let store = FrameStore::new(16);
        assert!(!store.write_slot(16, 0x00FF_FFFF, Rotoscope::new(Content::Tile)));
        assert_eq!(store.read_slot(16), None);
        assert_eq!(store.snapshot(0..17), None);
    }

    #[test]
    fn test_fill_rejects_partial_range() {
        let store = FrameStore::new(16);
        let applied = store.with_lock(|p| p.fill(8..20, 0x0000_00AA, Rotoscope::default()));
        assert!(!applied);
        assert_eq!(store.read_slot(8).map(|s| s.0), Some(0));
    }

    #[test]
    fn test_copy_within_overlapping_is_memmove() {
        let store = FrameStore::new(8);
        store.with_lock(|p| {
            for i in 0..4 {
                p.set(i, i as u32 + 1, Rotoscope::default());
            }
            assert!(p.copy_within(0..4, 2));
        });
        let (pixels, _) = store.snapshot(0..8).unwrap();
        assert_eq!(pixels, vec![1, 2, 1, 2, 3, 4, 0, 0]);
    }
}
