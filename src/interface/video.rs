//! 下游觀察者介面：顯示畫面與 rotoscope 除錯畫面

use std::fmt;

use crossbeam::channel::{Receiver, Sender, TrySendError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
}

/// 觀察者期望的固定畫面格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    pub width: usize,
    pub height: usize,
    pub pixel_format: PixelFormat,
}

impl FrameFormat {
    pub const fn rgba8(width: usize, height: usize) -> Self {
        FrameFormat {
            width,
            height,
            pixel_format: PixelFormat::Rgba8,
        }
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {:?}", self.width, self.height, self.pixel_format)
    }
}

/// 每個 tick 的顯示畫面 (RGBA8，列優先)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub stride: usize,
}

impl DisplayFrame {
    pub fn format(&self) -> FrameFormat {
        FrameFormat::rgba8(self.width, self.height)
    }

    /// 取得 (x, y) 的 RGBA，y 由上往下
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let o = y * self.stride + x * 4;
        let px = self.pixels.get(o..o + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// 除錯中繼資料，每像素一筆，與除錯畫面同解析度。
///
/// `glyph_x` / `glyph_y` 是像素在字形 (或 blit 區塊) 內的座標。文字的
/// `glyph_y` 由字形最上列往下數 (0 = 最上列)，與畫面方向相同。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DebugTexel {
    pub content: u8,
    pub font: u8,
    pub character: u8,
    pub flags: u8,
    pub glyph_x: i16,
    pub glyph_y: i16,
    pub glyph_w: i16,
    pub glyph_h: i16,
    pub fg: u8,
    pub bg: u8,
}

impl DebugTexel {
    pub const FLAG_XOR: u8 = 0x01;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugFrame {
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub texels: Vec<DebugTexel>,
}

impl DebugFrame {
    pub fn format(&self) -> FrameFormat {
        FrameFormat::rgba8(self.width, self.height)
    }

    pub fn texel(&self, x: usize, y: usize) -> Option<&DebugTexel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.texels.get(y * self.width + x)
    }
}

/// 顯示畫面觀察者。回呼在顯示執行緒上執行，不持有任何鎖。
pub trait FrameObserver: Send + Sync {
    fn on_frame(&self, frame: &DisplayFrame);

    /// 固定格式的觀察者在註冊時驗證一次 (必須是 160x200 或 640x200)。
    /// 之後每個 tick 只送出與此格式相同的畫面：例如固定 160x200 的觀察者
    /// 在文字模式 (640x200) 期間收不到任何畫面。回傳 None 表示接受所有格式。
    fn format(&self) -> Option<FrameFormat> {
        None
    }
}

pub trait DebugObserver: Send + Sync {
    fn on_debug(&self, frame: &DebugFrame);

    fn format(&self) -> Option<FrameFormat> {
        None
    }
}

/// 把畫面轉送到有界 channel 的觀察者；channel 滿時丟棄，不阻塞顯示執行緒
#[derive(Debug)]
pub struct ChannelSink<T> {
    tx: Sender<T>,
    format: Option<FrameFormat>,
}

impl<T> ChannelSink<T> {
    pub fn new(depth: usize) -> (Self, Receiver<T>) {
        let (tx, rx) = crossbeam::channel::bounded(depth.max(1));
        (ChannelSink { tx, format: None }, rx)
    }

    pub fn with_format(mut self, format: FrameFormat) -> Self {
        self.format = Some(format);
        self
    }

    fn forward(&self, value: T) {
        match self.tx.try_send(value) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::trace!("[ChannelSink] receiver behind, frame dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::trace!("[ChannelSink] receiver gone");
            }
        }
    }
}

impl FrameObserver for ChannelSink<DisplayFrame> {
    fn on_frame(&self, frame: &DisplayFrame) {
        self.forward(frame.clone());
    }

    fn format(&self) -> Option<FrameFormat> {
        self.format
    }
}

impl DebugObserver for ChannelSink<DebugFrame> {
    fn on_debug(&self, frame: &DebugFrame) {
        self.forward(frame.clone());
    }

    fn format(&self) -> Option<FrameFormat> {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: usize, height: usize) -> DisplayFrame {
        DisplayFrame {
            pixels: vec![0; width * height * 4],
            width,
            height,
            stride: width * 4,
        }
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (sink, rx) = ChannelSink::<DisplayFrame>::new(1);
        sink.on_frame(&frame(2, 2));
        sink.on_frame(&frame(3, 3));
        assert_eq!(rx.len(), 1);
        assert_eq!(rx.try_recv().unwrap().width, 2);
    }

    #[test]
    fn test_channel_sink_survives_disconnected_receiver() {
        let (sink, rx) = ChannelSink::<DisplayFrame>::new(2);
        drop(rx);
        sink.on_frame(&frame(1, 1));
    }

    #[test]
    fn test_display_frame_pixel_lookup() {
        let mut f = frame(2, 2);
        // (1, 1) -> 第 3 個像素
        f.pixels[12..16].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(f.pixel(1, 1), Some([1, 2, 3, 4]));
        assert_eq!(f.pixel(2, 0), None);
    }

    #[test]
    fn test_texel_serializes() {
        let texel = DebugTexel {
            content: 2,
            font: 1,
            character: b'A',
            flags: DebugTexel::FLAG_XOR,
            ..Default::default()
        };
        let json = serde_json::to_string(&texel).unwrap();
        assert!(json.contains("\"character\":65"));
        assert!(json.contains("\"flags\":1"));
    }

    #[test]
    fn test_format_display() {
        assert_eq!(FrameFormat::rgba8(160, 200).to_string(), "160x200 Rgba8");
    }
}
