//! EGA 16 色調色盤：顏色索引 <-> 0x00RRGGBB

/// 打包後的像素顏色 (0x00RRGGBB)
pub type PixelColor = u32;

/// 標準 EGA 色表
pub const EGA_COLORS: [PixelColor; 16] = [
    0x0000_0000, // 0: 黑
    0x0000_00AA, // 1: 藍
    0x0000_AA00, // 2: 綠
    0x0000_AAAA, // 3: 青
    0x00AA_0000, // 4: 紅
    0x00AA_00AA, // 5: 洋紅
    0x00AA_5500, // 6: 棕
    0x00AA_AAAA, // 7: 淺灰
    0x0055_5555, // 8: 深灰
    0x0055_55FF, // 9: 淺藍
    0x0055_FF55, // 10: 淺綠
    0x0055_FFFF, // 11: 淺青
    0x00FF_5555, // 12: 淺紅
    0x00FF_55FF, // 13: 淺洋紅
    0x00FF_FF55, // 14: 黃
    0x00FF_FFFF, // 15: 白
];

#[derive(Debug, Clone, Copy, Default)]
pub struct PaletteMapper;

impl PaletteMapper {
    pub fn new() -> Self {
        PaletteMapper
    }

    /// 索引只取低 4 位元，永遠有對應顏色
    pub fn index_to_color(&self, index: u8) -> PixelColor {
        EGA_COLORS[(index & 0x0F) as usize]
    }

    /// 反查索引；找不到完全相符的顏色時回傳 0 (與舊版行為一致)
    pub fn color_to_index(&self, color: PixelColor) -> u8 {
        match EGA_COLORS.iter().position(|&c| c == color) {
            Some(i) => i as u8,
            None => {
                #[cfg(debug_assertions)]
                tracing::debug!("[Palette] foreign pixel value {:#08X} mapped to index 0", color);
                0
            }
        }
    }

    /// 轉成 RGBA8 位元組 (alpha 固定 0xFF)
    pub fn rgba(&self, color: PixelColor) -> [u8; 4] {
        [
            ((color >> 16) & 0xFF) as u8,
            ((color >> 8) & 0xFF) as u8,
            (color & 0xFF) as u8,
            0xFF,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_index_round_trips() {
        let palette = PaletteMapper::new();
        for i in 0..16u8 {
            assert_eq!(palette.color_to_index(palette.index_to_color(i)), i);
        }
    }

    #[test]
    fn test_index_masked_to_low_nibble() {
        let palette = PaletteMapper::new();
        assert_eq!(palette.index_to_color(0x1F), EGA_COLORS[15]);
        assert_eq!(palette.index_to_color(0x24), EGA_COLORS[4]);
    }

    #[test]
    fn test_foreign_color_falls_back_to_zero() {
        let palette = PaletteMapper::new();
        assert_eq!(palette.color_to_index(0x0012_3456), 0);
    }

    #[test]
    fn test_rgba_byte_order() {
        let palette = PaletteMapper::new();
        assert_eq!(palette.rgba(0x00AA_5500), [0xAA, 0x55, 0x00, 0xFF]);
    }
}
