//! Rotoscope：每個像素的來源紀錄

/// 產生像素的繪圖操作種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Content {
    #[default]
    Clear,
    Navigational,
    Text(TextGlyph),
    Line(LineSegment),
    Ellipse,
    BoxFill,
    PolyFill,
    Picture,
    Plot,
    Tile,
    RunBit,
    AuxSystem,
    StarMap,
    SpaceMan,
}

impl Content {
    /// 緊湊的數值標籤 (依舊版順序)，用於除錯中繼資料
    pub fn tag(&self) -> u8 {
        match self {
            Content::Clear => 0,
            Content::Navigational => 1,
            Content::Text(_) => 2,
            Content::Line(_) => 3,
            Content::Ellipse => 4,
            Content::BoxFill => 5,
            Content::PolyFill => 6,
            Content::Picture => 7,
            Content::Plot => 8,
            Content::Tile => 9,
            Content::RunBit => 10,
            Content::AuxSystem => 11,
            Content::StarMap => 12,
            Content::SpaceMan => 13,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextGlyph {
    pub font: u16,
    pub character: u32,
    pub xor: bool,
}

/// 線段端點以呈現座標 (由下往上) 保存
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineSegment {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    pub step: u32,
    pub total: u32,
}

/// blit 內的區域座標與大小 (文字時即字形座標)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BltRect {
    pub x: i16,
    pub y: i16,
    pub w: i16,
    pub h: i16,
}

/// 單一像素的完整來源紀錄；每次寫入整筆覆蓋
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rotoscope {
    pub content: Content,
    pub fg: u8,
    pub bg: u8,
    pub blt: BltRect,
}

impl Rotoscope {
    pub fn new(content: Content) -> Self {
        Rotoscope {
            content,
            ..Default::default()
        }
    }

    pub fn text(font: u16, character: u32, xor: bool, w: i16, h: i16, fg: u8) -> Self {
        Rotoscope {
            content: Content::Text(TextGlyph {
                font,
                character,
                xor,
            }),
            fg,
            bg: 0,
            blt: BltRect { x: 0, y: 0, w, h },
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.content, Content::Text(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_clear() {
        let rs = Rotoscope::default();
        assert_eq!(rs.content, Content::Clear);
        assert_eq!(rs.content.tag(), 0);
        assert_eq!((rs.fg, rs.bg), (0, 0));
    }

    #[test]
    fn test_text_constructor_fills_glyph_fields() {
        let rs = Rotoscope::text(2, b'A' as u32, true, 8, 8, 14);
        assert!(rs.is_text());
        assert_eq!(rs.content.tag(), 2);
        assert_eq!(rs.blt.w, 8);
        assert_eq!(rs.fg, 14);
        match rs.content {
            Content::Text(g) => {
                assert_eq!(g.font, 2);
                assert_eq!(g.character, 65);
                assert!(g.xor);
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_tags_are_distinct() {
        let all = [
            Content::Clear,
            Content::Navigational,
            Content::Text(TextGlyph::default()),
            Content::Line(LineSegment::default()),
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
        let mut tags: Vec<u8> = all.iter().map(|c| c.tag()).collect();
        tags.dedup();
        assert_eq!(tags, (0..14).collect::<Vec<u8>>());
    }
}
