//! 文字/圖形模式旗標、80x25 字元屬性格與游標

use std::sync::{Mutex, MutexGuard, PoisonError};

pub const TEXT_COLUMNS: usize = 80;
pub const TEXT_ROWS: usize = 25;

/// 重置後的格子：空白字元、黑底淺灰字
pub const BLANK_CELL: TextCell = TextCell {
    character: 0x20,
    attribute: 0x07,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Text,
    Graphics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextCell {
    pub character: u8,
    pub attribute: u8,
}

impl TextCell {
    pub fn foreground(&self) -> u8 {
        self.attribute & 0x0F
    }

    pub fn background(&self) -> u8 {
        (self.attribute >> 4) & 0x0F
    }
}

/// 顯示執行緒取用的一致快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSnapshot {
    pub mode: DisplayMode,
    pub cursor: (usize, usize),
    pub cells: Vec<TextCell>,
}

#[derive(Debug)]
struct Console {
    mode: DisplayMode,
    cursor_x: usize,
    cursor_y: usize,
    cells: Vec<TextCell>,
}

impl Console {
    fn carriage_return(&mut self) {
        self.cursor_x = 0;
        self.cursor_y += 1;
        if self.cursor_y >= TEXT_ROWS {
            self.cursor_y = TEXT_ROWS - 1;
            // 整個畫面上捲一行，最後一行清空
            self.cells.copy_within(TEXT_COLUMNS.., 0);
            self.cells[(TEXT_ROWS - 1) * TEXT_COLUMNS..].fill(BLANK_CELL);
        }
    }

    fn put_char(&mut self, ch: u8) {
        if self.mode != DisplayMode::Text {
            return;
        }
        self.cells[self.cursor_y * TEXT_COLUMNS + self.cursor_x] = TextCell {
            character: ch,
            attribute: BLANK_CELL.attribute,
        };
        self.cursor_x += 1;
        if self.cursor_x >= TEXT_COLUMNS {
            self.carriage_return();
        }
    }
}

#[derive(Debug)]
pub struct ModeState {
    console: Mutex<Console>,
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeState {
    pub fn new() -> Self {
        ModeState {
            console: Mutex::new(Console {
                mode: DisplayMode::Text,
                cursor_x: 0,
                cursor_y: 0,
                cells: vec![BLANK_CELL; TEXT_COLUMNS * TEXT_ROWS],
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Console> {
        self.console.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_mode(&self, mode: DisplayMode) {
        self.lock().mode = mode;
    }

    pub fn mode(&self) -> DisplayMode {
        self.lock().mode
    }

    /// 只在文字模式寫入；圖形模式下忽略
    pub fn put_char(&self, ch: u8) {
        self.lock().put_char(ch);
    }

    pub fn text(&self, s: &[u8]) {
        let mut console = self.lock();
        for &ch in s {
            console.put_char(ch);
        }
    }

    pub fn carriage_return(&self) {
        self.lock().carriage_return();
    }

    pub fn set_cursor(&self, x: usize, y: usize) {
        let mut console = self.lock();
        console.cursor_x = x.min(TEXT_COLUMNS - 1);
        console.cursor_y = y.min(TEXT_ROWS - 1);
    }

    pub fn cursor(&self) -> (usize, usize) {
        let console = self.lock();
        (console.cursor_x, console.cursor_y)
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<TextCell> {
        if x >= TEXT_COLUMNS || y >= TEXT_ROWS {
            return None;
        }
        Some(self.lock().cells[y * TEXT_COLUMNS + x])
    }

    pub fn snapshot(&self) -> ModeSnapshot {
        let console = self.lock();
        ModeSnapshot {
            mode: console.mode,
            cursor: (console.cursor_x, console.cursor_y),
            cells: console.cells.clone(),
        }
    }
}
