//! Color Graphics Adapter: a CRTC instance plus mode/color/status
//! registers and IO window. Ported from `cga.c`/`cga.h` (SPEC_FULL.md
//! §4.9).

use crate::video::crtc::Crtc6845;

const STATUS_HRETRACE: u8 = 0x01;
const STATUS_VRETRACE: u8 = 0x08;

const MODE_TEXT_RES_HI: u8 = 0x01;
const MODE_GRAPHICS: u8 = 0x02;
const MODE_GRAPHICS_RES_HI: u8 = 0x10;

const HI_RES_TEXT_WIDTH: u16 = 640;
const HI_RES_TEXT_HEIGHT: u16 = 200;
const HI_RES_TEXT_COLUMNS: u16 = 80;
const HI_RES_TEXT_ROWS: u16 = 25;

const LO_RES_TEXT_WIDTH: u16 = 320;
const LO_RES_TEXT_HEIGHT: u16 = 200;
const LO_RES_TEXT_COLUMNS: u16 = 40;
const LO_RES_TEXT_ROWS: u16 = 25;

const HI_RES_GRAPHICS_WIDTH: u16 = 640;
const HI_RES_GRAPHICS_HEIGHT: u16 = 200;

const LO_RES_GRAPHICS_WIDTH: u16 = 320;
const LO_RES_GRAPHICS_HEIGHT: u16 = 200;

pub struct Cga {
    pub crtc: Crtc6845,
    status: u8,
    mode: u8,
    pub color: u8,
    pub columns: u16,
    pub rows: u16,
    pub width: u16,
    pub height: u16,
}

impl Default for Cga {
    fn default() -> Self {
        let mut cga = Cga {
            crtc: Crtc6845::new(),
            status: 0,
            mode: 0,
            color: 0,
            columns: 0,
            rows: 0,
            width: 0,
            height: 0,
        };
        cga.mode(0);
        cga
    }
}

impl Cga {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.crtc.reset();
        self.mode(0);
    }

    fn status(&mut self) -> u8 {
        self.status ^= STATUS_HRETRACE;
        self.status ^= STATUS_VRETRACE;
        self.status
    }

    fn color(&mut self, value: u8) {
        self.color = value;
    }

    fn mode(&mut self, value: u8) {
        if value & MODE_GRAPHICS != 0 {
            self.columns = 0;
            self.rows = 0;
            if value & MODE_GRAPHICS_RES_HI != 0 {
                self.width = HI_RES_GRAPHICS_WIDTH;
                self.height = HI_RES_GRAPHICS_HEIGHT;
            } else {
                self.width = LO_RES_GRAPHICS_WIDTH;
                self.height = LO_RES_GRAPHICS_HEIGHT;
            }
        } else if value & MODE_TEXT_RES_HI != 0 {
            self.columns = HI_RES_TEXT_COLUMNS;
            self.rows = HI_RES_TEXT_ROWS;
            self.width = HI_RES_TEXT_WIDTH;
            self.height = HI_RES_TEXT_HEIGHT;
        } else {
            self.columns = LO_RES_TEXT_COLUMNS;
            self.rows = LO_RES_TEXT_ROWS;
            self.width = LO_RES_TEXT_WIDTH;
            self.height = LO_RES_TEXT_HEIGHT;
        }
        self.mode = value;
    }

    pub fn read_io(&mut self, offset: u8) -> u8 {
        match offset {
            0x1 | 0x3 | 0x5 | 0x7 => self.crtc.read_data(),
            0xA => self.status(),
            _ => 0,
        }
    }

    pub fn write_io(&mut self, offset: u8, value: u8) {
        match offset {
            0x0 | 0x2 | 0x4 | 0x6 => self.crtc.write_index(value),
            0x1 | 0x3 | 0x5 | 0x7 => self.crtc.write_data(value),
            0x8 => self.mode(value),
            0x9 => self.color(value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resets_into_low_res_text_mode() {
        let cga = Cga::new();
        assert_eq!(cga.columns, LO_RES_TEXT_COLUMNS);
        assert_eq!(cga.width, LO_RES_TEXT_WIDTH);
    }

    #[test]
    fn hi_res_text_mode_sets_80_column_dimensions() {
        let mut cga = Cga::new();
        cga.write_io(0x8, MODE_TEXT_RES_HI);
        assert_eq!(cga.columns, HI_RES_TEXT_COLUMNS);
        assert_eq!(cga.width, HI_RES_TEXT_WIDTH);
    }

    #[test]
    fn graphics_mode_zeroes_text_dimensions() {
        let mut cga = Cga::new();
        cga.write_io(0x8, MODE_GRAPHICS | MODE_GRAPHICS_RES_HI);
        assert_eq!(cga.columns, 0);
        assert_eq!(cga.rows, 0);
        assert_eq!(cga.width, HI_RES_GRAPHICS_WIDTH);
        assert_eq!(cga.height, HI_RES_GRAPHICS_HEIGHT);
    }

    #[test]
    fn low_res_graphics_mode_uses_320_width() {
        let mut cga = Cga::new();
        cga.write_io(0x8, MODE_GRAPHICS);
        assert_eq!(cga.width, LO_RES_GRAPHICS_WIDTH);
        assert_eq!(cga.height, LO_RES_GRAPHICS_HEIGHT);
    }

    #[test]
    fn color_register_is_write_only_latched() {
        let mut cga = Cga::new();
        cga.write_io(0x9, 0x2C);
        assert_eq!(cga.color, 0x2C);
    }

    #[test]
    fn status_read_toggles_retrace_bits_every_call() {
        let mut cga = Cga::new();
        let first = cga.read_io(0xA);
        let second = cga.read_io(0xA);
        assert_ne!(first & STATUS_HRETRACE, second & STATUS_HRETRACE);
        assert_ne!(first & STATUS_VRETRACE, second & STATUS_VRETRACE);
    }
}
