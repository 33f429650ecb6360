//! Motorola 6845 cathode ray tube controller: index register plus the 18
//! indexable registers, each filtered to its real bit width on write.
//! Ported from `crtc_6845.c`/`crtc_6845.h` (SPEC_FULL.md §4.9).
//!
//! The reference header declares a flat `registers[18]` array but the
//! reference source never actually indexes through it — every access goes
//! through named fields the header doesn't declare. This port follows the
//! source's actual usage and stores the registers as named fields rather
//! than resurrecting the unused flat array.

const REG_HORIZONTAL_TOTAL: u8 = 0x00;
const REG_HORIZONTAL_DISPLAYED: u8 = 0x01;
const REG_H_SYNC_POSITION: u8 = 0x02;
const REG_SYNC_WIDTH: u8 = 0x03;
const REG_VERTICAL_TOTAL: u8 = 0x04;
const REG_V_TOTAL_ADJUST: u8 = 0x05;
const REG_VERTICAL_DISPLAYED: u8 = 0x06;
const REG_V_SYNC_POSITION: u8 = 0x07;
const REG_INTERLACE_MODE_AND_SKEW: u8 = 0x08;
const REG_MAX_SCAN_LINE_ADDRESS: u8 = 0x09;
const REG_CURSOR_START: u8 = 0x0A;
const REG_CURSOR_END: u8 = 0x0B;
const REG_ADDRESS_HI: u8 = 0x0C;
const REG_ADDRESS_LO: u8 = 0x0D;
const REG_CURSOR_HI: u8 = 0x0E;
const REG_CURSOR_LO: u8 = 0x0F;
const REG_LIGHT_PEN_HI: u8 = 0x10;
const REG_LIGHT_PEN_LO: u8 = 0x11;

/// Cursor attribute, decoded from register 10 bits 5-6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAttribute {
    Solid,
    Disabled,
    BlinkFast,
    BlinkSlow,
}

impl CursorAttribute {
    fn from_cursor_start(cursor_start: u8) -> Self {
        match cursor_start & 0x60 {
            0x00 => CursorAttribute::Solid,
            0x20 => CursorAttribute::Disabled,
            0x40 => CursorAttribute::BlinkFast,
            _ => CursorAttribute::BlinkSlow,
        }
    }
}

#[derive(Default)]
pub struct Crtc6845 {
    index: u8,
    pub htotal: u8,
    pub hdisp: u8,
    pub hsync_pos: u8,
    pub sync_width: u8,
    pub vtotal: u8,
    pub vtotal_adjust: u8,
    pub vdisp: u8,
    pub vsync_pos: u8,
    pub interlace_mode: u8,
    pub max_scanline: u8,
    pub cursor_start: u8,
    pub cursor_end: u8,
    pub start_address: u16,
    pub cursor_address: u16,
    pub lightpen_address: u16,
}

impl Crtc6845 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn cursor_attribute(&self) -> CursorAttribute {
        CursorAttribute::from_cursor_start(self.cursor_start)
    }

    pub fn write_index(&mut self, value: u8) {
        self.index = value & 0x1F;
    }

    pub fn read_data(&self) -> u8 {
        match self.index {
            REG_CURSOR_HI => ((self.cursor_address >> 8) & 0x3F) as u8,
            REG_CURSOR_LO => (self.cursor_address & 0xFF) as u8,
            REG_LIGHT_PEN_HI => ((self.lightpen_address >> 8) & 0x3F) as u8,
            REG_LIGHT_PEN_LO => (self.lightpen_address & 0xFF) as u8,
            _ => 0,
        }
    }

    pub fn write_data(&mut self, value: u8) {
        match self.index {
            REG_HORIZONTAL_TOTAL => self.htotal = value,
            REG_HORIZONTAL_DISPLAYED => self.hdisp = value,
            REG_H_SYNC_POSITION => self.hsync_pos = value,
            REG_SYNC_WIDTH => self.sync_width = value,
            REG_VERTICAL_TOTAL => self.vtotal = value & 0x7F,
            REG_V_TOTAL_ADJUST => self.vtotal_adjust = value & 0x1F,
            REG_VERTICAL_DISPLAYED => self.vdisp = value & 0x7F,
            REG_V_SYNC_POSITION => self.vsync_pos = value & 0x7F,
            REG_INTERLACE_MODE_AND_SKEW => self.interlace_mode = value & 0x03,
            REG_MAX_SCAN_LINE_ADDRESS => self.max_scanline = value & 0x1F,
            REG_CURSOR_START => self.cursor_start = value & 0x7F,
            REG_CURSOR_END => self.cursor_end = value & 0x1F,
            REG_ADDRESS_HI => {
                self.start_address =
                    (self.start_address & 0x00FF) | (((value & 0x3F) as u16) << 8);
            }
            REG_ADDRESS_LO => {
                self.start_address = (self.start_address & 0xFF00) | value as u16;
            }
            REG_CURSOR_HI => {
                self.cursor_address =
                    (self.cursor_address & 0x00FF) | (((value & 0x3F) as u16) << 8);
            }
            REG_CURSOR_LO => {
                self.cursor_address = (self.cursor_address & 0xFF00) | value as u16;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_total_is_clamped_to_7_bits() {
        let mut crtc = Crtc6845::new();
        crtc.write_index(REG_VERTICAL_TOTAL);
        crtc.write_data(0xFF);
        assert_eq!(crtc.vtotal, 0x7F);
    }

    #[test]
    fn start_address_hi_lo_pair_assembles() {
        let mut crtc = Crtc6845::new();
        crtc.write_index(REG_ADDRESS_HI);
        crtc.write_data(0x3F);
        crtc.write_index(REG_ADDRESS_LO);
        crtc.write_data(0xCD);
        assert_eq!(crtc.start_address, 0x3FCD);
    }

    #[test]
    fn cursor_address_is_read_back_through_data_port() {
        let mut crtc = Crtc6845::new();
        crtc.write_index(REG_CURSOR_HI);
        crtc.write_data(0x01);
        crtc.write_index(REG_CURSOR_LO);
        crtc.write_data(0x23);
        crtc.write_index(REG_CURSOR_HI);
        assert_eq!(crtc.read_data(), 0x01);
        crtc.write_index(REG_CURSOR_LO);
        assert_eq!(crtc.read_data(), 0x23);
    }

    #[test]
    fn light_pen_register_is_unaffected_by_writes() {
        let mut crtc = Crtc6845::new();
        crtc.lightpen_address = 0x1234;
        crtc.write_index(REG_LIGHT_PEN_HI);
        crtc.write_data(0xFF); // write-ignored: light pen registers are read-only
        assert_eq!(crtc.read_data(), 0x12);
    }

    #[test]
    fn cursor_attribute_decodes_all_four_states() {
        let mut crtc = Crtc6845::new();
        crtc.write_index(REG_CURSOR_START);
        crtc.write_data(0x00);
        assert_eq!(crtc.cursor_attribute(), CursorAttribute::Solid);
        crtc.write_data(0x20);
        assert_eq!(crtc.cursor_attribute(), CursorAttribute::Disabled);
        crtc.write_data(0x40);
        assert_eq!(crtc.cursor_attribute(), CursorAttribute::BlinkFast);
        crtc.write_data(0x60);
        assert_eq!(crtc.cursor_attribute(), CursorAttribute::BlinkSlow);
    }

    #[test]
    fn index_register_is_masked_to_5_bits() {
        let mut crtc = Crtc6845::new();
        crtc.write_index(0xFF);
        // index 0x1F doesn't match any known register; write_data is a no-op
        crtc.write_data(0x55);
        assert_eq!(crtc.htotal, 0);
    }
}
