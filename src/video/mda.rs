//! Monochrome Display Adapter: a CRTC instance plus the mode/status
//! registers and IO window. Ported from `mda.c`/`mda.h` (SPEC_FULL.md
//! §4.9).

use crate::video::crtc::Crtc6845;

const STATUS_HRETRACE: u8 = 0x01;
const STATUS_VRETRACE: u8 = 0x08;

const MODE_HI_RES: u8 = 0x01;

const HI_RES_COLUMNS: u16 = 80;
const HI_RES_ROWS: u16 = 25;
const HI_RES_WIDTH: u16 = 720;
const HI_RES_HEIGHT: u16 = 350;

pub struct Mda {
    pub crtc: Crtc6845,
    status: u8,
    mode: u8,
    pub columns: u16,
    pub rows: u16,
    pub width: u16,
    pub height: u16,
}

impl Default for Mda {
    fn default() -> Self {
        let mut mda = Mda {
            crtc: Crtc6845::new(),
            status: 0,
            mode: 0,
            columns: 0,
            rows: 0,
            width: 0,
            height: 0,
        };
        mda.mode(0);
        mda
    }
}

impl Mda {
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

    /// Only the hi-res bit actually carries dimensions in the original;
    /// the MDA card has no real "lo res" mode, so a lo-res mode write
    /// leaves `columns`/`rows`/`width`/`height` at whatever they were.
    fn mode(&mut self, value: u8) {
        if value & MODE_HI_RES != 0 {
            self.columns = HI_RES_COLUMNS;
            self.rows = HI_RES_ROWS;
            self.width = HI_RES_WIDTH;
            self.height = HI_RES_HEIGHT;
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
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resets_leave_dimensions_at_zero() {
        let mda = Mda::new();
        assert_eq!(mda.columns, 0);
        assert_eq!(mda.width, 0);
    }

    #[test]
    fn mode_write_switches_to_hi_res() {
        let mut mda = Mda::new();
        mda.write_io(0x8, MODE_HI_RES);
        assert_eq!(mda.columns, HI_RES_COLUMNS);
        assert_eq!(mda.rows, HI_RES_ROWS);
        assert_eq!(mda.width, HI_RES_WIDTH);
        assert_eq!(mda.height, HI_RES_HEIGHT);
    }

    #[test]
    fn status_read_toggles_retrace_bits_every_call() {
        let mut mda = Mda::new();
        let first = mda.read_io(0xA);
        let second = mda.read_io(0xA);
        assert_ne!(first & STATUS_HRETRACE, second & STATUS_HRETRACE);
        assert_ne!(first & STATUS_VRETRACE, second & STATUS_VRETRACE);
    }

    #[test]
    fn crtc_index_and_data_round_trip_through_io_window() {
        let mut mda = Mda::new();
        mda.write_io(0x4, 0x0A); // select cursor start register
        mda.write_io(0x5, 0x20); // disabled, non-blink
        mda.write_io(0x0, 0x0E); // select cursor address high
        mda.write_io(0x1, 0x01);
        assert_eq!(mda.read_io(0x1), 0x01);
    }
}
