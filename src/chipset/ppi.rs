//! 8255 Programmable Peripheral Interface wired the system-board way: port A
//! reads keyboard data or DIP bank 1, port B is the device control register,
//! port C reads DIP bank 2 (or the spare-key/RAM-size nibble). Ported from
//! `i8255_ppi.c` plus the board wiring in `ibm_pc.c` (SPEC_FULL.md §4.7).

use crate::bus::traits::BusIO;

pub const PORTB_TIMER2_GATE: u8 = 0x01;
pub const PORTB_SPEAKER_ENABLE: u8 = 0x02;
pub const PORTB_READ_SW2_KEY: u8 = 0x04;
pub const PORTB_CASSETTE_MOTOR_OFF: u8 = 0x08;
pub const PORTB_DISABLE_PARITY_CHECK: u8 = 0x10;
pub const PORTB_DISABLE_IO_CHECK: u8 = 0x20;
pub const PORTB_KB_ENABLE: u8 = 0x40;
pub const PORTB_READ_SW1_KB: u8 = 0x80;

/// The 8255 as wired on the system board: port A/B/C plus the latched
/// control byte, DIP switch banks, and the keyboard data byte fed in from
/// the keyboard controller each cycle.
pub struct Ppi8255 {
    port_a: u8,
    port_b: u8,
    port_c: u8,
    control: u8,

    sw1: u8,
    sw2: u8,
    keyboard_data: u8,
}

impl Ppi8255 {
    pub fn new(sw1: u8, sw2: u8) -> Self {
        Ppi8255 {
            port_a: 0,
            port_b: 0,
            port_c: 0,
            control: 0,
            sw1,
            sw2,
            keyboard_data: 0,
        }
    }

    pub fn reset(&mut self) {
        self.control = 0;
    }

    /// Latch the byte the keyboard controller has ready; port A surfaces
    /// this whenever the SW1/keyboard read bit selects keyboard mode.
    pub fn set_keyboard_data(&mut self, value: u8) {
        self.keyboard_data = value;
    }

    pub fn port_b(&self) -> u8 {
        self.port_b
    }

    pub fn kb_clock_enabled(&self) -> bool {
        self.port_b & PORTB_KB_ENABLE != 0
    }

    pub fn kb_read_enabled(&self) -> bool {
        self.port_b & PORTB_READ_SW1_KB == 0
    }

    pub fn timer2_gate(&self) -> bool {
        self.port_b & PORTB_TIMER2_GATE != 0
    }

    pub fn speaker_enabled(&self) -> bool {
        self.port_b & PORTB_SPEAKER_ENABLE != 0
    }

    fn read_port_a(&self) -> u8 {
        if self.port_b & PORTB_READ_SW1_KB != 0 {
            self.sw1
        } else {
            self.keyboard_data
        }
    }

    fn read_port_c(&self) -> u8 {
        if self.port_b & PORTB_READ_SW2_KEY != 0 {
            self.sw2 & 0x0F
        } else {
            (self.sw2 >> 4) & 0x01
        }
    }
}

impl BusIO for Ppi8255 {
    fn write_io(&mut self, port: u16, value: u8) -> bool {
        match port & 0x03 {
            0 => {
                self.port_a = value;
                true
            }
            1 => {
                self.port_b = value;
                true
            }
            2 => {
                self.port_c = value;
                true
            }
            3 => {
                self.control = value;
                true
            }
            _ => false,
        }
    }

    fn read_io(&mut self, port: u16) -> Option<u8> {
        match port & 0x03 {
            0 => Some(self.read_port_a()),
            1 => Some(self.port_b),
            2 => Some(self.read_port_c()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_a_selects_keyboard_or_sw1_by_portb_bit7() {
        let mut ppi = Ppi8255::new(0x3C, 0x2D);
        ppi.set_keyboard_data(0xAB);

        ppi.write_io(1, 0x00); // bit7 clear: keyboard mode
        assert_eq!(ppi.read_io(0), Some(0xAB));

        ppi.write_io(1, PORTB_READ_SW1_KB);
        assert_eq!(ppi.read_io(0), Some(0x3C));
    }

    #[test]
    fn port_c_selects_sw2_nibble_by_portb_bit2() {
        let mut ppi = Ppi8255::new(0x00, 0b1011_0110);
        ppi.write_io(1, PORTB_READ_SW2_KEY);
        assert_eq!(ppi.read_io(2), Some(0x06));

        ppi.write_io(1, 0x00);
        assert_eq!(ppi.read_io(2), Some(0x01));
    }

    #[test]
    fn port_b_write_always_updates_latch() {
        let mut ppi = Ppi8255::new(0, 0);
        ppi.write_io(1, PORTB_KB_ENABLE | PORTB_TIMER2_GATE);
        assert!(ppi.kb_clock_enabled());
        assert!(ppi.timer2_gate());
        assert!(!ppi.speaker_enabled());
    }
}
