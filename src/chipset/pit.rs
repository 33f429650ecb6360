//! 8253 Programmable Interval Timer: three independent channels, modes
//! 0/2/3 fully modeled, modes 1/4/5 stubbed. Ported from `i8253_pit.c`
//! (SPEC_FULL.md §4.4).

use crate::bus::traits::BusIO;

const RW_LATCH: u8 = 0b00;
const RW_LSB: u8 = 0b01;
const RW_MSB: u8 = 0b10;
const RW_BOTH: u8 = 0b11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    WaitingForReload,
    WaitingForGate,
    WaitingLoadCycle,
    #[allow(dead_code)]
    DelayLoadCycle,
    Counting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadByte {
    Lsb,
    Msb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadType {
    Init,
    Sequ,
}

struct PitChannel {
    rw: u8,
    mode: u8,

    counter: u16,
    counter_latch: u16,
    count_is_latched: bool,
    count_register: u16,
    reload: u16,

    load_byte: LoadByte,
    load_type: LoadType,
    state: ChannelState,

    gate: bool,
    out: bool,
    out_on_reload: bool,
}

impl Default for PitChannel {
    fn default() -> Self {
        PitChannel {
            rw: RW_LSB,
            mode: 0,
            counter: 0,
            counter_latch: 0,
            count_is_latched: false,
            count_register: 0,
            reload: 0,
            load_byte: LoadByte::Lsb,
            load_type: LoadType::Init,
            state: ChannelState::WaitingForReload,
            gate: true,
            out: false,
            out_on_reload: false,
        }
    }
}

impl PitChannel {
    fn control_write(&mut self, value: u8) {
        self.rw = (value >> 4) & 0x03;
        if self.rw == RW_LATCH {
            self.counter_latch = self.counter;
            self.count_is_latched = true;
            return;
        }

        self.mode = (value >> 1) & 0x07;
        self.count_is_latched = false;
        self.counter = 0;
        self.state = ChannelState::WaitingForReload;
        self.load_byte = LoadByte::Lsb;
        self.load_type = LoadType::Init;

        let (out, out_on_reload) = match self.mode {
            0 => (false, false),
            1 => (true, false),
            2 | 6 => (true, true),
            3 | 7 => (true, true),
            4 | 5 => (true, false),
            _ => (false, false),
        };
        self.out = out;
        self.out_on_reload = out_on_reload;
    }

    fn load_counter(&mut self) {
        self.reload = self.count_register;
        if self.load_type == LoadType::Init {
            self.state = ChannelState::WaitingLoadCycle;
            self.load_type = LoadType::Sequ;
        } else if matches!(self.mode, 0 | 4) {
            self.state = ChannelState::WaitingLoadCycle;
        }

        if self.mode == 0 && self.load_type == LoadType::Sequ {
            // A load while already counting (mode 0) stops the timer and
            // drives output low until the armed reload takes effect.
            self.out = false;
        }
    }

    fn count_write(&mut self, value: u8) {
        match self.rw {
            RW_LSB => {
                self.count_register = value as u16;
                self.load_counter();
            }
            RW_MSB => {
                self.count_register = (value as u16) << 8;
                self.load_counter();
            }
            RW_BOTH => match self.load_byte {
                LoadByte::Lsb => {
                    self.count_register = (self.count_register & 0xFF00) | value as u16;
                    self.load_byte = LoadByte::Msb;
                }
                LoadByte::Msb => {
                    self.count_register = (self.count_register & 0x00FF) | ((value as u16) << 8);
                    self.load_byte = LoadByte::Lsb;
                    self.load_counter();
                    if self.mode == 0 {
                        self.out = false;
                        self.state = ChannelState::WaitingForReload;
                    }
                }
            },
            _ => {}
        }
    }

    fn read(&mut self) -> u8 {
        match self.rw {
            RW_LSB => {
                self.count_is_latched = false;
                self.counter_latch.to_le_bytes()[0]
            }
            RW_MSB => {
                self.count_is_latched = false;
                self.counter_latch.to_le_bytes()[1]
            }
            RW_BOTH => match self.load_byte {
                LoadByte::Lsb => {
                    self.load_byte = LoadByte::Msb;
                    self.counter_latch.to_le_bytes()[0]
                }
                LoadByte::Msb => {
                    self.load_byte = LoadByte::Lsb;
                    self.count_is_latched = false;
                    self.counter_latch.to_le_bytes()[1]
                }
            },
            _ => 0,
        }
    }

    fn count_down(&mut self) {
        self.counter = self.counter.wrapping_sub(1);
        if !self.count_is_latched {
            self.counter_latch = self.counter;
        }
    }

    fn tick_mode(&mut self) {
        match self.mode {
            0 => {
                self.count_down();
                if self.counter == 0 {
                    self.out = true;
                }
            }
            2 | 6 => {
                self.count_down();
                if self.counter == 1 {
                    self.out = false;
                    self.out_on_reload = true;
                    self.state = ChannelState::WaitingLoadCycle;
                }
            }
            3 | 7 => {
                self.count_down();
                if self.counter == 0 {
                    self.out = !self.out;
                    self.counter = self.reload;
                    self.state = ChannelState::WaitingLoadCycle;
                }
            }
            _ => {
                log::debug!(target: "pit", "mode {} tick not implemented", self.mode);
            }
        }
    }

    fn set_gate(&mut self, gate: bool) {
        let rising = gate && !self.gate;
        let falling = !gate && self.gate;
        self.gate = gate;

        if self.state == ChannelState::WaitingForReload {
            return;
        }

        if rising {
            match self.mode {
                1 | 2 | 3 | 5 | 6 | 7 => self.state = ChannelState::WaitingLoadCycle,
                _ => {}
            }
        } else if falling {
            match self.mode {
                2 | 3 | 6 | 7 => {
                    self.out = true;
                    self.state = ChannelState::WaitingForGate;
                }
                4 => {
                    self.state = ChannelState::WaitingForGate;
                }
                _ => {}
            }
        }
    }

    fn update(&mut self, gate: bool) {
        self.set_gate(gate);
        match self.state {
            ChannelState::WaitingForReload | ChannelState::WaitingForGate => {}
            ChannelState::DelayLoadCycle => {
                self.state = ChannelState::WaitingLoadCycle;
            }
            ChannelState::WaitingLoadCycle => {
                self.counter = self.reload;
                self.out = self.out_on_reload;
                self.state = ChannelState::Counting;
            }
            ChannelState::Counting => self.tick_mode(),
        }
    }

    fn reset(&mut self) {
        *self = PitChannel::default();
    }
}

/// The 8253 PIT: three channels addressed at ports base+0..=2, control byte
/// at base+3.
pub struct Pit8253 {
    channels: [PitChannel; 3],
    gate: [bool; 3],
}

impl Default for Pit8253 {
    fn default() -> Self {
        Pit8253 {
            channels: [
                PitChannel::default(),
                PitChannel::default(),
                PitChannel::default(),
            ],
            gate: [true, true, true],
        }
    }
}

impl Pit8253 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.reset();
        }
    }

    pub fn set_gate(&mut self, channel: usize, gate: bool) {
        self.gate[channel] = gate;
    }

    /// Advance every channel by one PIT clock.
    pub fn tick(&mut self) {
        for i in 0..3 {
            let gate = self.gate[i];
            self.channels[i].update(gate);
        }
    }

    pub fn output(&self, channel: usize) -> bool {
        self.channels[channel].out
    }
}

impl BusIO for Pit8253 {
    fn write_io(&mut self, port: u16, value: u8) -> bool {
        match port & 0x03 {
            0..=2 => {
                self.channels[(port & 0x03) as usize].count_write(value);
                true
            }
            3 => {
                let channel = (value >> 6) & 0x03;
                if channel == 3 {
                    return true; // read-back command, not supported
                }
                self.channels[channel as usize].control_write(value);
                true
            }
            _ => false,
        }
    }

    fn read_io(&mut self, port: u16) -> Option<u8> {
        match port & 0x03 {
            0..=2 => Some(self.channels[(port & 0x03) as usize].read()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode0_counts_to_zero_and_goes_high() {
        let mut pit = Pit8253::new();
        pit.write_io(3, 0b00_11_000_0); // channel 0, RW both, mode 0
        pit.write_io(0, 0x05);
        pit.write_io(0, 0x00); // count = 5

        assert!(!pit.output(0));
        for _ in 0..5 {
            pit.tick(); // one tick to enter WaitingLoadCycle, then counting
        }
        // Drain remaining ticks until output goes high.
        let mut went_high = false;
        for _ in 0..16 {
            pit.tick();
            if pit.output(0) {
                went_high = true;
                break;
            }
        }
        assert!(went_high);
    }

    #[test]
    fn mode3_toggles_and_reloads() {
        let mut pit = Pit8253::new();
        pit.write_io(3, 0b00_11_011_0); // channel 0, RW both, mode 3
        pit.write_io(0, 0x04);
        pit.write_io(0, 0x00); // reload = 4

        let mut edges = 0;
        let mut last = pit.output(0);
        for _ in 0..40 {
            pit.tick();
            if pit.output(0) != last {
                edges += 1;
                last = pit.output(0);
            }
        }
        assert!(edges > 0);
    }

    #[test]
    fn latch_freezes_value_until_read() {
        let mut pit = Pit8253::new();
        pit.write_io(3, 0b00_01_000_0); // channel 0, RW LSB, mode 0
        pit.write_io(0, 0x0A);
        pit.tick();
        pit.write_io(3, 0b00_00_00_00); // latch channel 0
        let before = pit.read_io(0);
        pit.tick();
        pit.tick();
        assert_eq!(pit.read_io(0), before);
    }
}
