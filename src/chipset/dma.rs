//! 8237 Programmable DMA Controller: four channels, each with latched and
//! current 16-bit address/word-count registers, an 8-bit page register, and
//! a mode byte. Ported from `i8237_dma.c` (SPEC_FULL.md §4.3).

use crate::bus::traits::{BusIO, BusMemory, DmaChannel};

// Transfer type field of the mode register: 0=verify, 1=write-into-memory,
// 2=read-from-memory, 3=illegal. Only write-into-memory is checked below;
// `read_byte` is unconditional aside from the disable-bit check (§4.3).
const TRANSFER_TYPE_WRITE: u8 = 0x01;
const COMMAND_DISABLE: u8 = 0x04;

#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    latched_address: u16,
    latched_word_count: u16,
    current_address: u16,
    current_word_count: u16,
    page: u8,
    mode: u8,
    masked: bool,
    terminal_count_reached: bool,
}

impl Channel {
    fn transfer_type(&self) -> u8 {
        (self.mode >> 2) & 0x03
    }
    fn auto_init(&self) -> bool {
        self.mode & 0x10 != 0
    }
    fn address_decrement(&self) -> bool {
        self.mode & 0x20 != 0
    }
}

/// The 8237 DMA controller: 4 channels plus shared command/status/flip-flop
/// state.
#[derive(Default)]
pub struct Dma8237 {
    channels: [Channel; 4],
    command: u8,
    status: u8,
    flipflop: bool,
}

impl Dma8237 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn master_clear(&mut self) {
        for ch in &mut self.channels {
            ch.masked = true;
        }
        self.command = 0;
        self.status = 0;
        self.flipflop = false;
    }

    pub fn get_transfer_address(&self, channel: usize) -> u32 {
        let ch = &self.channels[channel];
        ((ch.page as u32) << 16) + ch.current_address as u32
    }

    pub fn get_transfer_size(&self, channel: usize) -> u32 {
        self.channels[channel].current_word_count as u32 + 1
    }

    pub fn terminal_count(&self, channel: usize) -> bool {
        self.channels[channel].terminal_count_reached
    }

    pub fn channel_ready(&self, channel: usize) -> bool {
        !self.channels[channel].masked
    }

    fn advance(&mut self, channel: usize) {
        let ch = &mut self.channels[channel];
        if ch.address_decrement() {
            log::debug!(target: "dma", "channel {channel}: address decrement not implemented");
        } else {
            ch.current_address = ch.current_address.wrapping_add(1);
        }
        ch.current_word_count = ch.current_word_count.wrapping_sub(1);
    }

    fn finish_transfer(&mut self, channel: usize) {
        let ch = &mut self.channels[channel];
        ch.terminal_count_reached = true;
        if ch.auto_init() {
            ch.current_address = ch.latched_address;
            ch.current_word_count = ch.latched_word_count;
        } else {
            // terminal_count_reached stays latched; further transfers are no-ops.
        }
    }

    /// Write one byte from a device into memory via this channel (device ->
    /// memory direction).
    pub fn write_byte(&mut self, channel: usize, value: u8, mem: &mut dyn BusMemory) {
        let tc_reached = self.channels[channel].terminal_count_reached;

        if self.channels[channel].current_word_count > 0 {
            if self.channels[channel].transfer_type() == TRANSFER_TYPE_WRITE {
                let addr = self.get_transfer_address(channel);
                mem.write_byte(addr, value);
            }
            self.advance(channel);
        } else if !tc_reached {
            if self.channels[channel].transfer_type() == TRANSFER_TYPE_WRITE {
                let addr = self.get_transfer_address(channel);
                mem.write_byte(addr, value);
            }
            self.finish_transfer(channel);
        } else {
            log::debug!(target: "dma", "channel {channel}: tried to write on terminal count");
        }
    }

    /// Read one byte from memory for a device via this channel (memory ->
    /// device direction). Returns 0 immediately, without touching channel
    /// state, if the controller-disable bit is set — an asymmetry with
    /// `write_byte` preserved from the reference implementation (§9).
    pub fn read_byte(&mut self, channel: usize, mem: &dyn BusMemory) -> u8 {
        if self.command & COMMAND_DISABLE != 0 {
            return 0;
        }

        let tc_reached = self.channels[channel].terminal_count_reached;
        if self.channels[channel].current_word_count > 0 {
            let addr = self.get_transfer_address(channel);
            let value = mem.read_byte(addr);
            self.advance(channel);
            value
        } else if !tc_reached {
            let addr = self.get_transfer_address(channel);
            let value = mem.read_byte(addr);
            self.finish_transfer(channel);
            value
        } else {
            log::debug!(target: "dma", "channel {channel}: tried to read on terminal count");
            0
        }
    }

    fn channel_mode_write(&mut self, channel: usize, value: u8) {
        self.channels[channel].mode = value;
        self.channels[channel].terminal_count_reached = false;
    }

    fn address_access(&mut self, channel: usize, value: Option<u8>) -> Option<u8> {
        let low_first = !self.flipflop;
        self.flipflop = !self.flipflop;
        let ch = &mut self.channels[channel];
        match value {
            Some(v) => {
                if low_first {
                    ch.latched_address = (ch.latched_address & 0xFF00) | v as u16;
                } else {
                    ch.latched_address = (ch.latched_address & 0x00FF) | ((v as u16) << 8);
                }
                ch.current_address = ch.latched_address;
                None
            }
            None => {
                let bytes = ch.current_address.to_le_bytes();
                Some(if low_first { bytes[0] } else { bytes[1] })
            }
        }
    }

    fn wc_access(&mut self, channel: usize, value: Option<u8>) -> Option<u8> {
        let low_first = !self.flipflop;
        self.flipflop = !self.flipflop;
        let ch = &mut self.channels[channel];
        match value {
            Some(v) => {
                if low_first {
                    ch.latched_word_count = (ch.latched_word_count & 0xFF00) | v as u16;
                } else {
                    ch.latched_word_count = (ch.latched_word_count & 0x00FF) | ((v as u16) << 8);
                }
                ch.current_word_count = ch.latched_word_count;
                None
            }
            None => {
                let bytes = ch.current_word_count.to_le_bytes();
                Some(if low_first { bytes[0] } else { bytes[1] })
            }
        }
    }

    fn page_port(port: u16) -> Option<usize> {
        match port {
            0x87 => Some(0),
            0x83 => Some(1),
            0x81 => Some(2),
            0x82 => Some(3),
            _ => None,
        }
    }
}

impl BusIO for Dma8237 {
    fn write_io(&mut self, port: u16, value: u8) -> bool {
        if port <= 0x07 {
            let channel = (port / 2) as usize;
            if port % 2 == 0 {
                self.address_access(channel, Some(value));
            } else {
                self.wc_access(channel, Some(value));
            }
            return true;
        }
        if let Some(channel) = Self::page_port(port) {
            self.channels[channel].page = value;
            return true;
        }
        match port {
            0x08 => {
                self.command = value;
                true
            }
            0x09 => {
                log::debug!(target: "dma", "request register write not implemented: {value:#x}");
                true
            }
            0x0A => {
                let channel = (value & 0x03) as usize;
                self.channels[channel].masked = (value >> 2) & 0x01 != 0;
                true
            }
            0x0B => {
                let channel = (value & 0x03) as usize;
                self.channel_mode_write(channel, value);
                true
            }
            0x0C => {
                self.flipflop = false;
                true
            }
            0x0D => {
                self.master_clear();
                true
            }
            0x0E => {
                for ch in &mut self.channels {
                    ch.masked = false;
                }
                true
            }
            0x0F => {
                for i in 0..4 {
                    self.channels[i].masked = (value >> i) & 0x01 != 0;
                }
                true
            }
            _ => false,
        }
    }

    fn read_io(&mut self, port: u16) -> Option<u8> {
        if port <= 0x07 {
            let channel = (port / 2) as usize;
            return if port % 2 == 0 {
                self.address_access(channel, None)
            } else {
                self.wc_access(channel, None)
            };
        }
        if let Some(channel) = Self::page_port(port) {
            return Some(self.channels[channel].page);
        }
        match port {
            0x08 => Some(self.status),
            0x0D => Some(0), // temp register, not modeled
            _ => None,
        }
    }
}

impl DmaChannel for Dma8237 {
    fn dma_read(&mut self, channel: usize, mem: &dyn BusMemory) -> u8 {
        self.read_byte(channel, mem)
    }

    fn dma_write(&mut self, channel: usize, value: u8, mem: &mut dyn BusMemory) {
        self.write_byte(channel, value, mem)
    }

    fn terminal_count(&self, channel: usize) -> bool {
        Dma8237::terminal_count(self, channel)
    }

    fn channel_ready(&self, channel: usize) -> bool {
        Dma8237::channel_ready(self, channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatMem(Vec<u8>);
    impl BusMemory for FlatMem {
        fn read_byte(&self, addr: u32) -> u8 {
            self.0[addr as usize]
        }
        fn write_byte(&mut self, addr: u32, value: u8) {
            self.0[addr as usize] = value;
        }
    }

    #[test]
    fn dma_loopback_write_into_memory() {
        let mut dma = Dma8237::new();
        let mut mem = FlatMem(vec![0; 0x2000]);

        // Program channel 0: address 0x1000, count 3 (transfers 4 bytes),
        // mode = write-into-memory, increment, single.
        dma.write_io(0x00, 0x00); // address low
        dma.write_io(0x00, 0x10); // address high -> 0x1000
        dma.write_io(0x01, 0x03); // wc low
        dma.write_io(0x01, 0x00); // wc high -> 3 (=> 4 bytes)
        dma.write_io(0x0B, 0b0000_0100 | 0x00); // mode: transfer_type=write(01)<<2=0x04, channel 0

        for b in [0xDEu8, 0xAD, 0xBE, 0xEF] {
            dma.write_byte(0, b, &mut mem);
        }

        assert_eq!(&mem.0[0x1000..0x1004], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(dma.terminal_count(0));

        // A 5th write is a no-op.
        mem.0[0x1004] = 0xFF;
        dma.write_byte(0, 0x55, &mut mem);
        assert_eq!(mem.0[0x1004], 0xFF);
    }

    #[test]
    fn read_disabled_bit_blocks_reader_only() {
        let mut dma = Dma8237::new();
        let mem = FlatMem(vec![0x42; 16]);
        dma.write_io(0x08, COMMAND_DISABLE);
        assert_eq!(dma.read_byte(0, &mem), 0);
    }

    #[test]
    fn flipflop_sequences_low_then_high() {
        let mut dma = Dma8237::new();
        dma.write_io(0x00, 0xAB);
        dma.write_io(0x00, 0xCD);
        assert_eq!(dma.channels[0].current_address, 0xCDAB);
    }
}
