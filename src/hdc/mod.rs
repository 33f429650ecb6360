//! Xebec hard disk controller: 5-byte Device Control Block command frame,
//! status/sense FIFOs, and DMA-driven sector transfers. Shares the
//! command/execution/result phase shape of the floppy controller (`fdc`)
//! but with a different command set and status-register layout. Ported
//! from `xebec.c` (SPEC_FULL.md §4.8).

pub mod hdd;

use crate::bus::traits::{BusMemory, DmaChannel, IrqSink};
use crate::util::chs::chs_advance;
use crate::util::{Chs, RingBuffer};
use hdd::HardDrive;

const PORT_READ_DATA: u16 = 0;
const PORT_READ_STATUS: u16 = 1;
const PORT_READ_DIP: u16 = 2;

const PORT_WRITE_DATA: u16 = 0;
const PORT_RESET: u16 = 1;
const PORT_WRITE_SELECT: u16 = 2;
const PORT_WRITE_MASK: u16 = 3;

const CMD_TEST_DRIVE: u8 = 0x00;
const CMD_RECALIBRATE: u8 = 0x01;
const CMD_SENSE: u8 = 0x03;
const CMD_FORMAT_DRIVE: u8 = 0x04;
const CMD_CHECK_TRACK: u8 = 0x05;
const CMD_FORMAT_TRACK: u8 = 0x06;
const CMD_FORMAT_BAD: u8 = 0x07;
const CMD_READ: u8 = 0x08;
const CMD_WRITE: u8 = 0x0A;
const CMD_SEEK: u8 = 0x0B;
const CMD_INIT_DRIVE: u8 = 0x0C;
const CMD_READ_ECC: u8 = 0x0D;
const CMD_READ_BUFFER: u8 = 0x0E;
const CMD_WRITE_BUFFER: u8 = 0x0F;
const CMD_RAM_DIAG: u8 = 0xE0;
const CMD_DRIVE_DIAG: u8 = 0xE3;
const CMD_CONTROLLER_DIAG: u8 = 0xE4;
const CMD_READ_LONG: u8 = 0xE5;
const CMD_WRITE_LONG: u8 = 0xE6;

const HDC_DMA_CHANNEL: usize = 3;
const HDC_IRQ: u8 = 5;

const R1_REQ: u8 = 0x01;
const R1_IOMODE: u8 = 0x02;
const R1_BUS: u8 = 0x04;
const R1_BUSY: u8 = 0x08;
const R1_INT: u8 = 0x20;

pub const ERROR_OK: u8 = 0x00;
pub const ERROR_READY_SIGNAL: u8 = 0x04;
pub const ERROR_INVALID_COMMAND: u8 = 0x20;

/// A whole 8237 channel is limited to a 16-bit word count, so no
/// DMA-driven command can transfer more than this many bytes regardless of
/// what the drive geometry or a runaway loop might otherwise suggest.
const MAX_DMA_CHANNEL_BYTES: u32 = 65_536;

const STATUS: bool = false;
const SENSE: bool = true;

struct Dcb {
    drive_select: usize,
    chs: Chs,
}

struct CommandState {
    byte: u8,
    param_count: u8,
    receiving: bool,
    received: bool,
}

impl Default for CommandState {
    fn default() -> Self {
        CommandState {
            byte: 0,
            param_count: 0,
            receiving: false,
            received: false,
        }
    }
}

/// Xebec MFM hard disk controller: two drives, a status register, and the
/// command FIFO pair.
pub struct Hdc {
    pub drives: [HardDrive; 2],

    status_register: u8,
    status_byte: u8,
    error: u8,
    dipswitch: u8,
    int_enabled: bool,
    dma_enabled: bool,
    hdd_select: usize,
    current_chs: Chs,

    command: CommandState,
    in_fifo: RingBuffer,
    out_fifo: RingBuffer,
}

impl Default for Hdc {
    fn default() -> Self {
        Hdc {
            drives: [HardDrive::new(), HardDrive::new()],
            status_register: 0,
            status_byte: 0,
            error: 0,
            dipswitch: 0,
            int_enabled: true,
            dma_enabled: true,
            hdd_select: 0,
            current_chs: Chs::new(0, 0, 1),
            command: CommandState::default(),
            in_fifo: RingBuffer::with_capacity(18),
            out_fifo: RingBuffer::with_capacity(10),
        }
    }
}

impl Hdc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.status_register = 0;
        self.error = 0;
        self.command_reset();
        self.in_fifo.clear();
        self.out_fifo.clear();
    }

    pub fn insert_disk(&mut self, drive: usize, geometry: crate::util::Geometry, buffer: Vec<u8>) -> bool {
        self.drives[drive].insert(geometry, buffer)
    }

    fn pop_param(&mut self) -> u8 {
        self.in_fifo.pop()
    }

    /// Decode the 5-byte Device Control Block every command is framed
    /// with, in wire order.
    fn decode_dcb(&mut self) -> Dcb {
        let byte0 = self.pop_param();
        let byte1 = self.pop_param();
        let byte2 = self.pop_param();
        let _byte3 = self.pop_param(); // block count / interleave, unused
        let _byte4 = self.pop_param(); // step option / disable-retry, unused

        let drive_select = ((byte0 >> 5) & 0x01) as usize;
        let h = byte0 & 0x1F;
        let s = byte1 & 0x3F;
        let c = (((byte1 & 0xC0) as u16) << 2) | byte2 as u16;

        Dcb {
            drive_select,
            chs: Chs::new(c, h, s),
        }
    }

    fn discard_dcb(&mut self) {
        for _ in 0..5 {
            self.pop_param();
        }
    }

    fn send_sense_bytes(&mut self) {
        self.out_fifo.push(self.error);
        self.out_fifo.push(((self.hdd_select as u8) << 5) | self.current_chs.h);
        self.out_fifo
            .push((((self.current_chs.c >> 2) & 0x0C) as u8) | (self.current_chs.s & 0x1F));
        self.out_fifo.push((self.current_chs.c & 0xFF) as u8);
        self.status_register = R1_BUSY | R1_IOMODE | R1_REQ;
    }

    fn send_status_byte(&mut self) {
        let mut status = (self.hdd_select as u8) << 5;
        if self.error != ERROR_OK {
            status |= 0x02;
        }
        self.status_byte = status;
        self.status_register = R1_BUSY | R1_BUS | R1_IOMODE | R1_REQ;
    }

    fn command_reset(&mut self) {
        self.command = CommandState::default();
    }

    fn command_set(&mut self, command: u8) {
        self.command.byte = command;
        self.command.param_count = match command {
            CMD_INIT_DRIVE => 5 + 8,
            CMD_TEST_DRIVE | CMD_RECALIBRATE | CMD_SENSE | CMD_FORMAT_DRIVE | CMD_CHECK_TRACK
            | CMD_FORMAT_TRACK | CMD_FORMAT_BAD | CMD_READ | CMD_WRITE | CMD_SEEK | CMD_READ_ECC
            | CMD_READ_BUFFER | CMD_WRITE_BUFFER | CMD_RAM_DIAG | CMD_DRIVE_DIAG
            | CMD_CONTROLLER_DIAG | CMD_READ_LONG | CMD_WRITE_LONG => 5,
            _ => 0,
        };

        if self.command.param_count == 0 {
            self.command.receiving = false;
            self.command.received = true;
            self.status_register = R1_BUSY | R1_BUS;
        } else {
            self.command.receiving = true;
            self.command.received = false;
            self.status_register = R1_BUSY | R1_REQ;
        }
    }

    fn command_set_parameter(&mut self, value: u8) {
        self.in_fifo.push(value);
        self.command.param_count -= 1;
        if self.command.param_count == 0 {
            self.command.receiving = false;
            self.command.received = true;
            self.status_register = R1_BUSY | R1_BUS;
        }
    }

    fn command_finalize(&mut self, irq_sink: &mut dyn IrqSink, send: bool, irq: bool) {
        if send == SENSE {
            self.send_sense_bytes();
        } else {
            self.send_status_byte();
        }

        if irq && self.int_enabled {
            irq_sink.raise_irq(HDC_IRQ);
            self.status_register |= R1_INT;
        }

        self.command_reset();
    }

    fn execute(&mut self, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        match self.command.byte {
            CMD_TEST_DRIVE => self.cmd_test_drive(irq),
            CMD_RECALIBRATE => self.cmd_recalibrate(irq),
            CMD_SENSE => self.cmd_sense(irq),
            CMD_FORMAT_DRIVE => self.cmd_format_drive(irq),
            CMD_CHECK_TRACK => self.cmd_check_track(irq),
            CMD_FORMAT_TRACK => self.cmd_format_track(irq),
            CMD_FORMAT_BAD => self.cmd_format_track(irq), // bad-track marking not modeled; same finalize shape
            CMD_READ => self.cmd_read(irq, dma, mem),
            CMD_WRITE => self.cmd_write(irq, dma, mem),
            CMD_SEEK => self.cmd_seek(irq),
            CMD_INIT_DRIVE => self.cmd_init_drive(irq),
            CMD_READ_ECC => self.cmd_read_ecc(irq),
            CMD_READ_BUFFER => self.cmd_read_buffer(irq, dma, mem),
            CMD_WRITE_BUFFER => self.cmd_write_buffer(irq, dma, mem),
            CMD_RAM_DIAG => self.cmd_diag(irq, "ram"),
            CMD_DRIVE_DIAG => self.cmd_diag(irq, "drive"),
            CMD_CONTROLLER_DIAG => self.cmd_diag(irq, "controller"),
            // ECC is not modeled; Read/Write Long reuse the plain sector
            // transfer used by Read/Write (SPEC_FULL.md §4.8).
            CMD_READ_LONG => self.cmd_read(irq, dma, mem),
            CMD_WRITE_LONG => self.cmd_write(irq, dma, mem),
            _ => self.cmd_nop(irq),
        }
    }

    fn cmd_test_drive(&mut self, irq: &mut dyn IrqSink) {
        let dcb = self.decode_dcb();
        self.hdd_select = dcb.drive_select;
        self.error = ERROR_OK;
        self.command_finalize(irq, STATUS, true);
    }

    fn cmd_init_drive(&mut self, irq: &mut dyn IrqSink) {
        for _ in 0..13 {
            self.pop_param();
        }
        self.error = ERROR_OK;
        self.command_finalize(irq, STATUS, true);
    }

    fn cmd_recalibrate(&mut self, irq: &mut dyn IrqSink) {
        let dcb = self.decode_dcb();
        self.hdd_select = dcb.drive_select;
        self.current_chs = Chs::new(0, 0, 1);
        self.error = ERROR_OK;
        self.command_finalize(irq, STATUS, true);
    }

    fn cmd_seek(&mut self, irq: &mut dyn IrqSink) {
        let dcb = self.decode_dcb();
        self.hdd_select = dcb.drive_select;
        self.current_chs = Chs::new(dcb.chs.c, dcb.chs.h, 1);
        self.error = if self.drives[self.hdd_select].inserted {
            ERROR_OK
        } else {
            ERROR_READY_SIGNAL
        };
        self.command_finalize(irq, STATUS, true);
    }

    fn cmd_sense(&mut self, irq: &mut dyn IrqSink) {
        let dcb = self.decode_dcb();
        self.hdd_select = dcb.drive_select;
        self.command_finalize(irq, SENSE, true);
    }

    fn cmd_format_drive(&mut self, irq: &mut dyn IrqSink) {
        let dcb = self.decode_dcb();
        self.hdd_select = dcb.drive_select;
        self.current_chs = Chs::new(dcb.chs.c, dcb.chs.h, 1);
        self.error = if self.drives[self.hdd_select].inserted {
            ERROR_OK
        } else {
            ERROR_READY_SIGNAL
        };
        self.command_finalize(irq, STATUS, true);
    }

    fn cmd_check_track(&mut self, irq: &mut dyn IrqSink) {
        let dcb = self.decode_dcb();
        self.hdd_select = dcb.drive_select;
        self.current_chs = Chs::new(dcb.chs.c, dcb.chs.h, dcb.chs.s + 1);
        self.error = if self.drives[self.hdd_select].inserted {
            ERROR_OK
        } else {
            ERROR_READY_SIGNAL
        };
        self.command_finalize(irq, STATUS, true);
    }

    fn cmd_format_track(&mut self, irq: &mut dyn IrqSink) {
        let dcb = self.decode_dcb();
        self.hdd_select = dcb.drive_select;
        self.current_chs = Chs::new(dcb.chs.c, dcb.chs.h, 1);
        self.error = if self.drives[self.hdd_select].inserted {
            ERROR_OK
        } else {
            ERROR_READY_SIGNAL
        };
        self.command_finalize(irq, STATUS, true);
    }

    fn cmd_read_ecc(&mut self, irq: &mut dyn IrqSink) {
        self.discard_dcb();
        self.error = ERROR_OK;
        self.command_finalize(irq, STATUS, true);
    }

    fn cmd_diag(&mut self, irq: &mut dyn IrqSink, which: &str) {
        self.discard_dcb();
        self.error = ERROR_OK;
        self.command_finalize(irq, STATUS, true);
        log::debug!(target: "xebec", "{which} diag");
    }

    fn cmd_nop(&mut self, irq: &mut dyn IrqSink) {
        self.in_fifo.clear();
        self.error = ERROR_INVALID_COMMAND;
        self.command_finalize(irq, STATUS, true);
    }

    /// Transfer one sector at a time over DMA channel 3 until the channel
    /// reaches terminal count, advancing CHS between sectors. Shared body
    /// for Read/Write (and the Read/Write Long variants, which do not model
    /// ECC bytes separately — SPEC_FULL.md §4.8).
    fn run_sector_transfer(
        &mut self,
        dma: &mut dyn DmaChannel,
        mem: &mut dyn BusMemory,
        write_to_drive: bool,
    ) {
        if !self.dma_enabled {
            log::debug!(target: "xebec", "PIO mode not implemented");
            return;
        }

        let mut bytes_moved = 0u32;
        while !dma.terminal_count(HDC_DMA_CHANNEL) && bytes_moved < MAX_DMA_CHANNEL_BYTES {
            let offset = crate::util::chs::chs_to_lba(
                self.drives[self.hdd_select]
                    .geometry
                    .unwrap_or(crate::util::Geometry::new(0, 0, 0)),
                self.current_chs,
            ) * 512;

            for i in 0..512u64 {
                if dma.terminal_count(HDC_DMA_CHANNEL) || bytes_moved >= MAX_DMA_CHANNEL_BYTES {
                    break;
                }
                if write_to_drive {
                    let byte = dma.dma_read(HDC_DMA_CHANNEL, mem);
                    self.drives[self.hdd_select].write_byte(offset + i, byte);
                } else {
                    let byte = self.drives[self.hdd_select].read_byte(offset + i);
                    dma.dma_write(HDC_DMA_CHANNEL, byte, mem);
                }
                bytes_moved += 1;
            }

            if let Some(geometry) = self.drives[self.hdd_select].geometry {
                chs_advance(geometry, &mut self.current_chs);
            }
        }
    }

    fn cmd_read(&mut self, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        let dcb = self.decode_dcb();
        self.hdd_select = dcb.drive_select;
        self.current_chs = Chs::new(dcb.chs.c, dcb.chs.h, dcb.chs.s + 1);

        if !self.drives[self.hdd_select].inserted {
            self.error = ERROR_READY_SIGNAL;
            self.command_finalize(irq, STATUS, true);
            return;
        }

        self.run_sector_transfer(dma, mem, false);
        self.error = ERROR_OK;
        self.command_finalize(irq, STATUS, true);
    }

    fn cmd_write(&mut self, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        let dcb = self.decode_dcb();
        self.hdd_select = dcb.drive_select;
        self.current_chs = Chs::new(dcb.chs.c, dcb.chs.h, dcb.chs.s + 1);

        if !self.drives[self.hdd_select].inserted {
            self.error = ERROR_READY_SIGNAL;
            self.command_finalize(irq, STATUS, true);
            return;
        }

        self.run_sector_transfer(dma, mem, true);
        self.error = ERROR_OK;
        self.command_finalize(irq, STATUS, true);
    }

    /// Read Buffer / Write Buffer decode and discard their DCB and drive
    /// the same DMA/terminal-count handshake as Read/Write, but never touch
    /// a drive's backing buffer: the reference source's async handlers for
    /// both have the drive-buffer access commented out (§9 Open Questions).
    fn cmd_read_buffer(&mut self, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        self.discard_dcb();
        if !self.dma_enabled {
            log::debug!(target: "xebec", "PIO mode not implemented");
            self.error = ERROR_OK;
            self.command_finalize(irq, STATUS, true);
            return;
        }
        let mut bytes_moved = 0u32;
        while !dma.terminal_count(HDC_DMA_CHANNEL) && bytes_moved < MAX_DMA_CHANNEL_BYTES {
            dma.dma_write(HDC_DMA_CHANNEL, 0x00, mem);
            bytes_moved += 1;
        }
        self.error = ERROR_OK;
        self.command_finalize(irq, STATUS, true);
    }

    fn cmd_write_buffer(&mut self, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        self.discard_dcb();
        if !self.dma_enabled {
            log::debug!(target: "xebec", "PIO mode not implemented");
            self.error = ERROR_OK;
            self.command_finalize(irq, STATUS, true);
            return;
        }
        let mut bytes_moved = 0u32;
        while !dma.terminal_count(HDC_DMA_CHANNEL) && bytes_moved < MAX_DMA_CHANNEL_BYTES {
            let _ = dma.dma_read(HDC_DMA_CHANNEL, mem);
            bytes_moved += 1;
        }
        self.error = ERROR_OK;
        self.command_finalize(irq, STATUS, true);
    }

    fn read_data(&mut self) -> u8 {
        if !self.out_fifo.is_empty() {
            let data = self.out_fifo.pop();
            if self.out_fifo.is_empty() {
                self.send_status_byte();
            }
            return data;
        }
        self.status_byte
    }

    fn write_data(&mut self, value: u8, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        if !self.command.receiving && !self.command.received {
            self.command_set(value);
        } else if self.command.receiving {
            self.command_set_parameter(value);
        }
        if self.command.received {
            self.execute(irq, dma, mem);
        }
    }

    fn write_mask(&mut self, value: u8) {
        self.int_enabled = value & 0x02 != 0;
        self.dma_enabled = value & 0x01 != 0;
        self.status_register = R1_BUSY | R1_BUS | R1_REQ;
    }

    /// Dispatch a port write with access to the shared IRQ/DMA bus handle.
    /// Like the floppy controller, the HDC needs DMA access for Read/Write
    /// so it is special-cased rather than going through the plain `BusIO`
    /// trait (SPEC_FULL.md §9).
    pub fn write_port(&mut self, port: u16, value: u8, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        match port & 0x03 {
            PORT_WRITE_DATA => self.write_data(value, irq, dma, mem),
            PORT_RESET => self.reset(),
            PORT_WRITE_SELECT => {}
            PORT_WRITE_MASK => self.write_mask(value),
            _ => unreachable!(),
        }
    }

    pub fn read_port(&mut self, port: u16) -> u8 {
        match port & 0x03 {
            PORT_READ_DATA => self.read_data(),
            PORT_READ_STATUS => self.status_register,
            PORT_READ_DIP => self.dipswitch,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Geometry;

    struct FlatMem(Vec<u8>);
    impl BusMemory for FlatMem {
        fn read_byte(&self, addr: u32) -> u8 {
            self.0[addr as usize]
        }
        fn write_byte(&mut self, addr: u32, value: u8) {
            self.0[addr as usize] = value;
        }
    }

    struct NullIrq {
        raised: Vec<u8>,
    }
    impl IrqSink for NullIrq {
        fn raise_irq(&mut self, irq: u8) {
            self.raised.push(irq);
        }
        fn clear_irq(&mut self, _irq: u8) {}
    }

    /// Reports `terminal_count` after `limit` bytes, loopbacking every byte
    /// written so a read-then-write round trip can be checked.
    struct CountingDma {
        limit: u32,
        moved: u32,
        sunk: Vec<u8>,
    }
    impl DmaChannel for CountingDma {
        fn dma_read(&mut self, _channel: usize, _mem: &dyn BusMemory) -> u8 {
            self.moved += 1;
            0xAA
        }
        fn dma_write(&mut self, _channel: usize, value: u8, _mem: &mut dyn BusMemory) {
            self.moved += 1;
            self.sunk.push(value);
        }
        fn terminal_count(&self, _channel: usize) -> bool {
            self.moved >= self.limit
        }
        fn channel_ready(&self, _channel: usize) -> bool {
            true
        }
    }

    fn send_dcb(hdc: &mut Hdc, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory, cmd: u8, drive: usize, c: u16, h: u8, s: u8) {
        hdc.write_data(cmd, irq, dma, mem);
        let byte0 = ((drive as u8) << 5) | (h & 0x1F);
        let byte1 = (((c >> 2) & 0xC0) as u8) | (s & 0x3F);
        let byte2 = (c & 0xFF) as u8;
        hdc.write_data(byte0, irq, dma, mem);
        hdc.write_data(byte1, irq, dma, mem);
        hdc.write_data(byte2, irq, dma, mem);
        hdc.write_data(0, irq, dma, mem); // block count / interleave
        hdc.write_data(0, irq, dma, mem); // step / disable-retry
    }

    #[test]
    fn test_drive_reports_ok_and_status_byte() {
        let mut hdc = Hdc::new();
        let mut irq = NullIrq { raised: vec![] };
        let mut dma = CountingDma { limit: 0, moved: 0, sunk: vec![] };
        let mut mem = FlatMem(vec![0; 16]);

        send_dcb(&mut hdc, &mut irq, &mut dma, &mut mem, CMD_TEST_DRIVE, 0, 0, 0, 0);

        assert_eq!(hdc.read_data(), 0x00);
        assert_eq!(irq.raised, vec![HDC_IRQ]);
    }

    #[test]
    fn read_without_inserted_disk_reports_ready_signal_error() {
        let mut hdc = Hdc::new();
        let mut irq = NullIrq { raised: vec![] };
        let mut dma = CountingDma { limit: 0, moved: 0, sunk: vec![] };
        let mut mem = FlatMem(vec![0; 16]);

        send_dcb(&mut hdc, &mut irq, &mut dma, &mut mem, CMD_READ, 0, 0, 0, 0);

        let status = hdc.read_data();
        assert_eq!(status & 0x02, 0x02); // error flag set
    }

    #[test]
    fn read_transfers_drive_bytes_over_dma() {
        let mut hdc = Hdc::new();
        let mut irq = NullIrq { raised: vec![] };
        let mut mem = FlatMem(vec![0; 4096]);
        let geometry = Geometry::new(306, 4, 17);
        let mut backing = vec![0u8; geometry.total_bytes(512) as usize];
        backing[0] = 0xDE;
        backing[1] = 0xAD;
        hdc.insert_disk(0, geometry, backing);

        let mut dma = CountingDma { limit: 2, moved: 0, sunk: vec![] };
        send_dcb(&mut hdc, &mut irq, &mut dma, &mut mem, CMD_READ, 0, 0, 0, 0);

        assert_eq!(dma.sunk, vec![0xDE, 0xAD]);
        let status = hdc.read_data();
        assert_eq!(status & 0x02, 0); // no error
    }

    #[test]
    fn write_buffer_discards_dma_bytes_without_touching_drive() {
        let mut hdc = Hdc::new();
        let mut irq = NullIrq { raised: vec![] };
        let mut mem = FlatMem(vec![0; 16]);
        let geometry = Geometry::new(306, 4, 17);
        hdc.insert_disk(0, geometry, vec![0u8; geometry.total_bytes(512) as usize]);

        let mut dma = CountingDma { limit: 4, moved: 0, sunk: vec![] };
        send_dcb(&mut hdc, &mut irq, &mut dma, &mut mem, CMD_WRITE_BUFFER, 0, 0, 0, 0);

        assert_eq!(dma.moved, 4);
        assert_eq!(hdc.drives[0].read_byte(0), 0); // untouched
    }

    #[test]
    fn sense_reports_current_cylinder_and_head() {
        let mut hdc = Hdc::new();
        let mut irq = NullIrq { raised: vec![] };
        let mut dma = CountingDma { limit: 0, moved: 0, sunk: vec![] };
        let mut mem = FlatMem(vec![0; 16]);

        hdc.current_chs = Chs::new(12, 2, 5);
        send_dcb(&mut hdc, &mut irq, &mut dma, &mut mem, CMD_SENSE, 0, 0, 0, 0);

        assert_eq!(hdc.read_data(), ERROR_OK);
        assert_eq!(hdc.read_data(), 2); // head, drive 0
        assert_eq!(hdc.read_data(), 5); // sector, cylinder bits 0
        assert_eq!(hdc.read_data(), 12); // cylinder low byte
    }

    #[test]
    fn unknown_command_reports_invalid_command_error() {
        let mut hdc = Hdc::new();
        let mut irq = NullIrq { raised: vec![] };
        let mut dma = CountingDma { limit: 0, moved: 0, sunk: vec![] };
        let mut mem = FlatMem(vec![0; 16]);

        hdc.write_data(0x55, &mut irq, &mut dma, &mut mem);

        let status = hdc.read_data();
        assert_eq!(status & 0x02, 0x02);
    }
}
