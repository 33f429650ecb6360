//! NEC uPD765 floppy disk controller: command/execution/result phase
//! machine, DOR-driven drive motor/reset control, and the four-drive pool.
//! Ported from `fdc.c` (authoritative NEC uPD765 model; the older `fdc/fdc.c`
//! variant in the reference tree is not ported — SPEC_FULL.md §4.7).

pub mod fdd;

use crate::bus::traits::{BusMemory, DmaChannel, IrqSink};
use crate::util::chs::{chs_advance, chs_to_offset};
use crate::util::{Chs, Geometry, RingBuffer};
use fdd::FloppyDrive;

const MSR_FDC_BUSY: u8 = 0x10;
const MSR_DIO: u8 = 0x40;
const MSR_RQM: u8 = 0x80;

const DOR_FDD_SELECT_MASK: u8 = 0x03;
const DOR_ENABLE: u8 = 0x04;

const US_MASK: u8 = 0x03;

const ST0_AT: u8 = 0x40;
const ST0_RESET: u8 = 0xC0;
const ST0_SE: u8 = 0x20;
const ST0_NR: u8 = 0x08;
const ST0_HD: u8 = 0x04;
const ST0_NT: u8 = 0x00;

const ST1_NW: u8 = 0x02;
const ST1_ND: u8 = 0x04;
const ST1_MA: u8 = 0x01;

const ST3_HD: u8 = 0x04;
const ST3_TS: u8 = 0x08;
const ST3_T0: u8 = 0x10;
const ST3_RY: u8 = 0x20;
const ST3_WP: u8 = 0x40;

const CMD_READ_TRACK: u8 = 2;
const CMD_SPECIFY: u8 = 3;
const CMD_SENSE_DRIVE_STATUS: u8 = 4;
const CMD_WRITE_DATA: u8 = 5;
const CMD_READ_DATA: u8 = 6;
const CMD_RECALIBRATE: u8 = 7;
const CMD_SENSE_INTERRUPT: u8 = 8;
const CMD_READ_ID: u8 = 10;
const CMD_SEEK: u8 = 15;
const CMD_BYTE: u8 = 0x1F;

const FDC_DMA_CHANNEL: usize = 2;
const FDC_IRQ: u8 = 6;

fn decode_sector_size(n: u8) -> u64 {
    1u64 << (n as u32 + 7)
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

/// The controller proper: MSR/status registers, the four-drive pool, and
/// the command FIFO pair.
pub struct Fdc {
    pub drives: [FloppyDrive; 4],

    msr: u8,
    st0: u8,
    st1: u8,
    st3: u8,
    dor: u8,
    dma_enabled: bool,
    fdd_select: usize,
    chs: Chs,
    sector_size_code: u8,

    command: CommandState,
    in_fifo: RingBuffer,
    out_fifo: RingBuffer,
}

impl Default for Fdc {
    fn default() -> Self {
        Fdc {
            drives: [
                FloppyDrive::new(),
                FloppyDrive::new(),
                FloppyDrive::new(),
                FloppyDrive::new(),
            ],
            msr: 0,
            st0: 0,
            st1: 0,
            st3: 0,
            dor: 0,
            dma_enabled: true,
            fdd_select: 0,
            chs: Chs::default(),
            sector_size_code: 2,
            command: CommandState::default(),
            in_fifo: RingBuffer::with_capacity(16),
            out_fifo: RingBuffer::with_capacity(16),
        }
    }
}

impl Fdc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self, irq: &mut dyn IrqSink) {
        self.msr = 0;
        self.st0 = ST0_RESET;
        self.command = CommandState::default();
        self.in_fifo.clear();
        self.out_fifo.clear();
        self.receive_data();
        irq.raise_irq(FDC_IRQ);
    }

    pub fn insert_disk(&mut self, drive: usize, geometry: Geometry, buffer: Vec<u8>) {
        self.drives[drive].insert(geometry, buffer);
    }

    fn send_data(&mut self) {
        self.msr |= MSR_FDC_BUSY | MSR_DIO | MSR_RQM;
    }

    fn receive_data(&mut self) {
        self.msr &= !(MSR_FDC_BUSY | MSR_DIO);
        self.msr |= MSR_RQM;
    }

    fn set_st0(&mut self, ic: u8, se: u8) {
        self.st0 = ic & 0xC0;
        self.st0 |= self.fdd_select as u8 & US_MASK;
        if self.chs.h == 1 {
            self.st0 |= ST0_HD;
        }
        if !self.drives[self.fdd_select].ready {
            self.st0 |= ST0_NR;
        }
        if se != 0 {
            self.st0 |= ST0_SE;
        }
    }

    fn set_st1(&mut self) {
        self.st1 = 0;
        let drive = &self.drives[self.fdd_select];
        if drive.write_protect {
            self.st1 |= ST1_NW;
        }
        if !drive.ready {
            self.st1 |= ST1_ND | ST1_MA;
        }
    }

    fn set_st3(&mut self) {
        self.st3 = self.fdd_select as u8 & US_MASK;
        let drive = &self.drives[self.fdd_select];
        if self.chs.h == 1 {
            self.st3 |= ST3_HD;
        }
        if drive.heads() > 1 {
            self.st3 |= ST3_TS;
        }
        if self.chs.c == 0 {
            self.st3 |= ST3_T0;
        }
        if drive.ready {
            self.st3 |= ST3_RY;
        }
        if drive.write_protect {
            self.st3 |= ST3_WP;
        }
    }

    fn command_set(&mut self, command: u8) {
        self.command.byte = command;
        self.command.param_count = match command & CMD_BYTE {
            CMD_READ_DATA | CMD_READ_TRACK | CMD_WRITE_DATA => 8,
            CMD_READ_ID | CMD_RECALIBRATE | CMD_SENSE_DRIVE_STATUS => 1,
            CMD_SEEK | CMD_SPECIFY => 2,
            CMD_SENSE_INTERRUPT => 0,
            _ => 0,
        };
        if self.command.param_count == 0 {
            self.command.receiving = false;
            self.command.received = true;
        } else {
            self.command.receiving = true;
            self.command.received = false;
        }
    }

    fn command_set_parameter(&mut self, value: u8) {
        self.in_fifo.push(value);
        self.command.param_count -= 1;
        if self.command.param_count == 0 {
            self.command.receiving = false;
            self.command.received = true;
        }
    }

    fn command_finalize(&mut self, irq_sink: &mut dyn IrqSink, irq: bool, send: bool) {
        if irq {
            irq_sink.raise_irq(FDC_IRQ);
        }
        if send {
            self.send_data();
        } else {
            self.receive_data();
        }
    }

    fn command_reset(&mut self, irq_sink: &mut dyn IrqSink, irq: bool, send: bool) {
        self.command = CommandState::default();
        self.command_finalize(irq_sink, irq, send);
    }

    fn command_results(&mut self, irq_sink: &mut dyn IrqSink, ic: u8) {
        self.set_st0(ic, 0);
        self.set_st1();
        let st2 = 0u8;
        self.out_fifo.push(self.st0);
        self.out_fifo.push(self.st1);
        self.out_fifo.push(st2);
        self.out_fifo.push(self.chs.c as u8);
        self.out_fifo.push(self.chs.h);
        self.out_fifo.push(self.chs.s);
        self.out_fifo.push(self.sector_size_code);
        self.command_reset(irq_sink, true, true);
    }

    fn pop_param(&mut self) -> u8 {
        self.in_fifo.pop()
    }

    fn execute(&mut self, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        match self.command.byte & CMD_BYTE {
            CMD_SPECIFY => self.cmd_specify(irq),
            CMD_RECALIBRATE => self.cmd_recalibrate(irq),
            CMD_SEEK => self.cmd_seek(irq),
            CMD_SENSE_INTERRUPT => self.cmd_sense_interrupt(irq),
            CMD_SENSE_DRIVE_STATUS => self.cmd_sense_drive_status(irq),
            CMD_READ_ID => self.cmd_read_id(irq),
            CMD_READ_DATA => self.cmd_read_data(irq, dma, mem),
            CMD_WRITE_DATA => self.cmd_write_data(irq, dma, mem),
            _ => self.cmd_nop(irq),
        }
    }

    fn cmd_specify(&mut self, irq: &mut dyn IrqSink) {
        let _srt_hut = self.pop_param(); // SRT/HUT
        let hlt_nd = self.pop_param(); // HLT/ND
        self.dma_enabled = hlt_nd & 0x1 == 0;
        self.command_reset(irq, false, false);
    }

    fn cmd_recalibrate(&mut self, irq: &mut dyn IrqSink) {
        let dhs = self.pop_param();
        self.fdd_select = (dhs & US_MASK) as usize;
        self.chs.c = 0;
        self.set_st0(ST0_NT, 1);
        self.command_reset(irq, true, false);
    }

    fn cmd_seek(&mut self, irq: &mut dyn IrqSink) {
        let dhs = self.pop_param();
        let ncn = self.pop_param();
        self.fdd_select = (dhs & US_MASK) as usize;
        if (ncn as u16) < self.drives[self.fdd_select].cylinders() {
            self.chs.c = ncn as u16;
            self.set_st0(ST0_NT, 1);
        } else {
            self.set_st0(ST0_AT, 0);
        }
        self.command_reset(irq, true, false);
    }

    fn cmd_sense_interrupt(&mut self, irq: &mut dyn IrqSink) {
        self.out_fifo.push(self.st0);
        self.out_fifo.push(self.chs.c as u8);
        self.command_reset(irq, false, true);
    }

    fn cmd_sense_drive_status(&mut self, irq: &mut dyn IrqSink) {
        let dhs = self.pop_param();
        self.fdd_select = (dhs & US_MASK) as usize;
        self.set_st3();
        self.out_fifo.push(self.st3);
        self.command_reset(irq, false, true);
    }

    fn cmd_read_id(&mut self, irq: &mut dyn IrqSink) {
        let dhs = self.pop_param();
        self.fdd_select = (dhs & US_MASK) as usize;
        self.command_results(irq, ST0_NT);
        if let Some(geometry) = self.drives[self.fdd_select].geometry {
            chs_advance(geometry, &mut self.chs);
        }
    }

    fn cmd_nop(&mut self, irq: &mut dyn IrqSink) {
        self.out_fifo.push(ST0_AT | 0x80);
        self.command_reset(irq, false, true);
    }

    /// Params arrive in FIFO order (dhs, c, h, r, n, eot, gpl, dtl) and the
    /// ring buffer pops oldest-first, so reading them in that order matches
    /// the wire sequence directly.
    fn read_command_chs_params(&mut self) -> (u8, u8) {
        let dhs = self.pop_param();
        self.chs.c = self.pop_param() as u16;
        self.chs.h = self.pop_param();
        self.chs.s = self.pop_param();
        let n = self.pop_param();
        let eot = self.pop_param();
        let _gpl = self.pop_param();
        let _dtl = self.pop_param();
        self.sector_size_code = n;
        (dhs, eot)
    }

    fn cmd_read_data(&mut self, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        let (dhs, eot) = self.read_command_chs_params();
        self.fdd_select = (dhs & US_MASK) as usize;

        if !self.dma_enabled {
            log::debug!(target: "fdc", "read data: PIO mode not implemented");
            self.set_st0(ST0_AT, 0);
            self.command_results_with_current_status(irq);
            return;
        }

        if !self.drives[self.fdd_select].ready {
            self.set_st0(ST0_AT, 0);
            self.command_results_with_current_status(irq);
            return;
        }

        let sector_size = decode_sector_size(self.sector_size_code);
        let geometry = self.drives[self.fdd_select].geometry.unwrap_or(Geometry::new(0, 0, 0));

        while !dma.terminal_count(FDC_DMA_CHANNEL) && self.chs.s as u16 <= eot as u16 {
            let offset = chs_to_offset(geometry, self.chs, sector_size, 0);
            for i in 0..sector_size {
                if dma.terminal_count(FDC_DMA_CHANNEL) {
                    break;
                }
                let byte = self.drives[self.fdd_select].read_byte(offset as usize + i as usize);
                dma.dma_write(FDC_DMA_CHANNEL, byte, mem);
            }
            chs_advance(geometry, &mut self.chs);
        }

        self.command_results(irq, ST0_NT);
    }

    fn cmd_write_data(&mut self, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        let (dhs, eot) = self.read_command_chs_params();
        self.fdd_select = (dhs & US_MASK) as usize;

        if !self.drives[self.fdd_select].ready || self.drives[self.fdd_select].write_protect {
            self.set_st0(ST0_AT, 0);
            self.command_results_with_current_status(irq);
            return;
        }

        let sector_size = decode_sector_size(self.sector_size_code);
        let geometry = self.drives[self.fdd_select].geometry.unwrap_or(Geometry::new(0, 0, 0));

        while !dma.terminal_count(FDC_DMA_CHANNEL) && self.chs.s as u16 <= eot as u16 {
            let offset = chs_to_offset(geometry, self.chs, sector_size, 0);
            for i in 0..sector_size {
                if dma.terminal_count(FDC_DMA_CHANNEL) {
                    break;
                }
                let byte = dma.dma_read(FDC_DMA_CHANNEL, mem);
                self.drives[self.fdd_select].write_byte(offset as usize + i as usize, byte);
            }
            chs_advance(geometry, &mut self.chs);
        }

        self.command_results(irq, ST0_NT);
    }

    /// Like [`Fdc::command_results`] but preserves an ST0 already set by the
    /// caller (abnormal termination paths) instead of recomputing it.
    fn command_results_with_current_status(&mut self, irq_sink: &mut dyn IrqSink) {
        self.set_st1();
        let st2 = 0u8;
        self.out_fifo.push(self.st0);
        self.out_fifo.push(self.st1);
        self.out_fifo.push(st2);
        self.out_fifo.push(self.chs.c as u8);
        self.out_fifo.push(self.chs.h);
        self.out_fifo.push(self.chs.s);
        self.out_fifo.push(self.sector_size_code);
        self.command_reset(irq_sink, true, true);
    }

    fn write_data(&mut self, value: u8, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        if !self.command.receiving {
            self.command_set(value);
        } else {
            self.command_set_parameter(value);
        }
        if self.command.received {
            self.execute(irq, dma, mem);
        }
    }

    fn read_data(&mut self) -> u8 {
        let data = self.out_fifo.pop();
        if self.out_fifo.is_empty() {
            self.receive_data();
        }
        data
    }

    fn write_dor(&mut self, value: u8, irq: &mut dyn IrqSink) {
        let rising_enable = value & DOR_ENABLE != 0 && self.dor & DOR_ENABLE == 0;
        for i in 0..4 {
            self.drives[i].motor_on = (value >> (4 + i)) & 0x1 != 0;
            self.drives[i].ready = self.drives[i].motor_on && self.drives[i].inserted;
        }
        self.fdd_select = (value & DOR_FDD_SELECT_MASK) as usize;
        self.dor = value;
        if rising_enable {
            self.reset(irq);
        }
    }

    /// Dispatch a port write with access to the shared IRQ/DMA bus handle.
    /// Port I/O for the FDC needs the DMA channel for Read/Write Data, so it
    /// does not go through the plain `BusIO` trait the way simpler devices
    /// do (SPEC_FULL.md §9).
    pub fn write_port(&mut self, port: u16, value: u8, irq: &mut dyn IrqSink, dma: &mut dyn DmaChannel, mem: &mut dyn BusMemory) {
        match port & 0x07 {
            2 => self.write_dor(value, irq),
            5 => self.write_data(value, irq, dma, mem),
            _ => {}
        }
    }

    pub fn read_port(&mut self, port: u16) -> u8 {
        match port & 0x07 {
            4 => self.msr,
            5 => self.read_data(),
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

    struct NullIrq;
    impl IrqSink for NullIrq {
        fn raise_irq(&mut self, _irq: u8) {}
        fn clear_irq(&mut self, _irq: u8) {}
    }

    struct NullDma;
    impl DmaChannel for NullDma {
        fn dma_read(&mut self, _channel: usize, _mem: &dyn BusMemory) -> u8 {
            0
        }
        fn dma_write(&mut self, _channel: usize, _value: u8, _mem: &mut dyn BusMemory) {}
        fn terminal_count(&self, _channel: usize) -> bool {
            true
        }
        fn channel_ready(&self, _channel: usize) -> bool {
            true
        }
    }

    #[test]
    fn read_id_returns_current_chs_and_advances() {
        let mut fdc = Fdc::new();
        let mut irq = NullIrq;
        let mut dma = NullDma;
        let mut mem = FlatMem(vec![0; 16]);

        fdc.insert_disk(0, Geometry::new(40, 2, 9), vec![0; 368_640]);
        fdc.drives[0].motor_on = true;
        fdc.drives[0].ready = true;
        fdc.chs = Chs::new(0, 0, 9);

        fdc.write_data(CMD_READ_ID, &mut irq, &mut dma, &mut mem);
        fdc.write_data(0x00, &mut irq, &mut dma, &mut mem); // dhs: drive 0, head 0

        assert_eq!(fdc.read_data(), ST0_NT);
        assert_eq!(fdc.read_data(), 0); // ST1
        assert_eq!(fdc.read_data(), 0); // ST2
        assert_eq!(fdc.read_data(), 0); // C
        assert_eq!(fdc.read_data(), 0); // H
        assert_eq!(fdc.read_data(), 9); // R (sector before advance)
        assert_eq!(fdc.read_data(), 2); // N

        assert_eq!(fdc.chs, Chs::new(0, 1, 1));
    }

    #[test]
    fn sense_interrupt_reports_st0_and_pcn() {
        let mut fdc = Fdc::new();
        let mut irq = NullIrq;
        let mut dma = NullDma;
        let mut mem = FlatMem(vec![0; 16]);
        fdc.insert_disk(0, Geometry::new(40, 2, 9), vec![0; 368_640]);
        fdc.drives[0].motor_on = true;
        fdc.drives[0].ready = true;

        fdc.write_data(CMD_RECALIBRATE, &mut irq, &mut dma, &mut mem);
        fdc.write_data(0x00, &mut irq, &mut dma, &mut mem);

        fdc.write_data(CMD_SENSE_INTERRUPT, &mut irq, &mut dma, &mut mem);
        let st0 = fdc.read_data();
        assert_eq!(st0 & ST0_SE, ST0_SE);
        assert_eq!(fdc.read_data(), 0); // PCN after recalibrate
    }
}
