#![doc = r#"
IBM PC/XT emulator core library.

This crate exposes the board-level emulator core for use by binaries and tests: a cycle-paced
machine loop driving the chipset that surrounded the 8088 in a 5150/5160-class PC, behind an
externally supplied CPU core.

Modules:
- bus: physical memory map, ISA bus, and the capability traits devices are wired through
- chipset: 8237 DMA, 8253 PIT, 8259 PIC, 8255 PPI, NMI mask register
- config: CLI argument parsing, INI file parsing, the resolved `MachineConfig`
- error: `ConfigError`/`DiskError` for the configuration and disk-loading surfaces
- fdc: NEC uPD765 floppy disk controller and floppy drive geometry/backing store
- hdc: Xebec hard disk controller and hard drive geometry/backing store
- keyboard: keyboard controller scancode queue and clock/enable line handling
- machine: board composition, clock pacing, and debug stepping
- util: CHS/LBA conversion, the ring buffer, and the VHD fixed-disk container format
- video: the shared 6845 CRTC core plus the MDA and CGA adapters that wrap it
"#]

pub mod bus;
pub mod chipset;
pub mod config;
pub mod error;
pub mod fdc;
pub mod hdc;
pub mod keyboard;
pub mod machine;
pub mod util;
pub mod video;

pub use machine::Machine;
