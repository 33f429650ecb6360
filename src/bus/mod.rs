//! Bus facade: the physical memory map, the ISA expansion bus, and the
//! capability traits devices use to reach the PIC/DMA without a back-pointer
//! into the machine.
//!
//! Submodules:
//! - `memory_map`: the 1 MiB physical address space and its region table
//! - `isa_bus`: card-slot pool and port I/O dispatch
//! - `traits`: `BusIO`/`BusMemory`/`IrqSink`/`DmaChannel` + `BusHandle`

pub mod isa_bus;
pub mod memory_map;
pub mod traits;

pub use isa_bus::IsaBus;
pub use memory_map::MemoryMap;
pub use traits::{BusHandle, BusIO, BusMemory, CpuBus, CpuCore, DmaChannel, IrqSink};
