//! Small, dependency-free building blocks shared by the chipset and disk
//! models: CHS/LBA conversion, a fixed-capacity ring buffer, and the VHD
//! fixed-disk container format.

pub mod chs;
pub mod ring_buffer;
pub mod vhd;

pub use chs::{Chs, Geometry};
pub use ring_buffer::RingBuffer;
