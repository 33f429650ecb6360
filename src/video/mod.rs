//! Display subsystem: the shared 6845 CRTC core plus the MDA and CGA
//! adapters that each wrap one. Ported from `crtc_6845.c`, `mda.c`,
//! `cga.c` (SPEC_FULL.md §4.9).

pub mod cga;
pub mod crtc;
pub mod mda;

pub use cga::Cga;
pub use crtc::Crtc6845;
pub use mda::Mda;
