//! The fixed-function chipset: DMA controller, interval timer, interrupt
//! controller, peripheral interface, and NMI mask register.

pub mod dma;
pub mod nmi;
pub mod pic;
pub mod pit;
pub mod ppi;

pub use dma::Dma8237;
pub use nmi::Nmi;
pub use pic::Pic8259;
pub use pit::Pit8253;
pub use ppi::Ppi8255;
