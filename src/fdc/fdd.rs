//! Floppy disk drive: backing buffer, insertion state, and the standard
//! PC floppy geometry table. Ported from `fdd.c`/`fdd.h` (SPEC_FULL.md §3, §4.7).

use crate::util::Geometry;

/// `(size_in_bytes, geometry)` for every floppy format the controller
/// recognizes, smallest first.
pub const FLOPPY_GEOMETRIES: &[(u32, Geometry)] = &[
    (163_840, Geometry { c: 40, h: 1, s: 8 }),
    (184_320, Geometry { c: 40, h: 1, s: 9 }),
    (327_680, Geometry { c: 40, h: 2, s: 8 }),
    (368_640, Geometry { c: 40, h: 2, s: 9 }),
    (737_280, Geometry { c: 80, h: 2, s: 9 }),
    (1_228_800, Geometry { c: 80, h: 2, s: 15 }),
    (1_474_560, Geometry { c: 80, h: 2, s: 18 }),
    (2_949_120, Geometry { c: 80, h: 2, s: 36 }),
];

pub fn geometry_for_size(size: u32) -> Option<Geometry> {
    FLOPPY_GEOMETRIES
        .iter()
        .find(|(sz, _)| *sz == size)
        .map(|(_, g)| *g)
}

#[derive(Default)]
pub struct FloppyDrive {
    pub geometry: Option<Geometry>,
    buffer: Vec<u8>,
    pub inserted: bool,
    pub motor_on: bool,
    pub ready: bool,
    pub write_protect: bool,
    pub dirty: bool,
}

impl FloppyDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, geometry: Geometry, buffer: Vec<u8>) {
        self.geometry = Some(geometry);
        self.buffer = buffer;
        self.inserted = true;
        self.dirty = false;
    }

    pub fn eject(&mut self) {
        self.geometry = None;
        self.buffer.clear();
        self.inserted = false;
        self.ready = false;
    }

    pub fn heads(&self) -> u8 {
        self.geometry.map(|g| g.h).unwrap_or(0)
    }

    pub fn cylinders(&self) -> u16 {
        self.geometry.map(|g| g.c).unwrap_or(0)
    }

    pub fn read_byte(&self, offset: usize) -> u8 {
        self.buffer.get(offset).copied().unwrap_or(0)
    }

    pub fn write_byte(&mut self, offset: usize, value: u8) {
        if let Some(slot) = self.buffer.get_mut(offset) {
            *slot = value;
            self.dirty = true;
        }
    }
}
