//! Xebec hard disk drive: backing buffer and the controller's fixed
//! geometry table. Ported from `xebec_hdd.c`/`xebec_hdd.h` (SPEC_FULL.md
//! §3, §4.8).

use crate::util::Geometry;

/// `(geometry, label)` for every drive type the Xebec controller
/// recognizes. Index 0 is the "no drive" sentinel the original reserves at
/// `xebec_hdd_geometry[0]`.
pub const HDD_GEOMETRIES: &[(Geometry, &str)] = &[
    (Geometry { c: 0, h: 0, s: 0 }, "None"),
    (Geometry { c: 306, h: 4, s: 17 }, "10MB Type 1 (306 4 17)"),
    (Geometry { c: 612, h: 4, s: 17 }, "20MB Type 16 (612 4 17)"),
    (Geometry { c: 615, h: 4, s: 17 }, "20MB Type 2 (615 4 17)"),
    (Geometry { c: 306, h: 8, s: 17 }, "20MB Type 13 (306 8 17)"),
];

/// Match a geometry against the fixed drive table. Returns `None` for an
/// unrecognized geometry, mirroring the original's fall back to the "None"
/// entry when no drive type matches.
pub fn geometry_for_chs(geometry: Geometry) -> Option<Geometry> {
    HDD_GEOMETRIES
        .iter()
        .skip(1)
        .map(|(g, _)| *g)
        .find(|g| *g == geometry)
}

#[derive(Default)]
pub struct HardDrive {
    pub geometry: Option<Geometry>,
    buffer: Vec<u8>,
    pub inserted: bool,
    pub dirty: bool,
}

impl HardDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a VHD-backed image whose geometry already matches one of the
    /// controller's supported drive types. Returns `false`, leaving the
    /// drive untouched, if the geometry is unrecognized.
    pub fn insert(&mut self, geometry: Geometry, buffer: Vec<u8>) -> bool {
        let Some(matched) = geometry_for_chs(geometry) else {
            return false;
        };
        self.geometry = Some(matched);
        self.buffer = buffer;
        self.inserted = true;
        self.dirty = false;
        true
    }

    pub fn eject(&mut self) {
        self.geometry = None;
        self.buffer.clear();
        self.inserted = false;
    }

    pub fn read_byte(&self, offset: u64) -> u8 {
        if !self.inserted {
            return 0xFF;
        }
        self.buffer
            .get(offset as usize)
            .copied()
            .unwrap_or(0xFF)
    }

    pub fn write_byte(&mut self, offset: u64, value: u8) {
        if !self.inserted {
            return;
        }
        if let Some(slot) = self.buffer.get_mut(offset as usize) {
            *slot = value;
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_geometry_inserts() {
        let mut hdd = HardDrive::new();
        let geom = Geometry::new(306, 4, 17);
        assert!(hdd.insert(geom, vec![0u8; geom.total_bytes(512) as usize]));
        assert!(hdd.inserted);
        assert_eq!(hdd.geometry, Some(geom));
    }

    #[test]
    fn unrecognized_geometry_is_rejected() {
        let mut hdd = HardDrive::new();
        assert!(!hdd.insert(Geometry::new(999, 1, 1), vec![0u8; 16]));
        assert!(!hdd.inserted);
    }

    #[test]
    fn read_past_end_returns_0xff() {
        let mut hdd = HardDrive::new();
        hdd.insert(Geometry::new(306, 4, 17), vec![0xAB; 4]);
        assert_eq!(hdd.read_byte(0), 0xAB);
        assert_eq!(hdd.read_byte(1_000_000), 0xFF);
    }

    #[test]
    fn write_sets_dirty() {
        let mut hdd = HardDrive::new();
        hdd.insert(Geometry::new(306, 4, 17), vec![0u8; 16]);
        hdd.write_byte(2, 0x42);
        assert_eq!(hdd.read_byte(2), 0x42);
        assert!(hdd.dirty);
    }
}
