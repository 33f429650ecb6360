//! VHD fixed-disk container: a 512-byte big-endian footer appended after the
//! raw sector data. Only the "fixed" disk type is modeled; dynamic/
//! differencing VHDs are out of scope.

use super::chs::Geometry;

pub const FOOTER_SIZE: usize = 512;
const COOKIE: u64 = 0x636F_6E65_6374_6978; // "conectix"
const FEATURE_RESERVED: u32 = 0x2;
const FORMAT_VERSION: u32 = 0x0001_0000;
const DATA_OFFSET_FIXED: u64 = 0xFFFF_FFFF_FFFF_FFFF;
const DISK_TYPE_FIXED: u32 = 0x2;
const CREATOR_APP: u32 = 0x544F_4D4F; // 'TOMO'
const CREATOR_VERSION: u32 = 0x0001_0000;
const HOST_OS_WINDOWS: u32 = 0x5769_326B; // 'Wi2K'
const SECTOR_SIZE: u64 = 512;

/// Errors while validating or interpreting a VHD footer.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VhdError {
    #[error("buffer too small to hold a VHD footer")]
    TooSmall,
    #[error("checksum mismatch")]
    BadChecksum,
    #[error("bad cookie")]
    BadCookie,
    #[error("unsupported disk type (only fixed VHDs are supported)")]
    UnsupportedDiskType,
    #[error("data offset is not the fixed-disk sentinel")]
    BadDataOffset,
    #[error("buffer size does not match the footer's embedded geometry")]
    SizeMismatch,
}

/// Build a zero-filled fixed VHD image (sector data + footer) for the given
/// geometry.
pub fn create(geometry: Geometry) -> Vec<u8> {
    let total_bytes = geometry.total_bytes(SECTOR_SIZE);
    let mut buf = vec![0u8; total_bytes as usize + FOOTER_SIZE];
    write_footer(&mut buf, geometry, total_bytes);
    buf
}

fn write_footer(buf: &mut [u8], geometry: Geometry, current_size: u64) {
    let footer_start = buf.len() - FOOTER_SIZE;
    let footer = &mut buf[footer_start..];

    footer[0x00..0x08].copy_from_slice(&COOKIE.to_be_bytes());
    footer[0x08..0x0C].copy_from_slice(&FEATURE_RESERVED.to_be_bytes());
    footer[0x0C..0x10].copy_from_slice(&FORMAT_VERSION.to_be_bytes());
    footer[0x10..0x18].copy_from_slice(&DATA_OFFSET_FIXED.to_be_bytes());
    footer[0x18..0x1C].copy_from_slice(&0u32.to_be_bytes()); // timestamp
    footer[0x1C..0x20].copy_from_slice(&CREATOR_APP.to_be_bytes());
    footer[0x20..0x24].copy_from_slice(&CREATOR_VERSION.to_be_bytes());
    footer[0x24..0x28].copy_from_slice(&HOST_OS_WINDOWS.to_be_bytes());
    footer[0x28..0x30].copy_from_slice(&current_size.to_be_bytes()); // original size
    footer[0x30..0x38].copy_from_slice(&current_size.to_be_bytes()); // current size
    footer[0x38..0x3A].copy_from_slice(&geometry.c.to_be_bytes());
    footer[0x3A] = geometry.h;
    footer[0x3B] = geometry.s;
    footer[0x3C..0x40].copy_from_slice(&DISK_TYPE_FIXED.to_be_bytes());
    footer[0x40..0x44].copy_from_slice(&0u32.to_be_bytes()); // checksum placeholder

    let checksum = calculate_checksum(footer);
    footer[0x40..0x44].copy_from_slice(&checksum.to_be_bytes());
}

/// Sum of every footer byte excluding the checksum field, bitwise-NOT'd.
fn calculate_checksum(footer: &[u8]) -> u32 {
    let mut sum: u32 = 0;
    for (i, &b) in footer.iter().enumerate() {
        if (0x40..0x44).contains(&i) {
            continue;
        }
        sum = sum.wrapping_add(b as u32);
    }
    !sum
}

/// Validate a buffer's trailing VHD footer.
pub fn verify(buf: &[u8]) -> Result<(), VhdError> {
    if buf.len() < FOOTER_SIZE {
        return Err(VhdError::TooSmall);
    }
    let footer = &buf[buf.len() - FOOTER_SIZE..];

    let stored_checksum = u32::from_be_bytes(footer[0x40..0x44].try_into().unwrap());
    if calculate_checksum(footer) != stored_checksum {
        return Err(VhdError::BadChecksum);
    }

    let cookie = u64::from_be_bytes(footer[0x00..0x08].try_into().unwrap());
    if cookie != COOKIE {
        return Err(VhdError::BadCookie);
    }

    let disk_type = u32::from_be_bytes(footer[0x3C..0x40].try_into().unwrap());
    if disk_type != DISK_TYPE_FIXED {
        return Err(VhdError::UnsupportedDiskType);
    }

    let data_offset = u64::from_be_bytes(footer[0x10..0x18].try_into().unwrap());
    if data_offset != DATA_OFFSET_FIXED {
        return Err(VhdError::BadDataOffset);
    }

    let geometry = geometry_of(footer);
    let expected_total = geometry.total_bytes(SECTOR_SIZE) + FOOTER_SIZE as u64;
    if buf.len() as u64 != expected_total {
        return Err(VhdError::SizeMismatch);
    }

    Ok(())
}

fn geometry_of(footer: &[u8]) -> Geometry {
    let c = u16::from_be_bytes(footer[0x38..0x3A].try_into().unwrap());
    Geometry::new(c, footer[0x3A], footer[0x3B])
}

/// Read the embedded geometry out of a validated VHD buffer.
pub fn geometry(buf: &[u8]) -> Geometry {
    geometry_of(&buf[buf.len() - FOOTER_SIZE..])
}

/// Read the embedded logical (sector-data-only) size out of a validated VHD
/// buffer.
pub fn file_size(buf: &[u8]) -> u64 {
    let footer = &buf[buf.len() - FOOTER_SIZE..];
    u64::from_be_bytes(footer[0x30..0x38].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_verify() {
        let g = Geometry::new(306, 4, 17);
        let buf = create(g);
        assert_eq!(buf.len() as u64, 306 * 4 * 17 * 512 + FOOTER_SIZE as u64);
        verify(&buf).expect("freshly created VHD should verify");
        assert_eq!(geometry(&buf), g);
        assert_eq!(file_size(&buf), g.total_bytes(512));
    }

    #[test]
    fn corruption_outside_checksum_invalidates() {
        let g = Geometry::new(40, 2, 9);
        let mut buf = create(g);
        let footer_start = buf.len() - FOOTER_SIZE;
        // flip a byte in the cookie field (well outside the checksum range)
        buf[footer_start] ^= 0xFF;
        assert!(verify(&buf).is_err());
    }

    #[test]
    fn checksum_is_stable_under_recompute() {
        let g = Geometry::new(615, 4, 17);
        let buf = create(g);
        let footer = &buf[buf.len() - FOOTER_SIZE..];
        let stored = u32::from_be_bytes(footer[0x40..0x44].try_into().unwrap());
        assert_eq!(calculate_checksum(footer), stored);
    }
}
