//! Machine configuration: the CLI argument surface, INI file format, and
//! the resolved `MachineConfig` the two feed into. Ported from `args.c` and
//! `frontend/loadini/loadini.c` (SPEC_FULL.md §6).
//!
//! Submodules:
//! - `cli`: command-line argument parsing
//! - `ini`: INI file parsing
//!
//! Command-line arguments are parsed first, the INI file second, and the
//! command-line values win wherever both set the same field (SPEC_FULL.md
//! §6: "command-line finalizes override").

pub mod cli;
pub mod ini;

use crate::error::ConfigError;
use crate::util::Geometry;

/// Parse a numeric CLI/INI value, accepting decimal, `0x`/`x` hex, and
/// `0b`/`b` binary prefixes. Ported from `str_to_num` (`args.c`).
pub fn parse_number(flag: &str, text: &str) -> Result<u32, ConfigError> {
    let invalid = || ConfigError::InvalidNumber {
        flag: flag.to_string(),
        value: text.to_string(),
    };
    let parsed = if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(rest, 16)
    } else if let Some(rest) = text.strip_prefix('x').or_else(|| text.strip_prefix('X')) {
        u32::from_str_radix(rest, 16)
    } else if let Some(rest) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        u32::from_str_radix(rest, 2)
    } else if let Some(rest) = text.strip_prefix('b').or_else(|| text.strip_prefix('B')) {
        u32::from_str_radix(rest, 2)
    } else {
        text.parse::<u32>()
    };
    parsed.map_err(|_| invalid())
}

/// Video adapter selection (SPEC_FULL.md §6 `-v|-video`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoAdapter {
    #[default]
    Mda,
    Cga80,
    Cga40,
    None,
}

impl VideoAdapter {
    fn parse(text: &str) -> Result<Self, ConfigError> {
        match text.to_ascii_uppercase().as_str() {
            "MDA" => Ok(VideoAdapter::Mda),
            "CGA" | "CGA80" => Ok(VideoAdapter::Cga80),
            "CGA40" => Ok(VideoAdapter::Cga40),
            "NONE" => Ok(VideoAdapter::None),
            _ => Err(ConfigError::UnknownVideoAdapter(text.to_string())),
        }
    }
}

/// Motherboard generation (SPEC_FULL.md §6 `-model`).
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachineModel {
    #[default]
    Pc5150_16_64,
    Pc5150_64_256,
    Pc5160,
}

impl MachineModel {
    fn parse(text: &str) -> Result<Self, ConfigError> {
        match text {
            "5150_16_64" => Ok(MachineModel::Pc5150_16_64),
            "5150_64_256" => Ok(MachineModel::Pc5150_64_256),
            "5160" => Ok(MachineModel::Pc5160),
            _ => Err(ConfigError::UnknownModel(text.to_string())),
        }
    }
}

/// Inert display-subsystem enumerations, carried through config parsing so
/// a full INI round-trips without dropping fields (SPEC_FULL.md §6) even
/// though the display backend itself is out of scope for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureScaleMode {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayScaleMode {
    #[default]
    Fit,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayViewMode {
    #[default]
    Cropped,
    Full,
}

/// A floppy image to load at startup.
#[derive(Debug, Clone)]
pub struct DiskEntry {
    pub drive: u8,
    pub path: String,
    pub write_protect: bool,
}

/// A ROM image to load at a given physical offset.
#[derive(Debug, Clone)]
pub struct RomEntry {
    pub path: String,
    pub address: u32,
}

/// A hard disk image, with an optional explicit geometry override for
/// ambiguous image sizes (SPEC_FULL.md §4.8, `AmbiguousHddGeometry`).
#[derive(Debug, Clone)]
pub struct HddEntry {
    pub drive: u8,
    pub path: String,
    pub geometry: Option<Geometry>,
}

/// Inert display-subsystem settings, parsed so an INI file round-trips
/// (SPEC_FULL.md §6) but otherwise unused by this crate's machine core.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub texture_scale_mode: TextureScaleMode,
    pub display_scale_mode: DisplayScaleMode,
    pub display_view_mode: DisplayViewMode,
    pub correct_aspect_ratio: bool,
    pub emulate_max_scanline: bool,
    pub allow_display_disable: bool,
    pub delay_display_disable: bool,
    pub delay_display_disable_time: u64,
    pub mda_font: String,
    pub cga_font: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            texture_scale_mode: TextureScaleMode::default(),
            display_scale_mode: DisplayScaleMode::default(),
            display_view_mode: DisplayViewMode::default(),
            correct_aspect_ratio: true,
            emulate_max_scanline: true,
            allow_display_disable: true,
            delay_display_disable: true,
            delay_display_disable_time: 200,
            mda_font: "Bm437_IBM_MDA.FON".to_string(),
            cga_font: "Bm437_IBM_CGA.FON".to_string(),
        }
    }
}

/// The fully resolved machine configuration: defaults, overridden by the
/// INI file, overridden again by CLI arguments (SPEC_FULL.md §6).
#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub dbg_ui: bool,
    pub config_filename: String,
    pub model: MachineModel,
    pub video_adapter: VideoAdapter,
    pub conventional_ram_kib: u32,
    pub num_floppies: u8,
    pub sw1_override: Option<u8>,
    pub sw2_override: Option<u8>,
    pub sw1: u8,
    pub sw2: u8,
    pub roms: Vec<RomEntry>,
    pub disks: Vec<DiskEntry>,
    pub hdds: Vec<HddEntry>,
    pub display: DisplayConfig,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            dbg_ui: false,
            config_filename: "ibm_pc.ini".to_string(),
            model: MachineModel::default(),
            video_adapter: VideoAdapter::default(),
            conventional_ram_kib: 16 * 1024,
            num_floppies: 2,
            sw1_override: None,
            sw2_override: None,
            sw1: 0,
            sw2: 0,
            roms: Vec::new(),
            disks: Vec::new(),
            hdds: Vec::new(),
            display: DisplayConfig::default(),
        }
    }
}

/// Valid conventional RAM steps: by 16 KiB up to 64 KiB, then by 32 KiB
/// through 736 KiB (SPEC_FULL.md §6 `-r|-ram`).
pub fn is_valid_ram_size_kib(kib: u32) -> bool {
    let mut k = 16u32;
    while k <= 736 {
        if kib == k {
            return true;
        }
        k += if k < 64 { 16 } else { 32 };
    }
    false
}

/// A-D drive letter to floppy index, per `char_to_drive` (`args.c`).
pub fn drive_letter_to_index(letter: char) -> Result<u8, ConfigError> {
    match letter.to_ascii_uppercase() {
        'A' => Ok(0),
        'B' => Ok(1),
        'C' => Ok(2),
        'D' => Ok(3),
        other => Err(ConfigError::InvalidDriveLetter(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_accepts_all_prefixes() {
        assert_eq!(parse_number("-r", "64").unwrap(), 64);
        assert_eq!(parse_number("-r", "0x40").unwrap(), 0x40);
        assert_eq!(parse_number("-r", "x40").unwrap(), 0x40);
        assert_eq!(parse_number("-r", "0b1000").unwrap(), 0b1000);
        assert_eq!(parse_number("-r", "b1000").unwrap(), 0b1000);
    }

    #[test]
    fn parse_number_rejects_garbage() {
        assert!(parse_number("-r", "not-a-number").is_err());
    }

    #[test]
    fn ram_size_steps_match_spec() {
        assert!(is_valid_ram_size_kib(16));
        assert!(is_valid_ram_size_kib(64));
        assert!(is_valid_ram_size_kib(96));
        assert!(is_valid_ram_size_kib(736));
        assert!(!is_valid_ram_size_kib(17));
        assert!(!is_valid_ram_size_kib(768));
    }

    #[test]
    fn drive_letters_map_to_0_3() {
        assert_eq!(drive_letter_to_index('A').unwrap(), 0);
        assert_eq!(drive_letter_to_index('d').unwrap(), 3);
        assert!(drive_letter_to_index('E').is_err());
    }

    #[test]
    fn video_adapter_aliases_resolve() {
        assert_eq!(VideoAdapter::parse("cga").unwrap(), VideoAdapter::Cga80);
        assert_eq!(VideoAdapter::parse("CGA80").unwrap(), VideoAdapter::Cga80);
        assert_eq!(VideoAdapter::parse("cga40").unwrap(), VideoAdapter::Cga40);
        assert!(VideoAdapter::parse("EGA").is_err());
    }
}
