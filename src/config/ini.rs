//! INI file parsing. Ported from `loadini.c` (SPEC_FULL.md §6): `=`
//! key/value lines, `;`/`//` comments, optionally quoted string values,
//! and `key = [ field = value, field = value, … ]` struct values
//! (arrays of structs by repeating the key).

use super::{
    DiskEntry, DisplayConfig, DisplayScaleMode, DisplayViewMode, HddEntry, MachineConfig,
    MachineModel, RomEntry, TextureScaleMode, VideoAdapter,
};
use crate::error::ConfigError;
use crate::util::Geometry;

/// Parse an INI file's contents into `config`, overwriting only the
/// fields the file actually sets.
pub fn parse_ini(text: &str, config: &mut MachineConfig) -> Result<(), ConfigError> {
    let mut lines = text.lines().enumerate().peekable();
    while let Some((line_no, raw_line)) = lines.next() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let Some(eq) = line.find('=') else {
            return Err(ConfigError::IniSyntax {
                line: line_no + 1,
                message: "missing '=' on line".to_string(),
            });
        };
        let key = line[..eq].trim();
        let mut value = line[eq + 1..].trim().to_string();
        if key.is_empty() {
            return Err(ConfigError::IniSyntax {
                line: line_no + 1,
                message: "key is empty".to_string(),
            });
        }

        if value.starts_with('[') && !value.trim_end().ends_with(']') {
            // struct value spans multiple lines; accumulate until the closing bracket
            while let Some((_, more)) = lines.peek() {
                let more = strip_comment(more).trim();
                value.push(' ');
                value.push_str(more);
                lines.next();
                if more.ends_with(']') {
                    break;
                }
            }
        }

        apply_setting(key, &value, config)?;
    }
    Ok(())
}

fn strip_comment(line: &str) -> &str {
    if let Some(pos) = line.find("//") {
        return &line[..pos];
    }
    if let Some(pos) = line.find(';') {
        return &line[..pos];
    }
    line
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0] {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "t" | "T" | "true" | "TRUE" | "1")
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    super::parse_number(key, value)
}

/// Parse a `[ field = value, field = value, … ]` struct literal into
/// `(field, value)` pairs.
fn parse_struct_fields(value: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let trimmed = value.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| ConfigError::IniSyntax {
            line: 0,
            message: format!("expected '[ ... ]' struct value, got {value:?}"),
        })?;
    inner
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (field, field_value) = part.split_once('=').ok_or_else(|| ConfigError::IniSyntax {
                line: 0,
                message: format!("malformed struct field {part:?}"),
            })?;
            Ok((field.trim().to_string(), unquote(field_value.trim()).to_string()))
        })
        .collect()
}

fn apply_setting(key: &str, value: &str, config: &mut MachineConfig) -> Result<(), ConfigError> {
    match key {
        "dbg_ui" => config.dbg_ui = parse_bool(value),
        "model" => config.model = MachineModel::parse(unquote(value))?,
        "video_adapter" => config.video_adapter = VideoAdapter::parse(unquote(value))?,
        "conventional_ram" => config.conventional_ram_kib = parse_u32(key, value)?,
        "num_floppies" => config.num_floppies = parse_u32(key, value)? as u8,
        "sw1_override" => {
            let raw = parse_u32(key, value)? as u8;
            config.sw1_override = Some(raw);
            config.sw1 = raw;
        }
        "sw2_override" => {
            let raw = parse_u32(key, value)? as u8;
            config.sw2_override = Some(raw);
            config.sw2 = raw;
        }
        "sw1" => config.sw1 = parse_u32(key, value)? as u8,
        "sw2" => config.sw2 = parse_u32(key, value)? as u8,
        "disk" => config.disks.push(parse_disk(value)?),
        "rom" => config.roms.push(parse_rom(value)?),
        "hdd" => config.hdds.push(parse_hdd(value)?),
        "texture_scale_mode" => {
            config.display.texture_scale_mode = match unquote(value) {
                "Nearest" => TextureScaleMode::Nearest,
                "Linear" => TextureScaleMode::Linear,
                other => {
                    return Err(ConfigError::IniSyntax {
                        line: 0,
                        message: format!("unknown texture_scale_mode {other:?}"),
                    })
                }
            }
        }
        "display_scale_mode" => {
            config.display.display_scale_mode = match unquote(value) {
                "Fit" => DisplayScaleMode::Fit,
                "Stretch" => DisplayScaleMode::Stretch,
                other => {
                    return Err(ConfigError::IniSyntax {
                        line: 0,
                        message: format!("unknown display_scale_mode {other:?}"),
                    })
                }
            }
        }
        "display_view_mode" => {
            config.display.display_view_mode = match unquote(value) {
                "Cropped" => DisplayViewMode::Cropped,
                "Full" => DisplayViewMode::Full,
                other => {
                    return Err(ConfigError::IniSyntax {
                        line: 0,
                        message: format!("unknown display_view_mode {other:?}"),
                    })
                }
            }
        }
        "correct_aspect_ratio" => config.display.correct_aspect_ratio = parse_bool(value),
        "emulate_max_scanline" => config.display.emulate_max_scanline = parse_bool(value),
        "allow_display_disable" => config.display.allow_display_disable = parse_bool(value),
        "delay_display_disable" => config.display.delay_display_disable = parse_bool(value),
        "delay_display_disable_time" => {
            config.display.delay_display_disable_time = parse_u32(key, value)? as u64
        }
        "mda_font" => config.display.mda_font = unquote(value).to_string(),
        "cga_font" => config.display.cga_font = unquote(value).to_string(),
        _ => {
            return Err(ConfigError::IniSyntax {
                line: 0,
                message: format!("unknown setting key {key:?}"),
            })
        }
    }
    Ok(())
}

fn parse_disk(value: &str) -> Result<DiskEntry, ConfigError> {
    let mut entry = DiskEntry {
        drive: 0,
        path: String::new(),
        write_protect: false,
    };
    for (field, field_value) in parse_struct_fields(value)? {
        match field.as_str() {
            "path" => entry.path = field_value,
            "drive" => entry.drive = parse_u32("drive", &field_value)? as u8,
            "write_protect" => entry.write_protect = parse_bool(&field_value),
            _ => {}
        }
    }
    Ok(entry)
}

fn parse_rom(value: &str) -> Result<RomEntry, ConfigError> {
    let mut entry = RomEntry {
        path: String::new(),
        address: 0,
    };
    for (field, field_value) in parse_struct_fields(value)? {
        match field.as_str() {
            "path" => entry.path = field_value,
            "address" => entry.address = parse_u32("address", &field_value)?,
            _ => {}
        }
    }
    Ok(entry)
}

fn parse_hdd(value: &str) -> Result<HddEntry, ConfigError> {
    let mut entry = HddEntry {
        drive: 0,
        path: String::new(),
        geometry: None,
    };
    let mut chs = (0u16, 0u8, 0u8);
    for (field, field_value) in parse_struct_fields(value)? {
        match field.as_str() {
            "path" => entry.path = field_value,
            "drive" => entry.drive = parse_u32("drive", &field_value)? as u8,
            "geometry" => {
                let fields = parse_struct_fields(&field_value)?;
                for (gfield, gvalue) in fields {
                    match gfield.as_str() {
                        "c" => chs.0 = parse_u32("c", &gvalue)? as u16,
                        "h" => chs.1 = parse_u32("h", &gvalue)? as u8,
                        "s" => chs.2 = parse_u32("s", &gvalue)? as u8,
                        _ => {}
                    }
                }
                entry.geometry = Some(Geometry::new(chs.0, chs.1, chs.2));
            }
            _ => {}
        }
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let mut config = MachineConfig::default();
        parse_ini("; a comment\n\n// another\nnum_floppies = 3\n", &mut config).unwrap();
        assert_eq!(config.num_floppies, 3);
    }

    #[test]
    fn quoted_string_value_is_unwrapped() {
        let mut config = MachineConfig::default();
        parse_ini("video_adapter = \"CGA\"\n", &mut config).unwrap();
        assert_eq!(config.video_adapter, VideoAdapter::Cga80);
    }

    #[test]
    fn disk_struct_value_parses_fields() {
        let mut config = MachineConfig::default();
        parse_ini(
            "disk = [ path = boot.img, drive = 0, write_protect = 1 ]\n",
            &mut config,
        )
        .unwrap();
        assert_eq!(config.disks.len(), 1);
        assert_eq!(config.disks[0].path, "boot.img");
        assert!(config.disks[0].write_protect);
    }

    #[test]
    fn repeated_rom_key_accumulates_an_array() {
        let mut config = MachineConfig::default();
        parse_ini(
            "rom = [ path = bios.bin, address = 0xF0000 ]\nrom = [ path = basic.bin, address = 0xF6000 ]\n",
            &mut config,
        )
        .unwrap();
        assert_eq!(config.roms.len(), 2);
        assert_eq!(config.roms[1].address, 0xF6000);
    }

    #[test]
    fn hdd_nested_geometry_struct_parses() {
        let mut config = MachineConfig::default();
        parse_ini(
            "hdd = [ path = disk.vhd, drive = 0, geometry = [ c = 306, h = 4, s = 17 ] ]\n",
            &mut config,
        )
        .unwrap();
        assert_eq!(config.hdds[0].geometry, Some(Geometry::new(306, 4, 17)));
    }

    #[test]
    fn display_subsystem_keys_round_trip_without_error() {
        let mut config = MachineConfig::default();
        parse_ini(
            "mda_font = Bm437_IBM_MDA.FON\ndisplay_scale_mode = Stretch\n",
            &mut config,
        )
        .unwrap();
        assert_eq!(config.display.mda_font, "Bm437_IBM_MDA.FON");
        assert_eq!(config.display.display_scale_mode, DisplayScaleMode::Stretch);
    }

    #[test]
    fn missing_equals_is_a_syntax_error() {
        let mut config = MachineConfig::default();
        let err = parse_ini("garbage line\n", &mut config).unwrap_err();
        assert!(matches!(err, ConfigError::IniSyntax { .. }));
    }
}
