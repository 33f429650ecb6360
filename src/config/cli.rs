//! Command-line argument parsing. Ported from `args_parse_cli` (`args.c`,
//! SPEC_FULL.md §6).

use super::{drive_letter_to_index, is_valid_ram_size_kib, parse_number, DiskEntry, MachineConfig, MachineModel, RomEntry, VideoAdapter};
use crate::error::ConfigError;

/// Parse CLI arguments into `config`, in place, so later INI parsing (if
/// any) sees a config the caller can layer command-line overrides back
/// onto afterward (SPEC_FULL.md §6: command-line finalizes override).
pub fn parse_args(args: &[String], config: &mut MachineConfig) -> Result<(), ConfigError> {
    let mut pending_write_protect = false;
    let mut load_offset: u32 = 0;
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "-dbg" => {
                config.dbg_ui = true;
            }
            "-c" | "-config" => {
                i += 1;
                let value = next_value(args, i, arg)?;
                config.config_filename = value.to_string();
            }
            "-ds" | "-disks" => {
                i += 1;
                let value = next_value(args, i, arg)?;
                let count = parse_number(arg, value)?;
                if count > 4 {
                    return Err(ConfigError::InvalidDiskCount(count));
                }
                config.num_floppies = count as u8;
            }
            "-dwp" | "-disk-write-protect" => {
                pending_write_protect = true;
            }
            "-d" | "-disk" => {
                i += 1;
                let value = next_value(args, i, arg)?;
                let (drive, path) = split_drive_prefix(value, config.disks.len())?;
                config.disks.push(DiskEntry {
                    drive,
                    path: path.to_string(),
                    write_protect: pending_write_protect,
                });
                pending_write_protect = false;
            }
            "-v" | "-video" => {
                i += 1;
                let value = next_value(args, i, arg)?;
                config.video_adapter = VideoAdapter::parse(value)?;
            }
            "-r" | "-ram" => {
                i += 1;
                let value = next_value(args, i, arg)?;
                let ram = parse_number(arg, value)?;
                let kib = if ram >= 1024 && ram % 1024 == 0 {
                    ram / 1024
                } else {
                    ram
                };
                if !is_valid_ram_size_kib(kib) {
                    return Err(ConfigError::InvalidRamSize(kib));
                }
                config.conventional_ram_kib = kib * 1024;
            }
            "-sw1" => {
                i += 1;
                let value = next_value(args, i, arg)?;
                let sw1 = parse_number(arg, value)?;
                config.sw1 = !(sw1 as u8);
                config.sw1_override = Some(config.sw1);
            }
            "-sw2" => {
                i += 1;
                let value = next_value(args, i, arg)?;
                let sw2 = parse_number(arg, value)?;
                config.sw2 = !(sw2 as u8);
                config.sw2_override = Some(config.sw2);
            }
            "-model" => {
                i += 1;
                let value = next_value(args, i, arg)?;
                config.model = MachineModel::parse(value)?;
            }
            "-o" => {
                i += 1;
                let value = next_value(args, i, arg)?;
                load_offset = parse_number(arg, value)?;
            }
            "-?" => {
                print_usage();
                return Ok(());
            }
            _ if arg.len() == 2 && arg.as_bytes()[1] == b':' => {
                let drive = drive_letter_to_index(arg.as_bytes()[0] as char)?;
                i += 1;
                let path = next_value(args, i, arg)?;
                config.disks.push(DiskEntry {
                    drive,
                    path: path.to_string(),
                    write_protect: pending_write_protect,
                });
                pending_write_protect = false;
            }
            _ if arg.starts_with('-') => {
                return Err(ConfigError::UnknownFlag(arg.to_string()));
            }
            _ => {
                config.roms.push(RomEntry {
                    path: arg.to_string(),
                    address: load_offset,
                });
                // Advance the offset by this ROM's size so a following bare
                // path loads immediately after it; a missing file just
                // leaves the offset where it was, matching the reference's
                // silent `file_get_file_size` failure handling.
                if let Ok(metadata) = std::fs::metadata(arg) {
                    load_offset += metadata.len() as u32;
                }
            }
        }
        i += 1;
    }
    Ok(())
}

fn next_value<'a>(args: &'a [String], index: usize, flag: &str) -> Result<&'a str, ConfigError> {
    args.get(index)
        .map(|s| s.as_str())
        .ok_or_else(|| ConfigError::MissingValue {
            flag: flag.to_string(),
        })
}

/// Split an optional `[A-D]:` drive prefix off a `-disk` argument,
/// defaulting to the next free drive slot if absent.
fn split_drive_prefix(value: &str, default_index: usize) -> Result<(u8, &str), ConfigError> {
    if value.len() >= 2 && value.as_bytes()[1] == b':' {
        let drive = drive_letter_to_index(value.as_bytes()[0] as char)?;
        Ok((drive, &value[2..]))
    } else {
        Ok((default_index.min(3) as u8, value))
    }
}

fn print_usage() {
    println!(
        "ibm_pc [-c <config_file>] [-o <offset>] <rom_file> <extra_flags>\n\
         -c <config_file>           - Set config file.\n\
         -o <offset>                - Load offset of the next ROM.\n\
         <rom_file>                 - Load ROM at offset; inc offset by ROM size.\n\
         <A-D>:                     - Load next disk into drive A,B,C,D.\n\
         -disks <0-4>               - Amount of disk drives. 0-4.\n\
         -disk [A-D:]<disk_path>    - Load disk into drive A,B,C,D.\n\
         -disk-write-protect        - Write protect the next loaded disk.\n\
         -video <video_adapter>     - The video adapter to use: MDA, CGA, CGA40, CGA80, NONE.\n\
         -ram <ram>                 - Conventional RAM (16-64 by 16, or 64-736 by 32).\n\
         -sw1 <sw1>                 - Override sw1 setting.\n\
         -sw2 <sw2>                 - Override sw2 setting.\n\
         -model <model>             - Motherboard model: 5150_16_64, 5150_64_256, 5160.\n\
         -dbg                       - Display debug window.\n\
         # Numbers can be in decimal, hex or binary."
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn drive_letter_shortcut_inserts_disk() {
        let mut config = MachineConfig::default();
        parse_args(&args(&["A:", "boot.img"]), &mut config).unwrap();
        assert_eq!(config.disks.len(), 1);
        assert_eq!(config.disks[0].drive, 0);
        assert_eq!(config.disks[0].path, "boot.img");
    }

    #[test]
    fn write_protect_flag_applies_to_next_disk_only() {
        let mut config = MachineConfig::default();
        parse_args(
            &args(&["-dwp", "A:", "ro.img", "B:", "rw.img"]),
            &mut config,
        )
        .unwrap();
        assert!(config.disks[0].write_protect);
        assert!(!config.disks[1].write_protect);
    }

    #[test]
    fn sw1_value_is_inverted_before_storage() {
        let mut config = MachineConfig::default();
        parse_args(&args(&["-sw1", "0x0F"]), &mut config).unwrap();
        assert_eq!(config.sw1, !0x0Fu8);
        assert_eq!(config.sw1_override, Some(!0x0Fu8));
    }

    #[test]
    fn too_many_disks_is_rejected() {
        let mut config = MachineConfig::default();
        let err = parse_args(&args(&["-ds", "5"]), &mut config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDiskCount(5)));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let mut config = MachineConfig::default();
        let err = parse_args(&args(&["-bogus"]), &mut config).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFlag(_)));
    }

    #[test]
    fn video_adapter_flag_sets_config() {
        let mut config = MachineConfig::default();
        parse_args(&args(&["-video", "CGA40"]), &mut config).unwrap();
        assert_eq!(config.video_adapter, VideoAdapter::Cga40);
    }
}
