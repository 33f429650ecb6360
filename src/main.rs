//! CLI entry point. Ported from `main.c`/`args.c` (SPEC_FULL.md §6): parse
//! CLI arguments, layer an INI file underneath them, load ROM/disk/HDD
//! images, build a `Machine`, and run its frame loop. Host windowing, audio,
//! and the 8086 CPU core itself are external collaborators (SPEC_FULL.md
//! §1) — this binary wires a CPU core in through `machine::CpuCore` but does
//! not implement one.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use ibm_pc_core::bus::{BusMemory, CpuBus, CpuCore};
use ibm_pc_core::config::{self, MachineConfig};
use ibm_pc_core::machine::{self, DiskImage, HddImage, Machine, RomImage};

/// Stand-in for the 8086 core this crate assumes is supplied externally
/// (SPEC_FULL.md §1). It halts the machine on the first step rather than
/// silently looping forever, since there is no decoder behind it here.
struct UnimplementedCpu {
    cs: u16,
    ip: u16,
}

impl CpuCore for UnimplementedCpu {
    fn step(&mut self, _bus: &mut dyn CpuBus) -> u32 {
        panic!("no CPU core wired in: this binary links ibm_pc_core's chipset/machine layer only, the 8086 core itself is an external collaborator (SPEC_FULL.md §1)");
    }
    fn cs(&self) -> u16 {
        self.cs
    }
    fn ip(&self) -> u16 {
        self.ip
    }
    fn assert_intr(&mut self, _vector: u8) {}
    fn instruction_len_at(&self, _cs: u16, _ip: u16, _mem: &dyn BusMemory) -> u8 {
        1
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = MachineConfig::default();

    if let Err(err) = config::cli::parse_args(&args, &mut config) {
        log::error!(target: "main", "{err}");
        return ExitCode::FAILURE;
    }

    let ini_path = config.config_filename.clone();
    if Path::new(&ini_path).exists() {
        match fs::read_to_string(&ini_path) {
            Ok(text) => {
                if let Err(err) = config::ini::parse_ini(&text, &mut config) {
                    log::error!(target: "main", "{err}");
                    return ExitCode::FAILURE;
                }
            }
            Err(source) => {
                log::error!(target: "main", "could not read config file {ini_path:?}: {source}");
                return ExitCode::FAILURE;
            }
        }
        // Re-apply command-line arguments so they finalize-override the INI
        // file's values (SPEC_FULL.md §6).
        if let Err(err) = config::cli::parse_args(&args, &mut config) {
            log::error!(target: "main", "{err}");
            return ExitCode::FAILURE;
        }
    }

    let roms = match load_roms(&config) {
        Ok(roms) => roms,
        Err(err) => {
            log::error!(target: "main", "{err}");
            return ExitCode::FAILURE;
        }
    };
    let disks = match load_disks(&config) {
        Ok(disks) => disks,
        Err(err) => {
            log::error!(target: "main", "{err}");
            return ExitCode::FAILURE;
        }
    };
    let hdds = match load_hdds(&config) {
        Ok(hdds) => hdds,
        Err(err) => {
            log::error!(target: "main", "{err}");
            return ExitCode::FAILURE;
        }
    };

    let cpu = Box::new(UnimplementedCpu { cs: 0, ip: 0 });
    let mut machine = Machine::new(&config, cpu, roms, disks, hdds);
    machine.reset();

    log::info!(target: "main", "machine constructed; running frame loop (Ctrl+C to exit)");
    loop {
        machine.run_frame();
    }
}

fn load_roms(config: &MachineConfig) -> Result<Vec<RomImage>, ibm_pc_core::error::ConfigError> {
    config
        .roms
        .iter()
        .map(|entry| {
            let data = fs::read(&entry.path).map_err(|source| {
                ibm_pc_core::error::ConfigError::RomRead {
                    path: entry.path.clone().into(),
                    source,
                }
            })?;
            Ok(RomImage {
                address: entry.address,
                data,
            })
        })
        .collect()
}

fn load_disks(config: &MachineConfig) -> Result<Vec<DiskImage>, ibm_pc_core::error::DiskError> {
    config
        .disks
        .iter()
        .map(|entry| {
            let data = fs::read(&entry.path).map_err(|source| ibm_pc_core::error::DiskError::Read {
                path: entry.path.clone().into(),
                source,
            })?;
            let geometry = machine::resolve_floppy_geometry(&data)?;
            Ok(DiskImage {
                drive: entry.drive as usize,
                geometry,
                data,
                write_protect: entry.write_protect,
            })
        })
        .collect()
}

fn load_hdds(config: &MachineConfig) -> Result<Vec<HddImage>, ibm_pc_core::error::DiskError> {
    config
        .hdds
        .iter()
        .map(|entry| {
            let data = fs::read(&entry.path).map_err(|source| ibm_pc_core::error::DiskError::Read {
                path: entry.path.clone().into(),
                source,
            })?;
            let geometry = machine::resolve_hdd_geometry(&data, entry.geometry)?;
            Ok(HddImage {
                drive: entry.drive as usize,
                geometry,
                data,
            })
        })
        .collect()
}
