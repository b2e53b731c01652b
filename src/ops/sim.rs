//! Simulator launches (spike or QEMU)
//!
//! Each launched unit (the workload itself or one of its jobs) gets its own
//! directory under `<run-dir>/<name>-launch-<timestamp>/<unit>/` with the
//! simulator console captured in `uartlog`.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use marshal_workload::{JobSelection, WorkloadConfig};
use tracing::{debug, info, warn};

use super::{unique_dir, LaunchError, Launcher, Simulator};
use crate::config::MarshalConfig;
use crate::timeout::{effective_limit, TimeoutEnforcer};

/// Console capture file of every launched unit
pub const UART_LOG: &str = "uartlog";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Simulator settings taken from the tool configuration
#[derive(Debug, Clone)]
pub struct SimSettings {
    pub spike: String,
    pub qemu: String,
    pub cpus: u32,
    pub mem_mib: u64,
    pub run_dir: PathBuf,

    /// Default limit in seconds (0 = none)
    pub run_timeout: u64,
}

impl SimSettings {
    pub fn from_config(config: &MarshalConfig) -> Self {
        Self {
            spike: config.spike.clone(),
            qemu: config.qemu.clone(),
            cpus: config.sim_cpus,
            mem_mib: config.sim_mem_mib,
            run_dir: config.run_dir.clone(),
            run_timeout: config.run_timeout,
        }
    }
}

/// Launches workloads by spawning a local simulator per unit.
#[derive(Debug, Clone)]
pub struct SimLauncher {
    settings: SimSettings,
}

impl SimLauncher {
    pub fn new(settings: SimSettings) -> Self {
        Self { settings }
    }

    /// Program and arguments that boot `unit`.
    pub fn command_line(
        &self,
        unit: &WorkloadConfig,
        simulator: Simulator,
    ) -> Result<(String, Vec<String>), LaunchError> {
        let boot = unit
            .boot_binary()
            .ok_or_else(|| LaunchError::Failed(format!("'{}' has no boot binary", unit.name)))?;
        if !boot.exists() {
            return Err(LaunchError::Failed(format!(
                "boot binary {} does not exist; build '{}' first",
                boot.display(),
                unit.name
            )));
        }
        let disk = if unit.nodisk { None } else { unit.img.as_deref() };
        if let Some(img) = disk {
            if !img.exists() {
                return Err(LaunchError::Failed(format!(
                    "disk image {} does not exist; build '{}' first",
                    img.display(),
                    unit.name
                )));
            }
        }

        let s = &self.settings;
        match simulator {
            Simulator::Spike => {
                if disk.is_some() {
                    return Err(LaunchError::Failed(format!(
                        "spike cannot attach a disk image; launch '{}' in no-disk mode",
                        unit.name
                    )));
                }
                let mut args = vec![format!("-p{}", s.cpus), format!("-m{}", s.mem_mib)];
                args.extend(split_args(unit.spike_args.as_deref()));
                args.push(boot.to_string_lossy().into_owned());
                Ok((s.spike.clone(), args))
            }
            Simulator::Qemu => {
                let mut args: Vec<String> = [
                    "-nographic",
                    "-bios",
                    "none",
                    "-machine",
                    "virt",
                    "-object",
                    "rng-random,filename=/dev/urandom,id=rng0",
                    "-device",
                    "virtio-rng-device,rng=rng0",
                ]
                .iter()
                .map(|a| a.to_string())
                .collect();
                args.extend([
                    "-smp".to_string(),
                    s.cpus.to_string(),
                    "-m".to_string(),
                    format!("{}M", s.mem_mib),
                    "-kernel".to_string(),
                    boot.to_string_lossy().into_owned(),
                ]);
                if let Some(img) = disk {
                    args.extend([
                        "-device".to_string(),
                        "virtio-blk-device,drive=hd0".to_string(),
                        "-drive".to_string(),
                        format!("file={},format=raw,id=hd0", img.display()),
                    ]);
                }
                args.extend(split_args(unit.qemu_args.as_deref()));
                Ok((s.qemu.clone(), args))
            }
        }
    }

    fn run_unit(&self, unit: &WorkloadConfig, simulator: Simulator, out_dir: &Path) -> Result<(), LaunchError> {
        let (program, args) = self.command_line(unit, simulator)?;
        fs::create_dir_all(out_dir).map_err(|e| {
            LaunchError::Environment(format!("cannot create {}: {}", out_dir.display(), e))
        })?;

        let uart_path = out_dir.join(UART_LOG);
        let uart = File::create(&uart_path).map_err(|e| {
            LaunchError::Environment(format!("cannot create {}: {}", uart_path.display(), e))
        })?;
        let uart_err = uart
            .try_clone()
            .map_err(|e| LaunchError::Environment(format!("cannot duplicate uartlog handle: {}", e)))?;

        info!("Launching {} on {}", unit.name, simulator);
        debug!("{} {}", program, args.join(" "));

        let child = Command::new(&program)
            .args(&args)
            .current_dir(out_dir)
            .stdin(Stdio::null())
            .stdout(uart)
            .stderr(uart_err)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    LaunchError::Environment(format!("simulator '{}' not found", program))
                }
                _ => LaunchError::Environment(format!("failed to start '{}': {}", program, e)),
            })?;

        let limit = effective_limit(unit.testing.as_ref().map(|t| t.run_timeout), self.settings.run_timeout);
        wait_with_limit(child, TimeoutEnforcer::new(limit), &unit.name, &uart_path)
    }
}

impl Launcher for SimLauncher {
    fn launch(
        &mut self,
        config: &WorkloadConfig,
        jobs: &JobSelection,
        simulator: Simulator,
    ) -> Result<PathBuf, LaunchError> {
        let units: Vec<&WorkloadConfig> = match jobs.expand(config) {
            names if names.is_empty() => vec![config],
            names => names
                .iter()
                .map(|name| {
                    config.job(name).ok_or_else(|| {
                        LaunchError::Failed(format!("'{}' has no job named '{}'", config.name, name))
                    })
                })
                .collect::<Result<_, _>>()?,
        };

        let stamp = Utc::now().format("%Y-%m-%d--%H-%M-%S");
        let out = unique_dir(&self.settings.run_dir.join(format!("{}-launch-{}", config.name, stamp)));
        fs::create_dir_all(&out).map_err(|e| {
            LaunchError::Environment(format!("cannot create {}: {}", out.display(), e))
        })?;

        for unit in units {
            self.run_unit(unit, simulator, &out.join(&unit.name))?;
        }
        Ok(out)
    }
}

fn wait_with_limit(
    mut child: Child,
    enforcer: TimeoutEnforcer,
    name: &str,
    uart_path: &Path,
) -> Result<(), LaunchError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => return Ok(()),
            Ok(Some(status)) => {
                return Err(LaunchError::Failed(format!(
                    "simulation of '{}' exited with {} (see {})",
                    name,
                    status,
                    uart_path.display()
                )))
            }
            Ok(None) => {}
            Err(e) => {
                return Err(LaunchError::Failed(format!("lost track of simulator for '{}': {}", name, e)))
            }
        }

        if enforcer.check().is_timeout() {
            if let Err(e) = child.kill() {
                warn!("failed to kill simulator for {}: {}", name, e);
            }
            let _ = child.wait();
            let seconds = enforcer.limit().map(|l| l.as_secs()).unwrap_or_default();
            return Err(LaunchError::Failed(format!(
                "simulation of '{}' timed out after {}s (see {})",
                name,
                seconds,
                uart_path.display()
            )));
        }
        let pause = enforcer.remaining().map_or(POLL_INTERVAL, |left| left.min(POLL_INTERVAL));
        thread::sleep(pause);
    }
}

fn split_args(args: Option<&str>) -> impl Iterator<Item = String> + '_ {
    args.unwrap_or_default().split_whitespace().map(str::to_string)
}
