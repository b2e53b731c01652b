//! Workload builds driven by the workload's own `build` command

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use marshal_workload::{nodisk_path, ConfigCatalog, WorkloadConfig};
use tracing::{debug, info};

use super::{BuildError, BuildTargets, Builder};

/// Runs `build` through `sh -c` in the workload directory.
///
/// The command learns what to produce from the environment:
/// `MARSHAL_NAME`, `MARSHAL_BIN`, `MARSHAL_DWARF`, `MARSHAL_IMG`,
/// `MARSHAL_NODISK`, `MARSHAL_BUILD_BIN` and `MARSHAL_BUILD_IMG`.
/// Base workloads are built first, once per builder.
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    shell: String,
    built: HashSet<PathBuf>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
            built: HashSet::new(),
        }
    }

    fn build_with_bases(
        &mut self,
        config: &WorkloadConfig,
        catalog: &ConfigCatalog,
        targets: BuildTargets,
        chain: &mut Vec<String>,
    ) -> Result<(), BuildError> {
        if let Some(base) = &config.base {
            if !chain.contains(base) {
                chain.push(base.clone());
                let base_config = catalog.lookup(base)?;
                if !self.built.contains(&base_config.source) {
                    self.build_with_bases(&base_config, catalog, targets, chain)?;
                }
            }
        }

        self.build_unit(config, targets)?;
        for job in config.jobs.values() {
            self.build_unit(job, targets)?;
        }
        self.built.insert(config.source.clone());
        Ok(())
    }

    fn build_unit(&self, unit: &WorkloadConfig, targets: BuildTargets) -> Result<(), BuildError> {
        if let Some(script) = &unit.build {
            info!("Building {}", unit.name);
            debug!("{}$ {}", unit.workdir.display(), script);

            let status = Command::new(&self.shell)
                .arg("-c")
                .arg(script)
                .current_dir(&unit.workdir)
                .envs(build_env(unit, targets))
                .status()
                .map_err(|source| BuildError::Spawn {
                    name: unit.name.clone(),
                    source,
                })?;

            if !status.success() {
                return Err(BuildError::Status {
                    name: unit.name.clone(),
                    code: status.code().unwrap_or(1),
                });
            }
        } else {
            debug!("{} has no build command; checking existing artifacts", unit.name);
        }

        for path in required_artifacts(unit, targets) {
            if !path.exists() {
                return Err(BuildError::MissingArtifact {
                    name: unit.name.clone(),
                    path,
                });
            }
        }
        Ok(())
    }
}

impl Builder for ScriptBuilder {
    fn build(
        &mut self,
        config: &WorkloadConfig,
        catalog: &ConfigCatalog,
        targets: BuildTargets,
    ) -> Result<(), BuildError> {
        self.build_with_bases(config, catalog, targets, &mut Vec::new())
    }
}

fn build_env(unit: &WorkloadConfig, targets: BuildTargets) -> Vec<(&'static str, String)> {
    let path = |p: &Option<PathBuf>| p.as_deref().map(display).unwrap_or_default();
    vec![
        ("MARSHAL_NAME", unit.name.clone()),
        ("MARSHAL_BIN", unit.boot_binary().as_deref().map(display).unwrap_or_default()),
        ("MARSHAL_DWARF", path(&unit.dwarf)),
        ("MARSHAL_IMG", path(&unit.img)),
        ("MARSHAL_NODISK", flag(unit.nodisk)),
        ("MARSHAL_BUILD_BIN", flag(targets.bin)),
        ("MARSHAL_BUILD_IMG", flag(targets.img)),
    ]
}

/// Artifacts that must exist once a unit is built.
fn required_artifacts(unit: &WorkloadConfig, targets: BuildTargets) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if targets.bin {
        if let Some(bin) = &unit.bin {
            paths.push(if unit.nodisk { nodisk_path(bin) } else { bin.clone() });
        }
    }
    if targets.img && !unit.nodisk {
        if let Some(img) = &unit.img {
            paths.push(img.clone());
        }
    }
    paths
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}
