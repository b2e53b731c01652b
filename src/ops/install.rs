//! Publishing built workloads to FireSim
//!
//! Installing writes a workload descriptor into the target's deploy
//! directory. The artifacts themselves stay where the build put them; the
//! descriptor points at them by absolute path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use marshal_workload::WorkloadConfig;
use serde::Serialize;
use tracing::info;

use super::{InstallError, Installer, UART_LOG};

/// Schema identifier written into every descriptor
pub const INSTALL_SCHEMA_ID: &str = "marshal/firesim-workload@1";

/// Writes FireSim workload descriptors.
#[derive(Debug, Clone, Default)]
pub struct FireSimInstaller {
    targets: BTreeMap<String, PathBuf>,
}

impl FireSimInstaller {
    /// `targets` maps target names to deploy directories.
    pub fn new(targets: BTreeMap<String, PathBuf>) -> Self {
        Self { targets }
    }

    fn target_dir(&self, target: &str) -> Result<&Path, InstallError> {
        self.targets
            .get(target)
            .map(PathBuf::as_path)
            .ok_or_else(|| InstallError::UnknownTarget {
                target: target.to_string(),
                known: self.targets.keys().cloned().collect::<Vec<_>>().join(", "),
            })
    }
}

#[derive(Debug, Serialize)]
struct Descriptor {
    schema_id: &'static str,
    benchmark_name: String,
    common_bootbinary: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    common_rootfs: Option<PathBuf>,
    common_simulation_outputs: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    workloads: Vec<JobEntry>,
}

#[derive(Debug, Serialize)]
struct JobEntry {
    name: String,
    bootbinary: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    rootfs: Option<PathBuf>,
    outputs: Vec<&'static str>,
}

/// Boot binary and root filesystem of `unit`, both checked to exist.
fn built_artifacts(unit: &WorkloadConfig) -> Result<(PathBuf, Option<PathBuf>), InstallError> {
    let not_built = |path: PathBuf| InstallError::NotBuilt {
        name: unit.name.clone(),
        path,
    };

    let boot = unit
        .boot_binary()
        .ok_or_else(|| not_built(unit.workdir.join(format!("{}-bin", unit.name))))?;
    if !boot.exists() {
        return Err(not_built(boot));
    }

    let rootfs = match (&unit.img, unit.nodisk) {
        (Some(img), false) if !img.exists() => return Err(not_built(img.clone())),
        (Some(img), false) => Some(img.clone()),
        _ => None,
    };
    Ok((boot, rootfs))
}

impl Installer for FireSimInstaller {
    fn install(&mut self, config: &WorkloadConfig, target: &str) -> Result<PathBuf, InstallError> {
        let dir = self.target_dir(target)?.to_path_buf();
        let (boot, rootfs) = built_artifacts(config)?;

        let workloads = config
            .jobs
            .values()
            .map(|job| {
                let (bootbinary, rootfs) = built_artifacts(job)?;
                Ok(JobEntry {
                    name: job.name.clone(),
                    bootbinary,
                    rootfs,
                    outputs: vec![UART_LOG],
                })
            })
            .collect::<Result<Vec<_>, InstallError>>()?;

        let descriptor = Descriptor {
            schema_id: INSTALL_SCHEMA_ID,
            benchmark_name: config.name.clone(),
            common_bootbinary: boot,
            common_rootfs: rootfs,
            common_simulation_outputs: vec![UART_LOG],
            workloads,
        };

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| InstallError::Io { path, source }
        };
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        let path = dir.join(format!("{}.json", config.name));
        let json = serde_json::to_string_pretty(&descriptor)
            .map_err(|e| InstallError::Io {
                path: path.clone(),
                source: e.into(),
            })?;
        fs::write(&path, json).map_err(io_err(&path))?;

        info!("Installed {} to {}", config.name, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshal_workload::{ConfigCatalog, SearchPath};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn lookup(dir: &Path, workload: Value) -> WorkloadConfig {
        fs::write(dir.join("a.json"), workload.to_string()).unwrap();
        let mut search = SearchPath::new();
        search.insert(dir);
        ConfigCatalog::load(&search, dir.join("images")).unwrap().lookup("a.json").unwrap()
    }

    fn installer(dir: &Path) -> FireSimInstaller {
        FireSimInstaller::new(BTreeMap::from([("firesim".to_string(), dir.join("deploy"))]))
    }

    #[test]
    fn test_writes_descriptor() {
        let dir = TempDir::new().unwrap();
        let config = lookup(dir.path(), json!({"bin": "a-bin", "img": "a.img", "jobs": [{"name": "j1", "bin": "j1-bin"}]}));
        for f in ["a-bin", "a.img", "j1-bin"] {
            fs::write(dir.path().join(f), b"x").unwrap();
        }

        let path = installer(dir.path()).install(&config, "firesim").unwrap();
        assert_eq!(path, dir.path().join("deploy/a.json"));

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["benchmark_name"], "a");
        assert_eq!(written["schema_id"], INSTALL_SCHEMA_ID);
        assert!(written["common_rootfs"].as_str().unwrap().ends_with("a.img"));
        assert_eq!(written["workloads"][0]["name"], "a-j1");
        assert_eq!(written["common_simulation_outputs"], json!(["uartlog"]));
    }

    #[test]
    fn test_nodisk_has_no_rootfs() {
        let dir = TempDir::new().unwrap();
        let mut config = lookup(dir.path(), json!({"bin": "a-bin", "img": "a.img"}));
        config.force_nodisk();
        fs::write(dir.path().join("a-bin-nodisk"), b"x").unwrap();

        let path = installer(dir.path()).install(&config, "firesim").unwrap();
        let written: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert!(written["common_bootbinary"].as_str().unwrap().ends_with("a-bin-nodisk"));
        assert!(written.get("common_rootfs").is_none());
    }

    #[test]
    fn test_unbuilt_workload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = lookup(dir.path(), json!({"bin": "a-bin"}));

        let err = installer(dir.path()).install(&config, "firesim").unwrap_err();
        assert!(matches!(err, InstallError::NotBuilt { .. }));
        assert!(!dir.path().join("deploy/a.json").exists());
    }

    #[test]
    fn test_unknown_target() {
        let dir = TempDir::new().unwrap();
        let config = lookup(dir.path(), json!({"bin": "a-bin"}));

        let err = installer(dir.path()).install(&config, "aws").unwrap_err();
        assert!(matches!(err, InstallError::UnknownTarget { ref known, .. } if known == "firesim"));
    }
}
