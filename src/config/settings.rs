//! Typed settings decoded from the effective configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Project config file looked up in the current directory
pub const PROJECT_CONFIG_FILE: &str = "marshal-config.toml";

/// Name of the builtin workload directory under the board directory
const BASE_WORKLOADS_DIR: &str = "base-workloads";

/// Settings for one invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MarshalConfig {
    pub board_dir: PathBuf,

    /// Extra workload directories, searched after the builtin one
    #[serde(default)]
    pub workload_dirs: Vec<PathBuf>,

    pub image_dir: PathBuf,
    pub log_dir: PathBuf,
    pub run_dir: PathBuf,

    pub spike: String,
    pub qemu: String,
    pub sim_cpus: u32,
    pub sim_mem_mib: u64,

    /// Seconds before a simulator is killed (0 = no limit)
    #[serde(default)]
    pub run_timeout: u64,

    /// Treat warnings as fatal
    #[serde(default)]
    pub werr: bool,

    pub default_target: String,

    /// Install target name -> directory that receives workload manifests
    #[serde(default)]
    pub install_targets: BTreeMap<String, PathBuf>,
}

impl MarshalConfig {
    /// Directory of workloads shipped with the board, lowest priority.
    pub fn builtin_workload_dir(&self) -> PathBuf {
        self.board_dir.join(BASE_WORKLOADS_DIR)
    }

    /// Make every relative directory absolute against `base`.
    pub fn anchored(mut self, base: &Path) -> Self {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        anchor(&mut self.board_dir);
        anchor(&mut self.image_dir);
        anchor(&mut self.log_dir);
        anchor(&mut self.run_dir);
        self.workload_dirs.iter_mut().for_each(anchor);
        self.install_targets.values_mut().for_each(anchor);
        self
    }
}

/// `~/.config/marshal/config.toml`, when a home directory is known.
pub fn default_user_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/marshal/config.toml"))
}
