//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Board support directory; its `base-workloads` is always searched first
    pub board_dir: String,

    /// Where derived boot binaries live
    pub image_dir: String,

    /// Batch and per-run logs
    pub log_dir: String,

    /// Simulator output
    pub run_dir: String,

    /// Spike executable
    pub spike: String,

    /// QEMU executable
    pub qemu: String,

    /// Harts given to the simulator
    pub sim_cpus: u32,

    /// Simulated memory in MiB
    pub sim_mem_mib: u64,

    /// Simulator wall-clock limit in seconds (0 = none)
    pub run_timeout: u64,

    /// Install target used when `install` gets no `--target`
    pub default_target: String,

    /// Directory the default install target writes to
    pub default_target_dir: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            board_dir: "boards/default".to_string(),
            image_dir: "images".to_string(),
            log_dir: "logs".to_string(),
            run_dir: "runOutput".to_string(),
            spike: "spike".to_string(),
            qemu: "qemu-system-riscv64".to_string(),
            sim_cpus: 4,
            sim_mem_mib: 16 * 1024,
            run_timeout: 0,
            default_target: "firesim".to_string(),
            default_target_dir: "../../deploy/workloads".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "board-dir": self.board_dir,
            "workload-dirs": [],
            "image-dir": self.image_dir,
            "log-dir": self.log_dir,
            "run-dir": self.run_dir,
            "spike": self.spike,
            "qemu": self.qemu,
            "sim-cpus": self.sim_cpus,
            "sim-mem-mib": self.sim_mem_mib,
            "run-timeout": self.run_timeout,
            "werr": false,
            "default-target": self.default_target,
            "install-targets": {
                self.default_target.clone(): self.default_target_dir
            }
        })
    }
}
