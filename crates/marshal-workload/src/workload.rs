//! Resolved workload descriptor.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Suffix appended to an artifact's file name for its no-disk variant.
const NODISK_SUFFIX: &str = "-nodisk";

/// Suffix appended to the boot binary's file name for its debug info.
const DWARF_SUFFIX: &str = "-dwarf";

/// Keys holding paths that are relative to the declaring workload file.
pub(crate) const PATH_KEYS: &[&str] = &["bin", "dwarf", "img"];

/// Test expectations attached to a workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestingSpec {
    /// Directory of reference output files
    pub ref_dir: PathBuf,

    /// Kill the simulator after this many seconds (0 = no limit)
    #[serde(default)]
    pub run_timeout: u64,

    /// Strip kernel timestamps from output before comparing
    #[serde(default)]
    pub strip: bool,
}

/// A workload after `base` inheritance and path resolution.
///
/// Instances are handed out by value from the catalog; mutating one never
/// affects the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadConfig {
    /// Workload name (jobs carry `<workload>-<job>`)
    pub name: String,

    /// Workload file this record was read from
    pub source: PathBuf,

    /// Directory of the workload file; build commands run here
    pub workdir: PathBuf,

    /// Workload file this one inherits from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    /// Boot binary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin: Option<PathBuf>,

    /// Boot binary debug info
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dwarf: Option<PathBuf>,

    /// Root filesystem image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img: Option<PathBuf>,

    /// Boot with the root filesystem embedded in the binary
    pub nodisk: bool,

    /// Host command producing the artifacts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spike_args: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub qemu_args: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub testing: Option<TestingSpec>,

    /// Jobs keyed by short name, in file order
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub jobs: IndexMap<String, WorkloadConfig>,
}

/// Shape of a workload file after inheritance has been applied.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawWorkload {
    bin: Option<PathBuf>,
    dwarf: Option<PathBuf>,
    img: Option<PathBuf>,
    #[serde(default)]
    nodisk: bool,
    build: Option<String>,
    spike_args: Option<String>,
    qemu_args: Option<String>,
    testing: Option<TestingSpec>,
}

impl WorkloadConfig {
    /// Decode a merged workload value.
    ///
    /// `image_dir` is where derived artifact paths live when the file does
    /// not name a `bin` of its own.
    pub(crate) fn from_value(
        name: &str,
        source: &Path,
        value: Value,
        image_dir: &Path,
    ) -> Result<Self, String> {
        let Value::Object(mut map) = value else {
            return Err("workload must be a JSON object".to_string());
        };
        let jobs = map.remove("jobs");

        let mut config = Self::from_object(name, source, Value::Object(map.clone()), image_dir)?;

        // Jobs inherit everything except the parent's artifacts and identity.
        for key in PATH_KEYS.iter().chain(["name", "base"].iter()) {
            map.remove(*key);
        }
        let inherited = Value::Object(map);

        if let Some(jobs) = jobs {
            let Value::Array(jobs) = jobs else {
                return Err("'jobs' must be an array".to_string());
            };
            for job in jobs {
                let job_name = job
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "every job needs a string 'name'".to_string())?
                    .to_string();
                if config.jobs.contains_key(&job_name) {
                    return Err(format!("duplicate job '{}'", job_name));
                }
                let merged = crate::deep_merge(inherited.clone(), job);
                let qualified = config.qualified_job_name(&job_name);
                let record = Self::from_object(&qualified, source, merged, image_dir)
                    .map_err(|e| format!("job '{}': {}", job_name, e))?;
                config.jobs.insert(job_name, record);
            }
        }

        Ok(config)
    }

    fn from_object(name: &str, source: &Path, value: Value, image_dir: &Path) -> Result<Self, String> {
        let raw: RawWorkload = serde_json::from_value(value).map_err(|e| e.to_string())?;

        let bin = raw
            .bin
            .unwrap_or_else(|| image_dir.join(format!("{}-bin", name)));
        let dwarf = raw.dwarf.unwrap_or_else(|| suffixed(&bin, DWARF_SUFFIX));
        let workdir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            name: name.to_string(),
            source: source.to_path_buf(),
            workdir,
            base: None,
            bin: Some(bin),
            dwarf: Some(dwarf),
            img: raw.img,
            nodisk: raw.nodisk,
            build: raw.build,
            spike_args: raw.spike_args,
            qemu_args: raw.qemu_args,
            testing: raw.testing,
            jobs: IndexMap::new(),
        })
    }

    /// `<workload>-<job>`
    pub fn qualified_job_name(&self, job: &str) -> String {
        format!("{}-{}", self.name, job)
    }

    /// Find a job by its qualified name.
    pub fn job(&self, qualified: &str) -> Option<&WorkloadConfig> {
        self.jobs.values().find(|job| job.name == qualified)
    }

    pub fn has_jobs(&self) -> bool {
        !self.jobs.is_empty()
    }

    /// Switch this workload and all of its jobs to no-disk mode.
    pub fn force_nodisk(&mut self) {
        self.nodisk = true;
        for job in self.jobs.values_mut() {
            job.nodisk = true;
        }
    }

    /// Binary that boots this workload in its current disk mode.
    pub fn boot_binary(&self) -> Option<PathBuf> {
        let bin = self.bin.as_deref()?;
        Some(if self.nodisk { nodisk_path(bin) } else { bin.to_path_buf() })
    }

    /// Every artifact path this workload can produce, in a stable order:
    /// `bin`, its no-disk variant, `dwarf`, its no-disk variant, `img`.
    ///
    /// Jobs are not included.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(bin) = &self.bin {
            paths.push(bin.clone());
            paths.push(nodisk_path(bin));
        }
        if let Some(dwarf) = &self.dwarf {
            paths.push(dwarf.clone());
            paths.push(nodisk_path(dwarf));
        }
        if let Some(img) = &self.img {
            paths.push(img.clone());
        }
        paths
    }
}

/// No-disk variant of an artifact: same directory, file name + `-nodisk`.
pub fn nodisk_path(path: &Path) -> PathBuf {
    suffixed(path, NODISK_SUFFIX)
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> WorkloadConfig {
        WorkloadConfig::from_value("a", Path::new("/wl/a.json"), value, Path::new("/images")).unwrap()
    }

    #[test]
    fn test_nodisk_path_appends_suffix() {
        assert_eq!(nodisk_path(Path::new("/x/a.bin")), PathBuf::from("/x/a.bin-nodisk"));
    }

    #[test]
    fn test_derived_artifact_paths() {
        let config = decode(json!({}));
        assert_eq!(config.bin.as_deref(), Some(Path::new("/images/a-bin")));
        assert_eq!(config.dwarf.as_deref(), Some(Path::new("/images/a-bin-dwarf")));
        assert!(config.img.is_none());
        assert_eq!(config.workdir, PathBuf::from("/wl"));
    }

    #[test]
    fn test_jobs_inherit_parent_shape() {
        let config = decode(json!({
            "img": "/images/a.img",
            "nodisk": true,
            "build": "make",
            "jobs": [
                {"name": "j1"},
                {"name": "j2", "nodisk": false, "img": "/images/j2.img"}
            ]
        }));

        let keys: Vec<&str> = config.jobs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["j1", "j2"]);

        let j1 = &config.jobs["j1"];
        assert_eq!(j1.name, "a-j1");
        assert!(j1.nodisk);
        assert_eq!(j1.build.as_deref(), Some("make"));
        assert_eq!(j1.bin.as_deref(), Some(Path::new("/images/a-j1-bin")));
        assert!(j1.img.is_none(), "parent image is not inherited");
        assert!(j1.jobs.is_empty());

        let j2 = &config.jobs["j2"];
        assert!(!j2.nodisk);
        assert_eq!(j2.img.as_deref(), Some(Path::new("/images/j2.img")));
    }

    #[test]
    fn test_force_nodisk_covers_jobs_and_is_idempotent() {
        let mut config = decode(json!({"jobs": [{"name": "j1"}, {"name": "j2", "nodisk": false}]}));
        config.force_nodisk();
        config.force_nodisk();

        assert!(config.nodisk);
        assert!(config.jobs.values().all(|job| job.nodisk));
    }

    #[test]
    fn test_boot_binary_follows_disk_mode() {
        let mut config = decode(json!({"bin": "/x/a.bin"}));
        assert_eq!(config.boot_binary(), Some(PathBuf::from("/x/a.bin")));
        config.force_nodisk();
        assert_eq!(config.boot_binary(), Some(PathBuf::from("/x/a.bin-nodisk")));
    }

    #[test]
    fn test_artifacts_skip_absent_image() {
        let config = decode(json!({"bin": "/x/a.bin"}));
        assert_eq!(
            config.artifacts(),
            vec![
                PathBuf::from("/x/a.bin"),
                PathBuf::from("/x/a.bin-nodisk"),
                PathBuf::from("/x/a.bin-dwarf"),
                PathBuf::from("/x/a.bin-dwarf-nodisk"),
            ]
        );
    }

    #[test]
    fn test_job_lookup_by_qualified_name() {
        let config = decode(json!({"jobs": [{"name": "j1"}]}));
        assert!(config.job("a-j1").is_some());
        assert!(config.job("j1").is_none());
    }

    #[test]
    fn test_rejects_malformed_jobs() {
        let result = WorkloadConfig::from_value(
            "a",
            Path::new("/wl/a.json"),
            json!({"jobs": [{"nodisk": true}]}),
            Path::new("/images"),
        );
        assert!(result.unwrap_err().contains("name"));

        let result = WorkloadConfig::from_value(
            "a",
            Path::new("/wl/a.json"),
            json!({"jobs": [{"name": "j"}, {"name": "j"}]}),
            Path::new("/images"),
        );
        assert!(result.unwrap_err().contains("duplicate"));
    }
}
