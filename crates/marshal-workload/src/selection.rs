//! Which units of a workload a launch runs.

use serde::{Deserialize, Serialize};

use crate::WorkloadConfig;

/// Job selection for a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "jobs", rename_all = "lowercase")]
pub enum JobSelection {
    /// Launch the workload itself, no jobs
    None,
    /// Every job of the workload
    All,
    /// Specific jobs, as `<workload>-<job>`
    Explicit(Vec<String>),
}

impl JobSelection {
    /// Build a selection from the CLI flags.
    ///
    /// `all` wins over an explicit list; short job names are qualified with
    /// the workload name without checking that the job exists.
    pub fn from_flags(workload: &str, all: bool, jobs: &[String]) -> Self {
        if all {
            JobSelection::All
        } else if jobs.is_empty() {
            JobSelection::None
        } else {
            JobSelection::Explicit(jobs.iter().map(|job| format!("{}-{}", workload, job)).collect())
        }
    }

    /// Qualified job names this selection covers for `config`.
    ///
    /// `None` yields an empty list: only the default unit runs.
    pub fn expand(&self, config: &WorkloadConfig) -> Vec<String> {
        match self {
            JobSelection::None => Vec::new(),
            JobSelection::All => config.jobs.values().map(|job| job.name.clone()).collect(),
            JobSelection::Explicit(jobs) => jobs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn workload_with_jobs(jobs: &[&str]) -> WorkloadConfig {
        let mut config = WorkloadConfig {
            name: "a".to_string(),
            source: PathBuf::from("/wl/a.json"),
            workdir: PathBuf::from("/wl"),
            base: None,
            bin: None,
            dwarf: None,
            img: None,
            nodisk: false,
            build: None,
            spike_args: None,
            qemu_args: None,
            testing: None,
            jobs: Default::default(),
        };
        for job in jobs {
            let mut record = config.clone();
            record.name = config.qualified_job_name(job);
            config.jobs.insert(job.to_string(), record);
        }
        config
    }

    #[test]
    fn test_explicit_jobs_are_qualified() {
        let selection = JobSelection::from_flags("a", false, &["j1".to_string(), "j2".to_string()]);
        assert_eq!(
            selection,
            JobSelection::Explicit(vec!["a-j1".to_string(), "a-j2".to_string()])
        );
    }

    #[test]
    fn test_all_expands_to_every_job() {
        let config = workload_with_jobs(&["j1", "j2", "j3"]);
        let selection = JobSelection::from_flags("a", true, &[]);
        assert_eq!(selection.expand(&config), vec!["a-j1", "a-j2", "a-j3"]);
    }

    #[test]
    fn test_no_flags_is_none() {
        let config = workload_with_jobs(&["j1"]);
        let selection = JobSelection::from_flags("a", false, &[]);
        assert_eq!(selection, JobSelection::None);
        assert!(selection.expand(&config).is_empty());
    }
}
