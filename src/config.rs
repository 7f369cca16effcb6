// biolighthouse: Build and run cutadapt, flash2 and DADA2 jobs locally or on SLURM.
//
// Copyright 2019 Tanner Dowhy [tanner.dowhy@usask.ca].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//

//! Step files.
//!
//! A step file is a TOML document describing one tool invocation:
//!
//! ```toml
//! executable = "/opt/cutadapt/bin/cutadapt"
//! base_dir = "/scratch/run1"
//! input_files = "/scratch/run1/raw"
//! hpc = true
//!
//! [params]
//! primer = "CTACGGGGGGCAGCAG"
//! primer_r = "GGACTACCGGGGTATCT"
//! cores = 8
//!
//! [slurm]
//! account = "def-lab"
//! time = "2:00:00"
//! mem = "4G"
//! ```
//!

use std::path::Path;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::Error;
use crate::params::Value;
use crate::slurm::SchedulerSpec;

type E = Box<dyn std::error::Error>;

/// Everything needed to plan one step besides the tool itself.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    pub executable: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub input_files: Option<PathBuf>,
    #[serde(default)]
    pub hpc: bool,
    #[serde(default)]
    pub params: IndexMap<String, Value>,
    pub slurm: Option<SchedulerSpec>,
}

/// Values given on the command line, applied on top of a step file with
/// [StepConfig::merge_overrides].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub base_dir: Option<PathBuf>,
    pub executable: Option<PathBuf>,
    pub input_files: Option<PathBuf>,
    pub hpc: bool,
    /// `name=value` assignments.
    pub set: Vec<String>,
    /// Options with a dedicated argument, eg. `--primer`.
    pub params: Vec<(String, Value)>,
    pub account: Option<String>,
    pub job_name: Option<String>,
    pub num_nodes: Option<u32>,
    pub time: Option<String>,
    pub mem: Option<String>,
    pub tasks_per_node: Option<u32>,
}

impl Overrides {
    fn has_slurm(&self) -> bool {
        self.account.is_some() || self.job_name.is_some() || self.num_nodes.is_some()
            || self.time.is_some() || self.mem.is_some() || self.tasks_per_node.is_some()
    }
}

#[derive(Deserialize)]
struct Single {
    v: Value,
}

impl StepConfig {
    pub fn from_toml(
        contents: &str,
    ) -> Result<Self, E> {
        let config: StepConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Self, E> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read {}: {}", path.as_ref().display(), e))?;
        Self::from_toml(&contents)
    }

    /// The base directory, or the home directory if none was given.
    ///
    /// Falls back to the current directory when `HOME` is not set.
    pub fn base_dir(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// Set a parameter from a `name=value` assignment.
    ///
    /// The value is read as a TOML value, so `8` is an integer, `true` a
    /// boolean and `[20, 15]` a list. Anything that does not parse is kept
    /// as a string.
    ///
    /// ## Usage
    ///
    /// ```rust
    /// use biolighthouse::Value;
    /// use biolighthouse::config::StepConfig;
    ///
    /// let mut config = StepConfig::default();
    /// config.set_param("cores=8").unwrap();
    /// config.set_param("report=minimal").unwrap();
    ///
    /// assert_eq!(config.params.get("cores"), Some(&Value::Int(8)));
    /// assert_eq!(config.params.get("report"), Some(&Value::Str("minimal".to_string())));
    /// ```
    ///
    pub fn set_param(
        &mut self,
        assignment: &str,
    ) -> Result<(), Error> {
        let (name, raw) = assignment.split_once('=')
            .ok_or_else(|| Error::invalid_option(assignment, "expected name=value"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_option(assignment, "option name is empty"));
        }
        let raw = raw.trim();
        let value = match toml::from_str::<Single>(&format!("v = {}", raw)) {
            Ok(single) => single.v,
            Err(_) => Value::Str(raw.to_string()),
        };
        self.params.insert(name.to_string(), value);
        Ok(())
    }

    /// Apply command line `overrides`.
    ///
    /// Precedence, lowest first: values already in `self`, `set`
    /// assignments, dedicated `params`. `hpc` is enabled if either side
    /// enables it. SLURM fields are merged one by one, so a partial
    /// override keeps the other fields of the step file.
    ///
    /// ## Errors
    ///
    /// Returns [Error::InvalidOption] for a malformed `set` assignment.
    pub fn merge_overrides(
        &mut self,
        overrides: Overrides,
    ) -> Result<(), Error> {
        if overrides.base_dir.is_some() {
            self.base_dir = overrides.base_dir.clone();
        }
        if overrides.executable.is_some() {
            self.executable = overrides.executable.clone();
        }
        if overrides.input_files.is_some() {
            self.input_files = overrides.input_files.clone();
        }
        self.hpc |= overrides.hpc;

        for assignment in &overrides.set {
            self.set_param(assignment)?;
        }
        for (name, value) in &overrides.params {
            self.params.insert(name.clone(), value.clone());
        }

        if overrides.has_slurm() {
            let from_file = self.slurm.take().unwrap_or_default();
            let given = SchedulerSpec {
                account: overrides.account,
                job_name: overrides.job_name,
                num_nodes: overrides.num_nodes.unwrap_or(from_file.num_nodes),
                time: overrides.time,
                mem: overrides.mem,
                tasks_per_node: overrides.tasks_per_node,
            };
            self.slurm = Some(given.or(from_file));
        }
        Ok(())
    }
}
