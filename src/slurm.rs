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

//! SLURM job submission.
//!
//! A [SchedulerSpec] turns into the `sbatch` prefix that is placed in front
//! of the path of a generated script. Jobs are submitted with
//! `--dependency=singleton`, so SLURM runs one job of a given name at a time.
//!

use std::path::Path;

use serde::Deserialize;

use crate::Error;
use crate::flags::CommandLine;

pub const SBATCH: &str = "sbatch";

const fn default_num_nodes() -> u32 {
    1
}

/// Job submission parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerSpec {
    pub account: Option<String>,
    pub job_name: Option<String>,
    #[serde(default = "default_num_nodes")]
    pub num_nodes: u32,
    pub time: Option<String>,
    pub mem: Option<String>,
    pub tasks_per_node: Option<u32>,
}

impl Default for SchedulerSpec {
    fn default() -> Self {
        Self {
            account: None,
            job_name: None,
            num_nodes: default_num_nodes(),
            time: None,
            mem: None,
            tasks_per_node: None,
        }
    }
}

macro_rules! impl_string_setter {
    ($field:ident, $fn_name:ident) => {
        pub fn $fn_name<S: ToString>(mut self, $field: S) -> Self {
            self.$field = Some($field.to_string());
            self
        }
    };
}

impl SchedulerSpec {
    impl_string_setter!(account, with_account);
    impl_string_setter!(job_name, with_job_name);
    impl_string_setter!(time, with_time);
    impl_string_setter!(mem, with_mem);

    pub fn with_num_nodes(mut self, num_nodes: u32) -> Self {
        self.num_nodes = num_nodes;
        self
    }

    pub fn with_tasks_per_node(mut self, tasks_per_node: u32) -> Self {
        self.tasks_per_node = Some(tasks_per_node);
        self
    }

    /// Fill the fields that are unset in `self` from `other`.
    pub fn or(self, other: SchedulerSpec) -> SchedulerSpec {
        SchedulerSpec {
            account: self.account.or(other.account),
            job_name: self.job_name.or(other.job_name),
            num_nodes: self.num_nodes,
            time: self.time.or(other.time),
            mem: self.mem.or(other.mem),
            tasks_per_node: self.tasks_per_node.or(other.tasks_per_node),
        }
    }

    /// Check that the fields are usable by `sbatch`.
    ///
    /// Account and time are required. Time must be in one of the SLURM time
    /// formats and memory must be a whole number with an optional unit.
    pub fn validate(&self) -> Result<(), Error> {
        match &self.account {
            None => return Err(Error::invalid_option("account", "required for SLURM submission")),
            Some(account) if account.trim().is_empty() => {
                return Err(Error::invalid_option("account", "must not be empty"))
            },
            Some(_) => {},
        }
        match &self.time {
            None => return Err(Error::invalid_option("time", "required for SLURM submission")),
            Some(time) if !is_slurm_time(time) => {
                return Err(Error::invalid_option("time", format!("'{}' is not a SLURM time limit", time)))
            },
            Some(_) => {},
        }
        if let Some(mem) = &self.mem {
            if !is_slurm_memory(mem) {
                return Err(Error::invalid_option("mem", format!("'{}' is not a SLURM memory size", mem)));
            }
        }
        if self.num_nodes == 0 {
            return Err(Error::invalid_option("num_nodes", "must be at least 1"));
        }
        if self.tasks_per_node == Some(0) {
            return Err(Error::invalid_option("tasks_per_node", "must be at least 1"));
        }
        if let Some(name) = &self.job_name {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(Error::invalid_option("job_name", format!("'{}' must be a single word", name)));
            }
        }
        Ok(())
    }

    /// Build the `sbatch` prefix.
    ///
    /// Node count, account and time are always present; job name, memory
    /// and tasks per node only when set.
    ///
    /// ## Usage
    ///
    /// ```rust
    /// use biolighthouse::SchedulerSpec;
    ///
    /// let spec = SchedulerSpec::default().with_account("abc").with_time("5:00").with_mem("2G");
    /// let prefix = spec.sbatch_prefix().unwrap();
    ///
    /// assert_eq!(prefix.to_string(), "sbatch --dependency=singleton --nodes=1 --account=abc --time=5:00 --mem=2G");
    /// ```
    ///
    pub fn sbatch_prefix(&self) -> Result<CommandLine, Error> {
        self.validate()?;

        fn push_arg<A: std::fmt::Display>(
            flag: &'static str,
            maybe_arg: &Option<A>,
            tokens: &mut Vec<String>,
        ) {
            if let Some(arg) = maybe_arg {
                tokens.push(format!("--{}={}", flag, arg));
            }
        }

        let mut tokens: Vec<String> = vec![SBATCH.to_string(), "--dependency=singleton".to_string()];
        tokens.push(format!("--nodes={}", self.num_nodes));
        push_arg("account", &self.account, &mut tokens);
        push_arg("time", &self.time, &mut tokens);
        push_arg("job-name", &self.job_name, &mut tokens);
        push_arg("mem", &self.mem, &mut tokens);
        push_arg("tasks-per-node", &self.tasks_per_node, &mut tokens);

        Ok(CommandLine::new(tokens))
    }

    /// Build the full submission command for `script`.
    ///
    /// `extra` is placed between the prefix and the script path.
    pub fn submit_command(
        &self,
        script: &Path,
        extra: &[String],
    ) -> Result<CommandLine, Error> {
        let mut tokens = self.sbatch_prefix()?.into_tokens();
        tokens.extend(extra.iter().cloned());
        tokens.push(script.to_string_lossy().to_string());
        Ok(CommandLine::new(tokens))
    }
}

fn is_number(x: &str) -> bool {
    !x.is_empty() && x.chars().all(|c| c.is_ascii_digit())
}

/// Accepts `M`, `M:S`, `H:M:S`, `D-H`, `D-H:M` and `D-H:M:S`.
pub fn is_slurm_time(time: &str) -> bool {
    if time == "UNLIMITED" || time == "INFINITE" {
        return true;
    }
    let clock = match time.split_once('-') {
        Some((days, clock)) => {
            if !is_number(days) {
                return false;
            }
            clock
        },
        None => time,
    };
    let fields: Vec<&str> = clock.split(':').collect();
    (1..=3).contains(&fields.len()) && fields.iter().all(|x| is_number(x))
}

/// Accepts a whole number with an optional `K`, `M`, `G` or `T` unit.
pub fn is_slurm_memory(mem: &str) -> bool {
    let digits = match mem.chars().last() {
        Some('K' | 'M' | 'G' | 'T' | 'k' | 'm' | 'g' | 't') => &mem[..mem.len() - 1],
        _ => mem,
    };
    is_number(digits)
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn sbatch_prefix_all_fields() {
        use super::SchedulerSpec;

        let spec = SchedulerSpec {
            account: Some("abc".to_string()),
            time: Some("5:00".to_string()),
            tasks_per_node: Some(1),
            job_name: Some("bio".to_string()),
            mem: Some("2G".to_string()),
            num_nodes: 1,
        };
        let got = spec.sbatch_prefix().unwrap();

        assert_eq!(got.to_string(), "sbatch --dependency=singleton --nodes=1 --account=abc --time=5:00 --job-name=bio --mem=2G --tasks-per-node=1");
    }

    #[test]
    fn sbatch_prefix_omits_unset() {
        use super::SchedulerSpec;

        let spec = SchedulerSpec::default().with_account("def-lab").with_time("48:00").with_num_nodes(2);
        let got = spec.sbatch_prefix().unwrap();

        assert_eq!(got.tokens(), &["sbatch", "--dependency=singleton", "--nodes=2", "--account=def-lab", "--time=48:00"]);
    }

    #[test]
    fn submit_command_appends_script() {
        use super::SchedulerSpec;
        use std::path::Path;

        let spec = SchedulerSpec::default().with_account("abc").with_time("1-00:00:00").with_job_name("biolighthouse");
        let extra = vec!["--output=/data/DADA2/dada2_sample_inference.report".to_string()];
        let got = spec.submit_command(Path::new("/data/DADA2/dada2_sample_inference.sh"), &extra).unwrap();

        assert_eq!(got.to_string(), "sbatch --dependency=singleton --nodes=1 --account=abc --time=1-00:00:00 --job-name=biolighthouse --output=/data/DADA2/dada2_sample_inference.report /data/DADA2/dada2_sample_inference.sh");
    }

    #[test]
    fn validate_requires_account_and_time() {
        use super::SchedulerSpec;
        use crate::Error;

        let no_account = SchedulerSpec::default().with_time("5:00");
        let no_time = SchedulerSpec::default().with_account("abc");

        assert_eq!(no_account.sbatch_prefix(), Err(Error::invalid_option("account", "required for SLURM submission")));
        assert_eq!(no_time.sbatch_prefix(), Err(Error::invalid_option("time", "required for SLURM submission")));
    }

    #[test]
    fn validate_rejects_malformed_fields() {
        use super::SchedulerSpec;

        let base = SchedulerSpec::default().with_account("abc").with_time("5:00");

        assert!(base.clone().with_time("five minutes").validate().is_err());
        assert!(base.clone().with_time("1:2:3:4").validate().is_err());
        assert!(base.clone().with_mem("2GB").validate().is_err());
        assert!(base.clone().with_num_nodes(0).validate().is_err());
        assert!(base.clone().with_tasks_per_node(0).validate().is_err());
        assert!(base.clone().with_job_name("two words").validate().is_err());
        assert!(base.validate().is_ok());
    }

    #[test]
    fn slurm_time_formats() {
        use super::is_slurm_time;

        for ok in ["30", "5:00", "48:00", "12:00:00", "2-12", "2-12:30", "2-12:30:00", "UNLIMITED"] {
            assert!(is_slurm_time(ok), "{}", ok);
        }
        for bad in ["", ":", "5:", "a:00", "-5", "2-", "1-2:3:4:5"] {
            assert!(!is_slurm_time(bad), "{}", bad);
        }
    }

    #[test]
    fn slurm_memory_formats() {
        use super::is_slurm_memory;

        assert!(is_slurm_memory("2G"));
        assert!(is_slurm_memory("48G"));
        assert!(is_slurm_memory("4000"));
        assert!(is_slurm_memory("512m"));
        assert!(!is_slurm_memory("G"));
        assert!(!is_slurm_memory("2.5G"));
        assert!(!is_slurm_memory(""));
    }

    #[test]
    fn or_prefers_self() {
        use super::SchedulerSpec;

        let cli = SchedulerSpec::default().with_time("10:00");
        let file = SchedulerSpec::default().with_account("abc").with_time("5:00").with_mem("2G");
        let got = cli.or(file);

        assert_eq!(got.account.as_deref(), Some("abc"));
        assert_eq!(got.time.as_deref(), Some("10:00"));
        assert_eq!(got.mem.as_deref(), Some("2G"));
    }

    #[test]
    fn deserialize_from_toml() {
        use super::SchedulerSpec;

        let got: SchedulerSpec = toml::from_str("account = \"abc\"\ntime = \"5:00\"\ntasks_per_node = 1\njob_name = \"biolighthouse\"\nmem = \"2G\"\n").unwrap();

        assert_eq!(got, SchedulerSpec::default().with_account("abc").with_time("5:00").with_tasks_per_node(1).with_job_name("biolighthouse").with_mem("2G"));
    }
}
