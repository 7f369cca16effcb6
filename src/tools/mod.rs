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

//! Wrapped tools.
//!
//! Each submodule holds the option table and flag table of one tool, and the
//! function that assembles the complete command line for one invocation.
//!

// Tool specific implementations
pub mod cutadapt;
pub mod dada2;
pub mod flash2;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::flags::Table;

/// Directory under the base directory that holds all work directories.
pub const WORK_ROOT: &str = ".biolighthouse";

/// Supported tools.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Cutadapt,
    Flash2,
    Dada2,
}

impl Tool {
    /// Name of the binary searched for on PATH.
    pub fn exe_name(&self) -> &'static str {
        match self {
            Tool::Cutadapt => "cutadapt",
            Tool::Flash2 => "flash2",
            Tool::Dada2 => "Rscript",
        }
    }

    pub fn table(&self) -> &'static Table {
        match self {
            Tool::Cutadapt => &cutadapt::TABLE,
            Tool::Flash2 => &flash2::TABLE,
            Tool::Dada2 => &dada2::TABLE,
        }
    }

    /// Name of the work directory under [WORK_ROOT].
    pub fn work_dir_name(&self) -> &'static str {
        match self {
            Tool::Cutadapt => "primer_removal",
            Tool::Flash2 => "merge",
            Tool::Dada2 => "DADA2",
        }
    }

    pub fn work_dir(
        &self,
        base_dir: &Path,
    ) -> PathBuf {
        base_dir.join(WORK_ROOT).join(self.work_dir_name())
    }

    pub fn script_name(&self) -> &'static str {
        match self {
            Tool::Cutadapt => "primer_removal.sh",
            Tool::Flash2 => "merge.sh",
            Tool::Dada2 => "dada2_sample_inference.sh",
        }
    }

    /// Permissions of the generated script.
    pub fn script_mode(&self) -> u32 {
        match self {
            Tool::Cutadapt | Tool::Flash2 => 0o777,
            Tool::Dada2 => 0o700,
        }
    }

    /// True if the tool runs once per read pair and writes `output/` and `reports/`.
    pub fn is_paired(&self) -> bool {
        matches!(self, Tool::Cutadapt | Tool::Flash2)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Tool::Cutadapt => "cutadapt",
            Tool::Flash2 => "flash2",
            Tool::Dada2 => "dada2",
        };
        write!(f, "{}", name)
    }
}

/// Forward and reverse read files of one sample.
///
/// The reverse file is named like the forward file with `_R1` replaced by
/// `_R2`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReadPair {
    pub forward: PathBuf,
    pub reverse: PathBuf,
}

fn stem(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().replace(".fastq.gz", ""))
        .unwrap_or_default()
}

impl ReadPair {
    pub fn from_forward<P: AsRef<Path>>(path: P) -> Self {
        let forward = path.as_ref().to_path_buf();
        let reverse = match forward.file_name() {
            Some(name) => forward.with_file_name(name.to_string_lossy().replace("_R1", "_R2")),
            None => forward.clone(),
        };
        Self { forward, reverse }
    }

    /// Forward file name without `.fastq.gz`.
    pub fn forward_stem(&self) -> String {
        stem(&self.forward)
    }

    /// Reverse file name without `.fastq.gz`.
    pub fn reverse_stem(&self) -> String {
        stem(&self.reverse)
    }

    /// Forward stem without `_R1`.
    pub fn sample_name(&self) -> String {
        self.forward_stem().replace("_R1", "")
    }
}

pub(crate) fn path_token(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn read_pair_names() {
        use super::ReadPair;
        use std::path::PathBuf;

        let got = ReadPair::from_forward("/data/run_R1/S1_L001_R1_001.fastq.gz");

        assert_eq!(got.forward, PathBuf::from("/data/run_R1/S1_L001_R1_001.fastq.gz"));
        assert_eq!(got.reverse, PathBuf::from("/data/run_R1/S1_L001_R2_001.fastq.gz"));
        assert_eq!(got.forward_stem(), "S1_L001_R1_001");
        assert_eq!(got.reverse_stem(), "S1_L001_R2_001");
        assert_eq!(got.sample_name(), "S1_L001_001");
    }

    #[test]
    fn read_pair_keeps_other_extensions() {
        use super::ReadPair;

        let got = ReadPair::from_forward("merge/output/S2_R1.extendedFrags.fastq");
        assert_eq!(got.forward_stem(), "S2_R1.extendedFrags.fastq");
        assert_eq!(got.sample_name(), "S2.extendedFrags.fastq");
    }

    #[test]
    fn tool_display() {
        use super::Tool;

        assert_eq!(Tool::Cutadapt.to_string(), "cutadapt");
        assert_eq!(Tool::Flash2.to_string(), "flash2");
        assert_eq!(Tool::Dada2.to_string(), "dada2");
    }

    #[test]
    fn tool_layout() {
        use super::Tool;
        use std::path::{Path, PathBuf};

        assert_eq!(Tool::Cutadapt.work_dir(Path::new("/home/u")), PathBuf::from("/home/u/.biolighthouse/primer_removal"));
        assert_eq!(Tool::Flash2.work_dir(Path::new("/home/u")), PathBuf::from("/home/u/.biolighthouse/merge"));
        assert_eq!(Tool::Dada2.work_dir(Path::new("/home/u")), PathBuf::from("/home/u/.biolighthouse/DADA2"));
        assert_eq!(Tool::Cutadapt.script_mode(), 0o777);
        assert_eq!(Tool::Dada2.script_mode(), 0o700);
        assert_eq!(Tool::Dada2.exe_name(), "Rscript");
        assert!(!Tool::Dada2.is_paired());
    }
}
