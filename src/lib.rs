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

//! biolighthouse is a library and a command-line client for:
//!
//!   - Translating declarative tool parameters into command lines for
//!     [cutadapt](https://cutadapt.readthedocs.io),
//!     [FLASH2](https://github.com/dstreett/FLASH2) and the
//!     [DADA2](https://benjjneb.github.io/dada2/) sample inference script.
//!   - Generating the paired-end primer permutations that cutadapt needs to
//!     remove primers in either orientation.
//!   - Writing the command lines into a shell script and running it, either
//!     directly or by submitting it to [SLURM](https://slurm.schedmd.com)
//!     with `sbatch`.
//!
//! ## Usage
//!
//! ### Command line
//!
//! The biolighthouse CLI supports the following subcommands:
//!   - `biolighthouse cutadapt` remove primers and adapters from paired reads.
//!   - `biolighthouse flash2` merge paired reads.
//!   - `biolighthouse dada2` run DADA2 sample inference on merged reads.
//!   - `biolighthouse revcomp` print the reverse complement of sequences.
//!
//! Each tool subcommand reads an optional TOML step file (see
//! [config::StepConfig]) and accepts overrides on the command line. With
//! `--dry-run` the script and the launch command are printed instead of
//! being written and run.
//!
//! ### Rust API
//!
//! Command lines are built from static tables. Each wrapped tool declares
//! its options in a [Table](flags::Table): the [OptionSpec](params::OptionSpec)
//! rows give the type, default and allowed values of every option, and the
//! [Flag](flags::Flag) rows give the order, spelling and emission condition
//! of every flag. [build_command](flags::build_command) interprets a table
//! against a resolved [ParameterSet](params::ParameterSet).
//!
//! ```rust
//! use biolighthouse::flags::build_command;
//! use biolighthouse::params::Value;
//! use biolighthouse::tools::flash2;
//! use indexmap::IndexMap;
//!
//! let mut supplied: IndexMap<String, Value> = IndexMap::new();
//! supplied.insert("min_overlap".to_string(), Value::Int(15));
//! supplied.insert("compress".to_string(), Value::Bool(true));
//!
//! let params = flash2::TABLE.resolve(&supplied).unwrap();
//! let cmd = build_command("flash2", &flash2::TABLE, &params).unwrap();
//!
//! assert_eq!(cmd.to_string(), "flash2 -m 15 -z -p 33 -t 1");
//! ```
//!
//! Whole steps are planned with [runner::plan], which resolves the
//! executable, builds every command line, and returns a [runner::Job] that
//! can be written to disk and launched.
//!

use std::fmt;

pub mod config;
pub mod flags;
pub mod params;
pub mod primers;
pub mod runner;
pub mod script;
pub mod slurm;
pub mod tools;

pub use flags::CommandLine;
pub use params::ParameterSet;
pub use params::Value;
pub use slurm::SchedulerSpec;
pub use tools::Tool;

/// Errors raised while turning parameters into command lines.
///
/// All of these abort the step before any script is written or any process
/// is launched.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An option value does not match its declared type or allowed values.
    InvalidOption { name: String, reason: String },
    /// A primer contains a character outside of `ACGT`.
    InvalidSequence { sequence: String, position: usize, found: char },
    /// The primer input is not exactly a forward and a reverse record.
    InvalidInput(String),
    /// The executable could not be found.
    MissingExecutable(String),
}

impl Error {
    pub(crate) fn invalid_option<S: ToString, T: ToString>(name: S, reason: T) -> Self {
        Error::InvalidOption { name: name.to_string(), reason: reason.to_string() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidOption { name, reason } => write!(f, "invalid option `{}`: {}", name, reason),
            Error::InvalidSequence { sequence, position, found } => write!(
                f, "invalid base '{}' at position {} in sequence {}", found, position, sequence
            ),
            Error::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Error::MissingExecutable(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}
