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

//! DADA2 sample inference through an R script.

use std::path::Path;

use crate::Error;
use crate::flags::{always, append_flags, literal, CommandLine, Flag, Rule, Table};
use crate::params::{opt, DefaultValue as D, Kind, OptionSpec, ParameterSet};
use crate::tools::{path_token, WORK_ROOT};

/// R script run by the step, expected in the work directory.
pub const SCRIPT: &str = "sample_inference.R";

/// Location of the R library of the managed environment, relative to the base directory.
pub const R_LIBRARY: &str = "conda/envs/biolighthouse/lib/R/library";

pub const OPTIONS: &[OptionSpec] = &[
    opt("reads", Kind::Path, D::Null).required(),
    opt("extension", Kind::Str, D::Str(".extendedFrags.fastq")),
    opt("trunc_len", Kind::Int, D::Int(0)),
    opt("nbases", Kind::Int, D::Int(1000000)),
    opt("output", Kind::Str, D::Null).required(),
    opt("random_seed", Kind::Int, D::Int(0)),
    opt("max_consist", Kind::Int, D::Int(10)),
];

// Positional arguments of the script. The extension argument is always
// `.extended`; `extension` is accepted but not passed on.
pub const FLAGS: &[Flag] = &[
    always("reads", Rule::Positional),
    literal(".extended"),
    always("trunc_len", Rule::Positional),
    literal(".extended"),
    always("random_seed", Rule::Positional),
    always("nbases", Rule::Positional),
    always("max_consist", Rule::Positional),
];

pub static TABLE: Table = Table { options: OPTIONS, flags: FLAGS };

/// Build the single DADA2 command line.
///
/// ## Errors
///
/// Returns [Error::InvalidOption] if the executable is empty or `params`
/// does not belong to [TABLE].
pub fn command(
    executable: &str,
    params: &ParameterSet,
    base_dir: &Path,
    work_dir: &Path,
) -> Result<CommandLine, Error> {
    if executable.is_empty() {
        return Err(Error::invalid_option("executable", "path is empty"));
    }
    let output = params.str("output")
        .ok_or_else(|| Error::invalid_option("output", "a value is required"))?;

    let mut tokens: Vec<String> = vec![
        executable.to_string(),
        path_token(&work_dir.join(SCRIPT)),
        path_token(&base_dir.join(WORK_ROOT).join(R_LIBRARY)),
    ];
    append_flags(&mut tokens, &TABLE, params)?;
    tokens.push(path_token(&work_dir.join(format!("{}.csv", output))));
    tokens.push(path_token(&work_dir.join(format!("{}.rds", output))));

    Ok(CommandLine::new(tokens))
}

/// The `--output` argument given to sbatch for the DADA2 job.
pub fn sbatch_output(
    work_dir: &Path,
) -> String {
    format!("--output={}", path_token(&work_dir.join("dada2_sample_inference.report")))
}
