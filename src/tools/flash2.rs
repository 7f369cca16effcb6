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

//! flash2 read merging.

use crate::Error;
use crate::flags::{always, build_command, if_set, if_true, unless_default, when_equals, CommandLine, Flag, Rule, Table};
use crate::params::{opt, DefaultValue as D, Kind, OptionSpec, ParameterSet};
use crate::tools::{path_token, ReadPair};

pub const OPTIONS: &[OptionSpec] = &[
    opt("quality_cutoff", Kind::Int, D::Int(2)),
    opt("percent_cutoff", Kind::Int, D::Int(50)),
    opt("no_discard", Kind::Bool, D::Bool(false)),
    opt("compress", Kind::Bool, D::Bool(false)),
    opt("min_overlap", Kind::Int, D::Int(10)),
    opt("max_overlap", Kind::Int, D::Null),
    opt("min_overlap_outie", Kind::Int, D::Int(35)),
    opt("max_mismatch_density", Kind::Float, D::Float(0.25)),
    opt("allow_outies", Kind::Bool, D::Bool(false)),
    opt("phred_offset", Kind::Int, D::Int(33)).choices(&["33", "64"]),
    opt("read_len", Kind::Int, D::Int(100)),
    opt("fragment_len", Kind::Int, D::Int(180)),
    opt("fragment_len_stddev", Kind::Int, D::Int(18)),
    opt("threads", Kind::Int, D::Int(1)),
];

// The phred offset is written on either side of `-z` depending on its value.
pub const FLAGS: &[Flag] = &[
    unless_default("quality_cutoff", Rule::Short("-Q")),
    unless_default("percent_cutoff", Rule::Short("-C")),
    if_true("no_discard", "--no-discard"),
    unless_default("min_overlap", Rule::Short("-m")),
    if_set("max_overlap", Rule::Short("-M")),
    unless_default("min_overlap_outie", Rule::Short("-e")),
    unless_default("max_mismatch_density", Rule::Short("-X")),
    if_true("allow_outies", "--allow-outies"),
    when_equals("phred_offset", 64, Rule::Short("-p")),
    if_true("compress", "-z"),
    when_equals("phred_offset", 33, Rule::Short("-p")),
    unless_default("read_len", Rule::Short("-r")),
    unless_default("fragment_len", Rule::Short("-f")),
    unless_default("fragment_len_stddev", Rule::Short("-s")),
    always("threads", Rule::Short("-t")),
];

pub static TABLE: Table = Table { options: OPTIONS, flags: FLAGS };

/// Build the flash2 command line for one read pair.
///
/// Outputs and reports are relative to the work directory the script runs in.
pub fn pair_command(
    executable: &str,
    params: &ParameterSet,
    pair: &ReadPair,
) -> Result<CommandLine, Error> {
    let mut tokens = build_command(executable, &TABLE, params)?.into_tokens();
    let stem = pair.forward_stem();
    tokens.push(path_token(&pair.forward));
    tokens.push(path_token(&pair.reverse));
    tokens.push("-o".to_string());
    tokens.push(format!("output/{}", stem));
    tokens.push(">".to_string());
    tokens.push(format!("reports/{}.report", stem));
    Ok(CommandLine::new(tokens))
}
