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

//! cutadapt in paired-end mode with primer permutations.

use std::path::Path;

use crate::Error;
use crate::flags::{always, build_command, if_set, if_true, unless_default, CommandLine, Flag, Rule, Table};
use crate::params::{opt, DefaultValue as D, Kind, OptionSpec, ParameterSet};
use crate::primers::{Primer, PrimerPermutation};
use crate::tools::{path_token, ReadPair};

pub const OPTIONS: &[OptionSpec] = &[
    opt("pypath", Kind::Path, D::Null),
    opt("primer", Kind::Str, D::Null),
    opt("primer_r", Kind::Str, D::Null),
    opt("front", Kind::Str, D::Null),
    opt("anywhere", Kind::Str, D::Null),
    opt("error_rate", Kind::Float, D::Float(0.1)),
    opt("no_indels", Kind::Bool, D::Bool(false)),
    opt("count", Kind::Int, D::Int(1)),
    opt("overlap", Kind::Int, D::Int(3)),
    opt("cores", Kind::Int, D::Int(1)),
    opt("match_read_wildcards", Kind::Bool, D::Bool(false)),
    opt("no_match_adapter_wildcards", Kind::Bool, D::Bool(false)),
    opt("action", Kind::Str, D::Str("trim")).choices(&["trim", "mask", "none"]),
    opt("length", Kind::List, D::Null),
    opt("nextseq_trim", Kind::Str, D::Null),
    opt("quality_cutoff", Kind::List, D::Null),
    opt("quality_base", Kind::Str, D::Str("33")),
    opt("read_length", Kind::Int, D::Null),
    opt("trim_n", Kind::Bool, D::Bool(false)),
    opt("length_tag", Kind::Str, D::Null),
    opt("strip_suffix", Kind::Str, D::Null),
    opt("prefix", Kind::Str, D::Null),
    opt("suffix", Kind::Str, D::Null),
    opt("minimum_length", Kind::Int, D::Int(0)),
    opt("maximum_length", Kind::Int, D::Null),
    opt("max_n", Kind::Float, D::Null),
    opt("discard_trimmed", Kind::Bool, D::Bool(false)),
    opt("discard_untrimmed", Kind::Bool, D::Bool(false)),
    opt("discard_casava", Kind::Bool, D::Bool(false)),
    opt("report", Kind::Str, D::Str("full")),
    opt("wildcard_file", Kind::Path, D::Null),
    opt("too_short_output", Kind::Path, D::Null),
    opt("too_long_output", Kind::Path, D::Null),
    opt("untrimmed_output", Kind::Path, D::Null),
    opt("colorspace", Kind::Bool, D::Bool(false)),
    opt("double_encode", Kind::Bool, D::Bool(false)),
    opt("trim_primer", Kind::Bool, D::Bool(false)),
    opt("strip_f3", Kind::Bool, D::Bool(false)),
    opt("maq", Kind::Bool, D::Bool(false)),
    opt("bwa", Kind::Bool, D::Bool(false)),
    opt("zero_cap", Kind::Bool, D::Bool(false)),
    opt("no_zero_cap", Kind::Bool, D::Bool(false)),
    opt("front_r", Kind::Str, D::Null),
    opt("anywhere_r", Kind::Str, D::Null),
    opt("length_r", Kind::Int, D::Null),
    opt("pair_filter", Kind::Str, D::Str("any")).choices(&["any", "both", "first"]),
    opt("interleaved", Kind::Bool, D::Bool(false)),
    opt("untrimmed_paired_output", Kind::Path, D::Null),
    opt("too_short_paired_output", Kind::Path, D::Null),
    opt("too_long_paired_output", Kind::Path, D::Null),
];

// pypath, primer, primer_r, length, length_r, read_length and the colorspace
// options are accepted but never written.
pub const FLAGS: &[Flag] = &[
    always("count", Rule::Short("-n")),
    always("pair_filter", Rule::Long("--pair-filter")),
    always("quality_base", Rule::Long("--quality-base")),
    always("minimum_length", Rule::Short("-m")),
    always("cores", Rule::Short("-j")),
    unless_default("overlap", Rule::Short("-O")),
    unless_default("report", Rule::Long("--report")),
    unless_default("action", Rule::Long("--action")),
    unless_default("error_rate", Rule::Short("-e")),
    if_set("maximum_length", Rule::Short("-M")),
    if_true("no_indels", "--no-indels"),
    if_true("match_read_wildcards", "--match-read-wildcards"),
    if_true("no_match_adapter_wildcards", "--no-match-adapter-wildcards"),
    if_true("discard_trimmed", "--discard-trimmed"),
    if_true("discard_untrimmed", "--discard-untrimmed"),
    if_set("suffix", Rule::Short("-y")),
    if_true("discard_casava", "--discard-casava"),
    if_true("trim_n", "--trim-n"),
    if_set("max_n", Rule::Short("--max-n")),
    if_set("front", Rule::Short("-g")),
    if_set("anywhere", Rule::Short("-b")),
    if_set("front_r", Rule::Short("-G")),
    if_set("anywhere_r", Rule::Short("-B")),
    if_set("nextseq_trim", Rule::Long("--nextseq-trim")),
    if_set("quality_cutoff", Rule::Short("-q")),
    if_set("prefix", Rule::Short("-x")),
    if_set("strip_suffix", Rule::Short("--strip-suffix")),
    if_set("length_tag", Rule::Long("--length-tag")),
    if_set("wildcard_file", Rule::Long("--wildcard-file")),
    if_set("too_short_output", Rule::Long("--too-short-output")),
    if_set("too_long_output", Rule::Long("--too-long-output")),
    if_set("untrimmed_output", Rule::Long("--untrimmed-output")),
    if_set("untrimmed_paired_output", Rule::Long("--untrimmed-paired-output")),
    if_set("too_short_paired_output", Rule::Long("--too-short-paired-output")),
    if_set("too_long_paired_output", Rule::Long("--too-long-paired-output")),
    if_true("interleaved", "--interleaved"),
    if_true("zero_cap", "--zero-cap"),
    if_true("no_zero_cap", "--no-zero-cap"),
];

pub static TABLE: Table = Table { options: OPTIONS, flags: FLAGS };

/// The forward and reverse primer given in `params`.
///
/// ## Errors
///
/// Returns [Error::InvalidOption] if either primer is unset.
pub fn primers(
    params: &ParameterSet,
) -> Result<(Primer, Primer), Error> {
    let forward = params.str("primer").ok_or_else(|| Error::invalid_option("primer", "a forward primer is required"))?;
    let reverse = params.str("primer_r").ok_or_else(|| Error::invalid_option("primer_r", "a reverse primer is required"))?;
    Ok((Primer::forward(forward), Primer::reverse(reverse)))
}

/// Build the cutadapt command line for one read pair.
///
/// The line holds the flags from [TABLE], the four primer permutations, the
/// two inputs, the trimmed outputs under `work_dir/output` and a redirect of
/// the report to `work_dir/reports`.
pub fn pair_command(
    executable: &str,
    params: &ParameterSet,
    permutations: &[PrimerPermutation; 4],
    pair: &ReadPair,
    work_dir: &Path,
) -> Result<CommandLine, Error> {
    let mut tokens = build_command(executable, &TABLE, params)?.into_tokens();
    for permutation in permutations {
        tokens.extend(permutation.tokens());
    }

    let output_dir = work_dir.join("output");
    let report = work_dir.join("reports").join(format!("{}.report", pair.sample_name()));
    tokens.push(path_token(&pair.forward));
    tokens.push(path_token(&pair.reverse));
    tokens.push("-o".to_string());
    tokens.push(path_token(&output_dir.join(format!("{}.fastq.gz", pair.forward_stem()))));
    tokens.push("-p".to_string());
    tokens.push(path_token(&output_dir.join(format!("{}.fastq.gz", pair.reverse_stem()))));
    tokens.push(">".to_string());
    tokens.push(path_token(&report));

    Ok(CommandLine::new(tokens))
}
