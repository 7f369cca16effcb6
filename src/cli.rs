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
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // Remove primers from paired-end reads with cutadapt
    Cutadapt {
        // Forward primer
        #[arg(long = "primer", required = false)]
        primer: Option<String>,

        // Reverse primer
        #[arg(long = "primer-r", required = false)]
        primer_r: Option<String>,

        #[command(flatten)]
        step: StepArgs,
    },

    // Merge paired-end reads with flash2
    Flash2 {
        #[command(flatten)]
        step: StepArgs,
    },

    // Run DADA2 sample inference
    Dada2 {
        // Directory with the merged reads
        #[arg(long = "reads", required = false)]
        reads: Option<PathBuf>,

        // Prefix of the .csv and .rds outputs
        #[arg(short = 'o', long = "output", required = false)]
        output: Option<String>,

        #[command(flatten)]
        step: StepArgs,
    },

    // Reverse complement primer sequences
    Revcomp {
        // Sequences to reverse complement
        #[arg(group = "input", required = false, help = "Sequence(s)")]
        sequences: Vec<String>,

        // FASTA file with a forward and a reverse primer
        #[arg(long = "primers", required = false)]
        primers: Option<PathBuf>,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },
}

#[derive(Args)]
pub struct StepArgs {
    // TOML step file
    #[arg(short = 'c', long = "config", required = false)]
    pub config: Option<PathBuf>,

    // Directory holding .biolighthouse, defaults to $HOME
    #[arg(long = "base-dir", required = false)]
    pub base_dir: Option<PathBuf>,

    // Path to the tool, searched for on PATH if not given
    #[arg(long = "executable", required = false)]
    pub executable: Option<PathBuf>,

    // Directory with the paired input reads
    #[arg(short = 'i', long = "input", required = false)]
    pub input_files: Option<PathBuf>,

    // Tool option as name=value, can be repeated
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    // Submit with sbatch instead of running locally
    #[arg(long = "hpc", default_value_t = false)]
    pub hpc: bool,

    #[arg(long = "account", help_heading = "SLURM")]
    pub account: Option<String>,

    #[arg(long = "job-name", help_heading = "SLURM")]
    pub job_name: Option<String>,

    #[arg(long = "nodes", help_heading = "SLURM")]
    pub num_nodes: Option<u32>,

    #[arg(long = "time", help_heading = "SLURM")]
    pub time: Option<String>,

    #[arg(long = "mem", help_heading = "SLURM")]
    pub mem: Option<String>,

    #[arg(long = "tasks-per-node", help_heading = "SLURM")]
    pub tasks_per_node: Option<u32>,

    // Print the script and launch command without writing or running them
    #[arg(long = "dry-run", default_value_t = false)]
    pub dry_run: bool,

    // Verbosity
    #[arg(long = "verbose", default_value_t = false)]
    pub verbose: bool,
}
