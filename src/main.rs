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
use std::io::Write;

use biolighthouse::config::{Overrides, StepConfig};
use biolighthouse::primers::{permutations, read_primers_file, reverse_complement};
use biolighthouse::runner::plan;
use biolighthouse::{Tool, Value};
use clap::{CommandFactory, Parser};

mod cli;

type E = Box<dyn std::error::Error>;

/// Initializes the logger with verbosity given in `log_max_level`.
fn init_log(log_max_level: usize) {
    let res = stderrlog::new()
    .module(module_path!())
    .quiet(false)
    .verbosity(log_max_level)
    .timestamp(stderrlog::Timestamp::Off)
    .init();
    if let Err(e) = res {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

/// Read the step file, if any, and apply the command line on top of it.
fn step_config(
    args: &cli::StepArgs,
    extra: Vec<(&str, Option<Value>)>,
) -> Result<StepConfig, E> {
    let mut config = match &args.config {
        Some(path) => StepConfig::from_path(path)?,
        None => StepConfig::default(),
    };

    config.merge_overrides(Overrides {
        base_dir: args.base_dir.clone(),
        executable: args.executable.clone(),
        input_files: args.input_files.clone(),
        hpc: args.hpc,
        set: args.set.clone(),
        params: extra.into_iter()
            .filter_map(|(name, value)| value.map(|value| (name.to_string(), value)))
            .collect(),
        account: args.account.clone(),
        job_name: args.job_name.clone(),
        num_nodes: args.num_nodes,
        time: args.time.clone(),
        mem: args.mem.clone(),
        tasks_per_node: args.tasks_per_node,
    })?;

    Ok(config)
}

fn run_step(
    tool: Tool,
    args: &cli::StepArgs,
    extra: Vec<(&str, Option<Value>)>,
) -> Result<(), E> {
    let config = step_config(args, extra)?;
    let job = plan(tool, &config)?;

    if args.dry_run {
        let mut conn_out = std::io::stdout().lock();
        job.script.write(&mut conn_out)?;
        writeln!(conn_out, "{}", job.launch)?;
        return Ok(());
    }

    job.write()?;
    let outcome = job.run()?;
    std::io::stdout().write_all(outcome.stdout.as_bytes())?;
    std::io::stderr().write_all(outcome.stderr.as_bytes())?;
    if !outcome.success() {
        return Err(format!("`{}` exited with code {}", job.launch, outcome.rc).into());
    }
    Ok(())
}

fn revcomp(
    sequences: &[String],
    primers: Option<&std::path::Path>,
) -> Result<(), E> {
    let mut conn_out = std::io::stdout().lock();
    for sequence in sequences {
        writeln!(conn_out, "{}", reverse_complement(sequence)?)?;
    }
    if let Some(path) = primers {
        let (forward, reverse) = read_primers_file(path)?;
        for permutation in permutations(&forward, &reverse)? {
            writeln!(conn_out, "{}", permutation.tokens().join(" "))?;
        }
    }
    Ok(())
}

fn main() {
    let cli = cli::Cli::parse();

    // Subcommands:
    let res = match &cli.command {
        // Cutadapt
        Some(cli::Commands::Cutadapt {
            primer,
            primer_r,
            step,
        }) => {
            init_log(if step.verbose { 2 } else { 1 });
            run_step(Tool::Cutadapt, step, vec![
                ("primer", primer.clone().map(Value::Str)),
                ("primer_r", primer_r.clone().map(Value::Str)),
            ])
        },
        // Flash2
        Some(cli::Commands::Flash2 {
            step,
        }) => {
            init_log(if step.verbose { 2 } else { 1 });
            run_step(Tool::Flash2, step, Vec::new())
        },
        // DADA2
        Some(cli::Commands::Dada2 {
            reads,
            output,
            step,
        }) => {
            init_log(if step.verbose { 2 } else { 1 });
            run_step(Tool::Dada2, step, vec![
                ("reads", reads.as_ref().map(|x| Value::Str(x.to_string_lossy().to_string()))),
                ("output", output.clone().map(Value::Str)),
            ])
        },
        // Revcomp
        Some(cli::Commands::Revcomp {
            sequences,
            primers,
            verbose,
        }) => {
            init_log(if *verbose { 2 } else { 1 });
            revcomp(sequences, primers.as_deref())
        },
        None => {
            let _ = cli::Cli::command().print_help();
            Ok(())
        },
    };

    if let Err(e) = res {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
