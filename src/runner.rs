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

//! Planning, writing and launching a step.
//!
//! [plan] turns a [Tool] and a [StepConfig] into a [Job] without touching
//! the filesystem besides looking up the executable and listing the input
//! directory. [Job::write] creates the work directory and the script, and
//! [Job::run] launches it.
//!

use std::io::Cursor;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use crate::Error;
use crate::config::StepConfig;
use crate::flags::CommandLine;
use crate::primers::{permutations_from_fasta, write_primers_fasta};
use crate::script::Script;
use crate::tools::{cutadapt, dada2, flash2, path_token, ReadPair, Tool};

type E = Box<dyn std::error::Error>;

/// Name of the primer FASTA written next to the cutadapt script.
pub const PRIMERS_FASTA: &str = "primers.fa";

fn is_executable(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(metadata) => metadata.is_file() && metadata.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// Find the executable to run.
///
/// A declared path is used as is if it points to an executable file.
/// Otherwise the directories in `PATH` are searched for `exe_name`.
///
/// ## Errors
///
/// Returns [Error::MissingExecutable] if the declared path is not an
/// executable file or `exe_name` is not found on `PATH`.
pub fn resolve_executable(
    declared: Option<&Path>,
    exe_name: &str,
) -> Result<PathBuf, Error> {
    if let Some(path) = declared {
        if is_executable(path) {
            return Ok(path.to_path_buf());
        }
        return Err(Error::MissingExecutable(format!("{} is not an executable file", path.display())));
    }

    let found = std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(exe_name))
            .find(|candidate| is_executable(candidate))
    });
    found.ok_or_else(|| Error::MissingExecutable(format!("{} was not found on PATH", exe_name)))
}

/// List the read pairs in `dir`.
///
/// Every non-hidden file with `_R1` in its name is a forward read; the
/// reverse read is not checked for existence. Pairs are sorted by the
/// forward file name.
pub fn find_read_pairs<P: AsRef<Path>>(
    dir: P,
) -> Result<Vec<ReadPair>, E> {
    let entries = std::fs::read_dir(dir.as_ref())
        .map_err(|e| format!("failed to list {}: {}", dir.as_ref().display(), e))?;

    let mut pairs: Vec<ReadPair> = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || !name.contains("_R1") {
            continue;
        }
        if entry.file_type()?.is_dir() {
            continue;
        }
        pairs.push(ReadPair::from_forward(entry.path()));
    }
    pairs.sort();
    Ok(pairs)
}

/// Exit code and output of a launched script or submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub rc: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Outcome {
    pub fn success(&self) -> bool {
        self.rc == 0
    }
}

/// A planned step: the script to write and the command that launches it.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub tool: Tool,
    pub work_dir: PathBuf,
    pub script: Script,
    pub launch: CommandLine,
    /// Contents of [PRIMERS_FASTA], for cutadapt only.
    pub primers_fasta: Option<Vec<u8>>,
}

impl Job {
    pub fn script_path(&self) -> PathBuf {
        self.work_dir.join(self.tool.script_name())
    }

    /// Create the work directory layout and write the script.
    pub fn write(&self) -> Result<(), E> {
        std::fs::create_dir_all(&self.work_dir)?;
        if self.tool.is_paired() {
            std::fs::create_dir_all(self.work_dir.join("output"))?;
            std::fs::create_dir_all(self.work_dir.join("reports"))?;
        }
        if let Some(contents) = &self.primers_fasta {
            std::fs::write(self.work_dir.join(PRIMERS_FASTA), contents)?;
        }
        self.script.write_to_path(self.script_path(), self.tool.script_mode())?;
        log::info!("Wrote {} with {} command(s)", self.script_path().display(), self.script.lines().len());
        Ok(())
    }

    /// Launch the script, or submit it, from the work directory and wait
    /// for the launched process to exit.
    ///
    /// A non-zero exit code is returned in the [Outcome], not as an error.
    pub fn run(&self) -> Result<Outcome, E> {
        log::info!("Running `{}` in {}", self.launch, self.work_dir.display());
        let output = Command::new(self.launch.program())
            .args(self.launch.args())
            .current_dir(&self.work_dir)
            .output()
            .map_err(|e| format!("failed to launch {}: {}", self.launch.program(), e))?;

        let outcome = Outcome {
            rc: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        if !outcome.success() {
            log::warn!("{} exited with code {}", self.launch.program(), outcome.rc);
        }
        Ok(outcome)
    }
}

fn input_pairs(
    tool: Tool,
    config: &StepConfig,
) -> Result<Vec<ReadPair>, E> {
    let dir = config.input_files.as_ref()
        .ok_or_else(|| Error::invalid_option("input_files", format!("required for {}", tool)))?;
    let pairs = find_read_pairs(dir)?;
    if pairs.is_empty() {
        log::warn!("No files with _R1 in their name in {}", dir.display());
    }
    Ok(pairs)
}

/// Plan one step of `tool` as described by `config`.
///
/// The executable is located first. Parameters are then resolved against
/// the tool's option table and, for SLURM submission, the scheduler fields
/// are validated. Any failure aborts before anything is written.
///
/// ## Errors
///
/// Returns [Error::MissingExecutable], [Error::InvalidOption],
/// [Error::InvalidSequence] or [Error::InvalidInput] boxed, or an io error
/// if the input directory cannot be listed.
pub fn plan(
    tool: Tool,
    config: &StepConfig,
) -> Result<Job, E> {
    let executable = resolve_executable(config.executable.as_deref(), tool.exe_name())?;
    let executable = path_token(&executable);
    log::debug!("Using {} for {}", executable, tool);

    let params = tool.table().resolve(&config.params)?;
    for (name, value) in params.iter().filter(|(_, value)| !value.is_null()) {
        log::debug!("{} {} = {}", tool, name, value);
    }
    let scheduler = if config.hpc {
        let spec = config.slurm.clone().unwrap_or_default();
        spec.validate()?;
        Some(spec)
    } else {
        None
    };

    let base_dir = config.base_dir();
    let work_dir = tool.work_dir(&base_dir);
    let mut script = Script::new();
    let mut primers_fasta: Option<Vec<u8>> = None;

    match tool {
        Tool::Cutadapt => {
            let (forward, reverse) = cutadapt::primers(&params)?;
            let mut fasta: Vec<u8> = Vec::new();
            write_primers_fasta(&forward, &reverse, &mut fasta)?;
            let permutations = permutations_from_fasta(Cursor::new(fasta.clone()))?;
            for pair in input_pairs(tool, config)? {
                script.push(cutadapt::pair_command(&executable, &params, &permutations, &pair, &work_dir)?);
            }
            primers_fasta = Some(fasta);
        },
        Tool::Flash2 => {
            for pair in input_pairs(tool, config)? {
                script.push(flash2::pair_command(&executable, &params, &pair)?);
            }
        },
        Tool::Dada2 => {
            script.push(dada2::command(&executable, &params, &base_dir, &work_dir)?);
        },
    }

    let script_path = work_dir.join(tool.script_name());
    let launch = match scheduler {
        Some(spec) => {
            let extra = match tool {
                Tool::Dada2 => vec![dada2::sbatch_output(&work_dir)],
                _ => Vec::new(),
            };
            spec.submit_command(&script_path, &extra)?
        },
        None => CommandLine::new(vec![format!("./{}", tool.script_name())]),
    };

    Ok(Job { tool, work_dir, script, launch, primers_fasta })
}

// Tests
#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    // Unique scratch directory under the system temp dir.
    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("biolighthouse-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fake_executable(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/bash\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), "").unwrap();
        }
    }

    #[test]
    fn resolve_declared_executable() {
        use super::resolve_executable;
        use crate::Error;

        let dir = scratch("resolve");
        let exe = fake_executable(&dir, "flash2");
        let not_exe = dir.join("notes.txt");
        std::fs::write(&not_exe, "").unwrap();

        let found = resolve_executable(Some(&exe), "flash2");
        let missing = resolve_executable(Some(&dir.join("nope")), "flash2");
        let plain = resolve_executable(Some(&not_exe), "flash2");
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(found, Ok(exe));
        assert!(matches!(missing, Err(Error::MissingExecutable(_))));
        assert!(matches!(plain, Err(Error::MissingExecutable(_))));
    }

    #[test]
    fn resolve_missing_from_path() {
        use super::resolve_executable;
        use crate::Error;

        let got = resolve_executable(None, "biolighthouse-no-such-tool");
        assert_eq!(got, Err(Error::MissingExecutable("biolighthouse-no-such-tool was not found on PATH".to_string())));
    }

    #[test]
    fn find_read_pairs_sorted() {
        use super::find_read_pairs;

        let dir = scratch("pairs");
        touch(&dir, &["S2_R1.fastq.gz", "S2_R2.fastq.gz", "S1_R1.fastq.gz", "S1_R2.fastq.gz", ".S3_R1.fastq.gz", "notes.txt"]);

        let got = find_read_pairs(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(got.len(), 2);
        assert_eq!(got[0].forward, dir.join("S1_R1.fastq.gz"));
        assert_eq!(got[0].reverse, dir.join("S1_R2.fastq.gz"));
        assert_eq!(got[1].forward, dir.join("S2_R1.fastq.gz"));
    }

    #[test]
    fn plan_cutadapt_locally() {
        use super::plan;
        use crate::config::StepConfig;
        use crate::params::Value;
        use crate::tools::Tool;

        let dir = scratch("plan-cutadapt");
        let exe = fake_executable(&dir, "cutadapt");
        let raw = dir.join("raw");
        std::fs::create_dir_all(&raw).unwrap();
        touch(&raw, &["A_R1.fastq.gz", "A_R2.fastq.gz"]);

        let mut config = StepConfig {
            executable: Some(exe.clone()),
            base_dir: Some(dir.clone()),
            input_files: Some(raw.clone()),
            ..Default::default()
        };
        config.params.insert("primer".to_string(), Value::Str("ACGG".to_string()));
        config.params.insert("primer_r".to_string(), Value::Str("TTAC".to_string()));

        let job = plan(Tool::Cutadapt, &config).unwrap();
        let work = dir.join(".biolighthouse/primer_removal");
        let expected_line = format!(
            "{} -n 1 --pair-filter=any --quality-base=33 -m 0 -j 1 \
             -g forward=ACGG -A forward_rc=CCGT -G reverse=TTAC -a reverse_rc=GTAA \
             {} {} -o {} -p {} > {}",
            exe.display(),
            raw.join("A_R1.fastq.gz").display(),
            raw.join("A_R2.fastq.gz").display(),
            work.join("output/A_R1.fastq.gz").display(),
            work.join("output/A_R2.fastq.gz").display(),
            work.join("reports/A.report").display(),
        );

        job.write().unwrap();
        let script = std::fs::read_to_string(work.join("primer_removal.sh")).unwrap();
        let mode = std::fs::metadata(work.join("primer_removal.sh")).unwrap().permissions().mode() & 0o777;
        let fasta = std::fs::read_to_string(work.join("primers.fa")).unwrap();
        let has_output = work.join("output").is_dir() && work.join("reports").is_dir();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(job.work_dir, work);
        assert_eq!(job.launch.to_string(), "./primer_removal.sh");
        assert_eq!(script, format!("#!/bin/bash\n\n{}\n", expected_line));
        assert_eq!(mode, 0o777);
        assert_eq!(fasta, ">forward/f\nACGG\n>reverse/r\nTTAC\n");
        assert!(has_output);
    }

    #[test]
    fn plan_dada2_on_slurm() {
        use super::plan;
        use crate::config::StepConfig;
        use crate::params::Value;
        use crate::slurm::SchedulerSpec;
        use crate::tools::Tool;

        let dir = scratch("plan-dada2");
        let exe = fake_executable(&dir, "Rscript");

        let mut config = StepConfig {
            executable: Some(exe),
            base_dir: Some(PathBuf::from("/home/u")),
            hpc: true,
            slurm: Some(SchedulerSpec::default().with_account("abc").with_time("5:00")),
            ..Default::default()
        };
        config.params.insert("reads".to_string(), Value::Str("/home/u/.biolighthouse/merge/output".to_string()));
        config.params.insert("output".to_string(), Value::Str("seqtab".to_string()));

        let job = plan(Tool::Dada2, &config).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(job.script.lines().len(), 1);
        assert!(job.primers_fasta.is_none());
        assert_eq!(
            job.launch.to_string(),
            "sbatch --dependency=singleton --nodes=1 --account=abc --time=5:00 \
             --output=/home/u/.biolighthouse/DADA2/dada2_sample_inference.report \
             /home/u/.biolighthouse/DADA2/dada2_sample_inference.sh"
        );
    }

    #[test]
    fn plan_rejects_bad_primer() {
        use super::plan;
        use crate::config::StepConfig;
        use crate::params::Value;
        use crate::tools::Tool;
        use crate::Error;

        let dir = scratch("plan-primer");
        let exe = fake_executable(&dir, "cutadapt");

        let mut config = StepConfig {
            executable: Some(exe),
            base_dir: Some(dir.clone()),
            input_files: Some(dir.clone()),
            ..Default::default()
        };
        config.params.insert("primer".to_string(), Value::Str("ACNG".to_string()));
        config.params.insert("primer_r".to_string(), Value::Str("TTAC".to_string()));

        let got = plan(Tool::Cutadapt, &config);
        std::fs::remove_dir_all(&dir).unwrap();

        let err = got.unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::InvalidSequence { sequence: "ACNG".to_string(), position: 2, found: 'N' }),
        );
    }

    #[test]
    fn plan_requires_scheduler_fields() {
        use super::plan;
        use crate::config::StepConfig;
        use crate::params::Value;
        use crate::tools::Tool;
        use crate::Error;

        let dir = scratch("plan-slurm");
        let exe = fake_executable(&dir, "flash2");

        let mut config = StepConfig {
            executable: Some(exe),
            input_files: Some(dir.clone()),
            hpc: true,
            ..Default::default()
        };
        config.params.insert("threads".to_string(), Value::Int(4));

        let got = plan(Tool::Flash2, &config);
        std::fs::remove_dir_all(&dir).unwrap();

        let err = got.unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::invalid_option("account", "required for SLURM submission")));
    }

    #[test]
    fn run_launches_in_work_dir() {
        use super::Job;
        use crate::flags::CommandLine;
        use crate::script::Script;
        use crate::tools::Tool;

        let dir = scratch("run");
        let mut script = Script::new();
        script.push(CommandLine::new(vec!["pwd".to_string()]));
        let job = Job {
            tool: Tool::Flash2,
            work_dir: dir.join(".biolighthouse/merge"),
            script,
            launch: CommandLine::new(vec!["./merge.sh".to_string()]),
            primers_fasta: None,
        };

        job.write().unwrap();
        let got = job.run().unwrap();
        let expected = std::fs::canonicalize(&job.work_dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(got.success());
        assert_eq!(got.stdout.trim(), expected.display().to_string());
    }
}
