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

//! Shell scripts holding one command line per line.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::flags::CommandLine;

type E = Box<dyn std::error::Error>;

pub const SHEBANG: &str = "#!/bin/bash";

/// A bash script: the shebang, an empty line, then the commands in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<CommandLine>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        line: CommandLine,
    ) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[CommandLine] {
        &self.lines
    }

    /// Write the script to `conn`.
    pub fn write<W: Write>(
        &self,
        conn: &mut W,
    ) -> Result<(), E> {
        write!(conn, "{}", self)?;
        conn.flush()?;
        Ok(())
    }

    /// Write the script to `path`, replacing any existing file, and set its
    /// permissions to `mode`.
    ///
    /// ## Errors
    ///
    /// Returns the underlying io error if the file cannot be created or its
    /// permissions changed.
    pub fn write_to_path<P: AsRef<Path>>(
        &self,
        path: P,
        mode: u32,
    ) -> Result<(), E> {
        let mut conn = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(path.as_ref())?;
        self.write(&mut conn)?;
        // umask applies to `mode` above
        std::fs::set_permissions(path.as_ref(), std::fs::Permissions::from_mode(mode))?;
        Ok(())
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", SHEBANG)?;
        writeln!(f)?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

impl FromIterator<CommandLine> for Script {
    fn from_iter<I: IntoIterator<Item = CommandLine>>(iter: I) -> Self {
        Self { lines: iter.into_iter().collect() }
    }
}

// Tests
#[cfg(test)]
mod tests {

    fn line(tokens: &[&str]) -> crate::flags::CommandLine {
        crate::flags::CommandLine::new(tokens.iter().map(|x| x.to_string()).collect())
    }

    #[test]
    fn write_script() {
        use super::Script;

        let script: Script = vec![
            line(&["flash2", "-t", "1", "a_R1.fastq.gz", "a_R2.fastq.gz"]),
            line(&["flash2", "-t", "1", "b_R1.fastq.gz", "b_R2.fastq.gz"]),
        ].into_iter().collect();

        let mut got: Vec<u8> = Vec::new();
        script.write(&mut got).unwrap();

        let expected = "#!/bin/bash\n\nflash2 -t 1 a_R1.fastq.gz a_R2.fastq.gz\nflash2 -t 1 b_R1.fastq.gz b_R2.fastq.gz\n";
        assert_eq!(String::from_utf8(got).unwrap(), expected);
    }

    #[test]
    fn write_empty_script() {
        use super::Script;

        assert_eq!(Script::new().to_string(), "#!/bin/bash\n\n");
    }

    #[test]
    fn write_to_path_sets_mode() {
        use super::Script;
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("biolighthouse-script-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("merge.sh");

        let mut script = Script::new();
        script.push(line(&["echo", "hi"]));
        script.write_to_path(&path, 0o700).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        let got = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(mode, 0o700);
        assert_eq!(got, "#!/bin/bash\n\necho hi\n");
    }
}
