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

//! Primer handling for paired-end primer removal.
//!
//! Paired-end amplicon reads may contain either primer in either
//! orientation, so cutadapt is given four adapters: both primers as given
//! and both reverse complemented. The primers travel through a two-record
//! FASTA file, `>forward/f` followed by `>reverse/r`.
//!

use std::io::Read;
use std::io::Write;
use std::path::Path;

use needletail::FastxReader;

use crate::Error;

type E = Box<dyn std::error::Error>;

/// Cutadapt adapter flags in permutation order: forward, forward reverse
/// complement, reverse, reverse reverse complement.
pub const PERMUTATION_FLAGS: [&str; 4] = ["-g", "-A", "-G", "-a"];

/// Reverse complement a DNA sequence.
///
/// Only the bases `A`, `C`, `G` and `T` are accepted.
///
/// ## Errors
///
/// Returns [Error::InvalidSequence] at the first base outside of `ACGT`.
///
/// ## Usage
///
/// ```rust
/// use biolighthouse::primers::reverse_complement;
///
/// assert_eq!(reverse_complement("CTACGGGGGGCAGCAG").unwrap(), "CTGCTGCCCCCCGTAG");
/// assert!(reverse_complement("ACGN").is_err());
/// ```
///
pub fn reverse_complement(
    sequence: &str,
) -> Result<String, Error> {
    let mut complement: Vec<char> = Vec::with_capacity(sequence.len());
    for (position, base) in sequence.chars().enumerate() {
        let paired = match base {
            'A' => 'T',
            'T' => 'A',
            'C' => 'G',
            'G' => 'C',
            _ => return Err(Error::InvalidSequence { sequence: sequence.to_string(), position, found: base }),
        };
        complement.push(paired);
    }
    Ok(complement.into_iter().rev().collect())
}

/// A named primer sequence.
///
/// `tag` is the short name after the `/` in the FASTA header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primer {
    pub name: String,
    pub tag: String,
    pub sequence: String,
}

impl Primer {
    pub fn new<S: ToString, T: ToString, U: ToString>(name: S, tag: T, sequence: U) -> Self {
        Self { name: name.to_string(), tag: tag.to_string(), sequence: sequence.to_string() }
    }

    pub fn forward<S: ToString>(sequence: S) -> Self {
        Self::new("forward", "f", sequence)
    }

    pub fn reverse<S: ToString>(sequence: S) -> Self {
        Self::new("reverse", "r", sequence)
    }

    /// FASTA header of the primer without the leading `>`.
    pub fn header(&self) -> String {
        format!("{}/{}", self.name, self.tag)
    }

    /// The reverse complemented primer, with `_rc` appended to the name and tag.
    pub fn reverse_complement(&self) -> Result<Primer, Error> {
        Ok(Primer {
            name: format!("{}_rc", self.name),
            tag: format!("{}_rc", self.tag),
            sequence: reverse_complement(&self.sequence)?,
        })
    }
}

/// A primer together with the cutadapt flag it is passed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimerPermutation {
    pub flag: &'static str,
    pub primer: Primer,
}

impl PrimerPermutation {
    /// The flag and the named adapter, eg. `["-g", "forward=CTACG"]`.
    pub fn tokens(&self) -> [String; 2] {
        [self.flag.to_string(), format!("{}={}", self.primer.name, self.primer.sequence)]
    }
}

/// Generate the four primer orientations for paired-end trimming.
///
/// The order is fixed: forward, forward reverse complement, reverse,
/// reverse reverse complement, paired with [PERMUTATION_FLAGS].
///
/// ## Usage
///
/// ```rust
/// use biolighthouse::primers::{permutations, Primer};
///
/// let perms = permutations(&Primer::forward("CTACGGGGGGCAGCAG"), &Primer::reverse("GGACTACCGGGGTATCT")).unwrap();
/// let tokens: Vec<String> = perms.iter().flat_map(|p| p.tokens()).collect();
///
/// assert_eq!(tokens, vec![
///     "-g", "forward=CTACGGGGGGCAGCAG",
///     "-A", "forward_rc=CTGCTGCCCCCCGTAG",
///     "-G", "reverse=GGACTACCGGGGTATCT",
///     "-a", "reverse_rc=AGATACCCCGGTAGTCC",
/// ]);
/// ```
///
pub fn permutations(
    forward: &Primer,
    reverse: &Primer,
) -> Result<[PrimerPermutation; 4], Error> {
    let forward_rc = forward.reverse_complement()?;
    let reverse_rc = reverse.reverse_complement()?;
    Ok([
        PrimerPermutation { flag: PERMUTATION_FLAGS[0], primer: forward.clone() },
        PrimerPermutation { flag: PERMUTATION_FLAGS[1], primer: forward_rc },
        PrimerPermutation { flag: PERMUTATION_FLAGS[2], primer: reverse.clone() },
        PrimerPermutation { flag: PERMUTATION_FLAGS[3], primer: reverse_rc },
    ])
}

/// Write the forward and reverse primer as a two-record FASTA file.
pub fn write_primers_fasta<W: Write>(
    forward: &Primer,
    reverse: &Primer,
    conn: &mut W,
) -> Result<(), E> {
    for primer in [forward, reverse] {
        writeln!(conn, ">{}", primer.header())?;
        writeln!(conn, "{}", primer.sequence)?;
    }
    conn.flush()?;
    Ok(())
}

fn collect_primers(
    mut reader: Box<dyn FastxReader>,
) -> Result<(Primer, Primer), Error> {
    let mut primers: Vec<Primer> = Vec::with_capacity(2);
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| Error::InvalidInput(format!("failed to parse primer FASTA: {}", e)))?;
        let header = String::from_utf8_lossy(record.id()).to_string();
        // the id ends at the first whitespace, the rest is a description
        let id = header.split_whitespace().next().unwrap_or("");
        let (name, tag) = id.split_once('/')
            .ok_or_else(|| Error::InvalidInput(format!("primer header '{}' is not of the form name/tag", id)))?;
        let sequence = String::from_utf8_lossy(&record.seq()).to_string();
        primers.push(Primer::new(name, tag, sequence));
    }

    if primers.len() != 2 {
        return Err(Error::InvalidInput(format!(
            "expected exactly 2 primer records (forward, reverse), found {}", primers.len()
        )));
    }
    let reverse = primers.pop();
    let forward = primers.pop();
    match (forward, reverse) {
        (Some(forward), Some(reverse)) => Ok((forward, reverse)),
        _ => Err(Error::InvalidInput("expected exactly 2 primer records".to_string())),
    }
}

/// Read the forward and reverse primer from FASTA data in `conn`.
///
/// ## Errors
///
/// Returns [Error::InvalidInput] unless the data holds exactly two records
/// with `name/tag` headers.
pub fn read_primers<R: Read + Send + 'static>(
    conn: R,
) -> Result<(Primer, Primer), Error> {
    let reader = needletail::parse_fastx_reader(conn)
        .map_err(|e| Error::InvalidInput(format!("failed to read primer FASTA: {}", e)))?;
    collect_primers(reader)
}

/// Read the forward and reverse primer from the FASTA file at `path`.
pub fn read_primers_file<P: AsRef<Path>>(
    path: P,
) -> Result<(Primer, Primer), Error> {
    let reader = needletail::parse_fastx_file(path.as_ref())
        .map_err(|e| Error::InvalidInput(format!("failed to read {}: {}", path.as_ref().display(), e)))?;
    collect_primers(reader)
}

/// Generate the primer permutations from FASTA data.
///
/// Shorthand for [read_primers] followed by [permutations].
pub fn permutations_from_fasta<R: Read + Send + 'static>(
    conn: R,
) -> Result<[PrimerPermutation; 4], Error> {
    let (forward, reverse) = read_primers(conn)?;
    permutations(&forward, &reverse)
}
