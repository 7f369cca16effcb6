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

//! Table-driven command line assembly.
//!
//! A [Table] pairs the option declarations of a tool with an ordered list of
//! [Flag] rows. Each row names the option it reads, how the value is written
//! ([Rule]) and when it is written ([Emit]). [build_command] walks the rows
//! in order, so the emitted flag order is exactly the table order.
//!

use std::fmt;

use indexmap::IndexMap;

use crate::Error;
use crate::params::{OptionSpec, ParameterSet, Value};

/// How an option value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The flag alone, eg. `--no-indels`.
    Bare(&'static str),
    /// Flag and value as two tokens, eg. `-O 5`.
    Short(&'static str),
    /// Flag and value joined by `=` in one token, eg. `--report=minimal`.
    Long(&'static str),
    /// The value alone.
    Positional,
    /// A fixed token that does not depend on any option.
    Literal(&'static str),
}

/// When an option value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// Always. The value must not be null.
    Always,
    /// When the value is not null and differs from the declared default.
    NotDefault,
    /// When the value is not null.
    NotNull,
    /// When the value is `true`.
    IsTrue,
    /// When the value is this integer.
    Equals(i64),
}

/// One row of a flag table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    pub option: &'static str,
    pub rule: Rule,
    pub emit: Emit,
}

pub const fn always(option: &'static str, rule: Rule) -> Flag {
    Flag { option, rule, emit: Emit::Always }
}

pub const fn unless_default(option: &'static str, rule: Rule) -> Flag {
    Flag { option, rule, emit: Emit::NotDefault }
}

pub const fn if_set(option: &'static str, rule: Rule) -> Flag {
    Flag { option, rule, emit: Emit::NotNull }
}

pub const fn if_true(option: &'static str, flag: &'static str) -> Flag {
    Flag { option, rule: Rule::Bare(flag), emit: Emit::IsTrue }
}

pub const fn when_equals(option: &'static str, sentinel: i64, rule: Rule) -> Flag {
    Flag { option, rule, emit: Emit::Equals(sentinel) }
}

pub const fn literal(token: &'static str) -> Flag {
    Flag { option: "", rule: Rule::Literal(token), emit: Emit::Always }
}

/// Option declarations and flag rows of one tool.
#[derive(Debug, Clone, Copy)]
pub struct Table {
    pub options: &'static [OptionSpec],
    pub flags: &'static [Flag],
}

impl Table {
    pub fn option(
        &self,
        name: &str,
    ) -> Option<&'static OptionSpec> {
        self.options.iter().find(|option| option.name == name)
    }

    /// Resolve user supplied values against this table's options.
    ///
    /// See [ParameterSet::resolve].
    pub fn resolve(
        &self,
        supplied: &IndexMap<String, Value>,
    ) -> Result<ParameterSet, Error> {
        ParameterSet::resolve(self.options, supplied)
    }
}

/// An ordered sequence of tokens starting with the executable.
///
/// Displays as the tokens joined by single spaces, which is the form written
/// into generated scripts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandLine {
    tokens: Vec<String>,
}

impl CommandLine {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The first token, or an empty string for an empty command line.
    pub fn program(&self) -> &str {
        self.tokens.first().map(|x| x.as_str()).unwrap_or("")
    }

    pub fn args(&self) -> &[String] {
        if self.tokens.is_empty() { &self.tokens } else { &self.tokens[1..] }
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

fn should_emit(
    flag: &Flag,
    option: &OptionSpec,
    value: &Value,
) -> Result<bool, Error> {
    let emit = match flag.emit {
        Emit::Always => {
            if value.is_null() {
                return Err(Error::invalid_option(option.name, "always written but has no value"));
            }
            true
        },
        Emit::NotDefault => !value.is_null() && *value != option.default,
        Emit::NotNull => !value.is_null(),
        Emit::IsTrue => *value == Value::Bool(true),
        Emit::Equals(sentinel) => *value == Value::Int(sentinel),
    };
    Ok(emit)
}

/// Append the tokens for every row of `table` to `tokens`.
///
/// Values are checked against their declaration again here so that a
/// [ParameterSet] built for a different table cannot slip through with a
/// value of the wrong type.
///
/// ## Errors
///
/// Returns [Error::InvalidOption] if a row refers to an option that is not
/// declared or missing from `params`, if a value fails its declaration, or
/// if an always-written option is null.
pub fn append_flags(
    tokens: &mut Vec<String>,
    table: &Table,
    params: &ParameterSet,
) -> Result<(), Error> {
    for flag in table.flags {
        if let Rule::Literal(token) = flag.rule {
            tokens.push(token.to_string());
            continue;
        }

        let option = table.option(flag.option)
            .ok_or_else(|| Error::invalid_option(flag.option, "used in the flag table but not declared"))?;
        let value = params.get(flag.option)
            .ok_or_else(|| Error::invalid_option(flag.option, "missing from the parameter set"))?;
        option.check(value)?;

        if !should_emit(flag, option, value)? {
            continue;
        }

        match flag.rule {
            Rule::Bare(name) => tokens.push(name.to_string()),
            Rule::Short(name) => {
                tokens.push(name.to_string());
                tokens.push(value.to_string());
            },
            Rule::Long(name) => tokens.push(format!("{}={}", name, value)),
            Rule::Positional => tokens.push(value.to_string()),
            Rule::Literal(_) => unreachable!("handled above"),
        }
    }
    Ok(())
}

/// Build the command line for `executable` from `table` and `params`.
///
/// The result depends only on the arguments: the same inputs always give
/// the same tokens.
///
/// ## Usage
///
/// ```rust
/// use biolighthouse::flags::{build_command, if_true, unless_default, Rule, Table};
/// use biolighthouse::params::{opt, DefaultValue, Kind, Value};
/// use indexmap::IndexMap;
///
/// static TABLE: Table = Table {
///     options: &[
///         opt("overlap", Kind::Int, DefaultValue::Int(3)),
///         opt("trim_n", Kind::Bool, DefaultValue::Bool(false)),
///     ],
///     flags: &[
///         unless_default("overlap", Rule::Short("-O")),
///         if_true("trim_n", "--trim-n"),
///     ],
/// };
///
/// let mut supplied: IndexMap<String, Value> = IndexMap::new();
/// supplied.insert("trim_n".to_string(), Value::Bool(true));
/// let params = TABLE.resolve(&supplied).unwrap();
///
/// let cmd = build_command("/usr/bin/cutadapt", &TABLE, &params).unwrap();
/// assert_eq!(cmd.tokens(), &["/usr/bin/cutadapt", "--trim-n"]);
/// ```
///
pub fn build_command(
    executable: &str,
    table: &Table,
    params: &ParameterSet,
) -> Result<CommandLine, Error> {
    if executable.is_empty() {
        return Err(Error::invalid_option("executable", "path is empty"));
    }
    let mut tokens: Vec<String> = vec![executable.to_string()];
    append_flags(&mut tokens, table, params)?;
    Ok(CommandLine::new(tokens))
}

// Tests
#[cfg(test)]
mod tests {
    use super::{always, if_set, if_true, literal, unless_default, when_equals, Rule, Table};
    use crate::params::{opt, DefaultValue, Kind};

    static TABLE: Table = Table {
        options: &[
            opt("count", Kind::Int, DefaultValue::Int(1)),
            opt("report", Kind::Str, DefaultValue::Str("full")),
            opt("error_rate", Kind::Float, DefaultValue::Float(0.1)),
            opt("maximum_length", Kind::Int, DefaultValue::Null),
            opt("trim_n", Kind::Bool, DefaultValue::Bool(false)),
            opt("phred_offset", Kind::Int, DefaultValue::Int(33)).choices(&["33", "64"]),
            opt("reads", Kind::Path, DefaultValue::Null),
        ],
        flags: &[
            always("count", Rule::Short("-n")),
            unless_default("report", Rule::Long("--report")),
            unless_default("error_rate", Rule::Short("-e")),
            if_set("maximum_length", Rule::Short("-M")),
            if_true("trim_n", "--trim-n"),
            when_equals("phred_offset", 64, Rule::Short("-p")),
            literal("--"),
            if_set("reads", Rule::Positional),
        ],
    };

    fn params(pairs: &[(&str, crate::params::Value)]) -> crate::params::ParameterSet {
        let supplied: indexmap::IndexMap<String, crate::params::Value> = pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        TABLE.resolve(&supplied).unwrap()
    }

    #[test]
    fn build_command_suppresses_defaults() {
        use super::build_command;

        let got = build_command("tool", &TABLE, &params(&[])).unwrap();
        assert_eq!(got.tokens(), &["tool", "-n", "1", "--"]);
    }

    #[test]
    fn build_command_follows_table_order() {
        use super::build_command;
        use crate::params::Value;

        // Supplied in reverse order on purpose.
        let input = params(&[
            ("reads", Value::Str("in.fq".to_string())),
            ("phred_offset", Value::Int(64)),
            ("trim_n", Value::Bool(true)),
            ("maximum_length", Value::Int(300)),
            ("error_rate", Value::Float(0.2)),
            ("report", Value::Str("minimal".to_string())),
            ("count", Value::Int(2)),
        ]);
        let got = build_command("tool", &TABLE, &input).unwrap();

        assert_eq!(got.to_string(), "tool -n 2 --report=minimal -e 0.2 -M 300 --trim-n -p 64 -- in.fq");
    }

    #[test]
    fn build_command_is_deterministic() {
        use super::build_command;
        use crate::params::Value;

        let input = params(&[("error_rate", Value::Float(0.15)), ("trim_n", Value::Bool(true))]);
        let first = build_command("tool", &TABLE, &input).unwrap();
        let second = build_command("tool", &TABLE, &input).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.to_string().as_bytes(), second.to_string().as_bytes());
    }

    #[test]
    fn build_command_rejects_empty_executable() {
        use super::build_command;
        use crate::Error;

        let got = build_command("", &TABLE, &params(&[]));
        assert_eq!(got, Err(Error::invalid_option("executable", "path is empty")));
    }

    #[test]
    fn build_command_does_not_coerce() {
        use super::build_command;
        use crate::params::{ParameterSet, Value};
        use crate::Error;

        // A set resolved against other declarations, where `count` is a string.
        let other = [opt("count", Kind::Str, DefaultValue::Str("one"))];
        let foreign = ParameterSet::resolve(&other, &indexmap::IndexMap::new()).unwrap();
        assert_eq!(foreign.get("count"), Some(&Value::Str("one".to_string())));

        let got = build_command("tool", &TABLE, &foreign);
        assert_eq!(got, Err(Error::invalid_option("count", "expected int, got str 'one'")));
    }

    #[test]
    fn build_command_requires_declared_options() {
        use super::{build_command, Flag};
        use crate::Error;

        static BROKEN: Table = Table {
            options: &[],
            flags: &[Flag { option: "threads", rule: Rule::Short("-t"), emit: super::Emit::Always }],
        };
        let got = build_command("tool", &BROKEN, &crate::params::ParameterSet::default());
        assert_eq!(got, Err(Error::invalid_option("threads", "used in the flag table but not declared")));
    }

    #[test]
    fn always_rejects_null() {
        use super::build_command;
        use crate::Error;

        static NULLABLE: Table = Table {
            options: &[opt("output", Kind::Str, DefaultValue::Null)],
            flags: &[always("output", Rule::Positional)],
        };
        let params = NULLABLE.resolve(&indexmap::IndexMap::new()).unwrap();
        let got = build_command("tool", &NULLABLE, &params);

        assert_eq!(got, Err(Error::invalid_option("output", "always written but has no value")));
    }

    #[test]
    fn command_line_parts() {
        use super::CommandLine;

        let cmd = CommandLine::new(vec!["sbatch".to_string(), "--nodes=1".to_string(), "run.sh".to_string()]);
        assert_eq!(cmd.program(), "sbatch");
        assert_eq!(cmd.args(), &["--nodes=1", "run.sh"]);
        assert_eq!(cmd.to_string(), "sbatch --nodes=1 run.sh");

        let empty = CommandLine::new(Vec::new());
        assert_eq!(empty.program(), "");
        assert!(empty.args().is_empty());
    }
}
