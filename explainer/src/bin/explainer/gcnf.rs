//! A parser for group-oriented CNF files, as used for group MUS extraction.
//!
//! The format extends DIMACS CNF: the header is `p gcnf <variables> <clauses> <groups>` and every
//! clause is prefixed by its group, e.g. `{2} 1 -3 0`. Group 0 contains the hard clauses; the
//! clauses of every other group together form one soft constraint. A plain DIMACS CNF file
//! (`p cnf <variables> <clauses>`) is accepted as well, in which case every clause is a soft
//! constraint of its own, numbered from 1 in file order.
use std::collections::BTreeMap;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::num::NonZeroI32;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum GcnfParseError {
    #[error("failed to read file")]
    Io(#[from] std::io::Error),

    #[error("missing header")]
    MissingHeader,

    #[error("'{0}' is an invalid header")]
    InvalidHeader(String),

    #[error("multiple headers found")]
    DuplicateHeader,

    #[error("'{0}' is an invalid literal")]
    InvalidLiteral(String),

    #[error("literal {literal} refers to a variable outside of 1..={num_variables}")]
    VariableOutOfRange { literal: i32, num_variables: usize },

    #[error("'{0}' is an invalid group")]
    InvalidGroup(String),

    #[error("group {group} is outside of 0..={num_groups}")]
    GroupOutOfRange { group: u32, num_groups: u32 },

    #[error("a clause without a group was found")]
    MissingGroup,

    #[error("the last clause in the source is not terminated with a '0'")]
    UnterminatedClause,

    #[error("expected to parse {expected} clauses, but parsed {parsed}")]
    IncorrectClauseCount { expected: usize, parsed: usize },
}

/// The clauses of a parsed file, with the soft clauses grouped by group number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct GroupedCnf {
    pub(crate) num_variables: usize,
    pub(crate) hard_clauses: Vec<Vec<NonZeroI32>>,
    /// Only groups which contain at least one clause, sorted by group number.
    pub(crate) groups: Vec<(u32, Vec<Vec<NonZeroI32>>)>,
}

pub(crate) fn parse_gcnf(source: impl Read) -> Result<GroupedCnf, GcnfParseError> {
    let reader = BufReader::new(source);

    let mut header: Option<Header> = None;
    let mut hard_clauses = vec![];
    let mut groups: BTreeMap<u32, Vec<Vec<NonZeroI32>>> = BTreeMap::new();
    let mut clause = vec![];
    let mut group = None;
    let mut parsed_clauses = 0;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('c') {
            continue;
        }

        if line.starts_with('p') {
            if header.is_some() {
                return Err(GcnfParseError::DuplicateHeader);
            }
            header = Some(line.parse()?);
            continue;
        }

        let header = header.as_ref().ok_or(GcnfParseError::MissingHeader)?;

        for token in line.split_whitespace() {
            if let Some(group_token) = token.strip_prefix('{') {
                if group.is_some() || !clause.is_empty() || header.num_groups.is_none() {
                    return Err(GcnfParseError::InvalidGroup(token.to_owned()));
                }

                let number = group_token
                    .strip_suffix('}')
                    .and_then(|number| number.parse::<u32>().ok())
                    .ok_or_else(|| GcnfParseError::InvalidGroup(token.to_owned()))?;
                group = Some(header.check_group(number)?);
                continue;
            }

            let code = token
                .parse::<i32>()
                .map_err(|_| GcnfParseError::InvalidLiteral(token.to_owned()))?;

            let Some(literal) = NonZeroI32::new(code) else {
                parsed_clauses += 1;
                let clause = std::mem::take(&mut clause);

                let number = match header.num_groups {
                    Some(_) => group.take().ok_or(GcnfParseError::MissingGroup)?,
                    None => parsed_clauses as u32,
                };

                if number == 0 {
                    hard_clauses.push(clause);
                } else {
                    groups.entry(number).or_default().push(clause);
                }
                continue;
            };

            if literal.unsigned_abs().get() as usize > header.num_variables {
                return Err(GcnfParseError::VariableOutOfRange {
                    literal: code,
                    num_variables: header.num_variables,
                });
            }
            clause.push(literal);
        }
    }

    let header = header.ok_or(GcnfParseError::MissingHeader)?;

    if !clause.is_empty() || group.is_some() {
        Err(GcnfParseError::UnterminatedClause)
    } else if header.num_clauses != parsed_clauses {
        Err(GcnfParseError::IncorrectClauseCount {
            expected: header.num_clauses,
            parsed: parsed_clauses,
        })
    } else {
        Ok(GroupedCnf {
            num_variables: header.num_variables,
            hard_clauses,
            groups: groups.into_iter().collect(),
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct Header {
    num_variables: usize,
    num_clauses: usize,
    /// [`None`] for a plain CNF file.
    num_groups: Option<u32>,
}

impl Header {
    fn check_group(&self, group: u32) -> Result<u32, GcnfParseError> {
        match self.num_groups {
            Some(num_groups) if group > num_groups => {
                Err(GcnfParseError::GroupOutOfRange { group, num_groups })
            }
            _ => Ok(group),
        }
    }
}

impl FromStr for Header {
    type Err = GcnfParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GcnfParseError::InvalidHeader(s.to_owned());
        let components = s.split_whitespace().collect::<Vec<_>>();

        let number = |index: usize| -> Result<usize, GcnfParseError> {
            components
                .get(index)
                .and_then(|component| component.parse::<usize>().ok())
                .ok_or_else(invalid)
        };

        match components.as_slice() {
            ["p", "cnf", _, _] => Ok(Header {
                num_variables: number(2)?,
                num_clauses: number(3)?,
                num_groups: None,
            }),
            ["p", "gcnf", _, _, _] => Ok(Header {
                num_variables: number(2)?,
                num_clauses: number(3)?,
                num_groups: Some(u32::try_from(number(4)?).map_err(|_| invalid())?),
            }),
            _ => Err(invalid()),
        }
    }
}
