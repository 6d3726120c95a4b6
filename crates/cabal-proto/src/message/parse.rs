//! Nom-based line parser.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

/// Tags section, without the leading `@`.
fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

/// Source prefix, without the leading `:`.
fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

/// Command word: letters only, or exactly three digits.
fn parse_command(input: &str) -> IResult<&str, &str> {
    let (rest, cmd) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;

    let is_word = cmd.chars().all(|c| c.is_ascii_alphabetic());
    let is_numeric = cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit());

    if is_word || is_numeric {
        Ok((rest, cmd))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::AlphaNumeric,
        )))
    }
}

/// Parameters after the command, at most 15, the last possibly trailing.
fn parse_params(input: &str) -> (&str, SmallVec<[&str; 15]>) {
    let mut params: SmallVec<[&str; 15]> = SmallVec::new();
    let mut rest = input;

    while rest.starts_with(' ') {
        if params.len() >= 15 {
            break;
        }

        rest = rest.trim_start_matches(' ');
        if rest.is_empty() || rest.starts_with(['\r', '\n']) {
            break;
        }

        if let Some(after_colon) = rest.strip_prefix(':') {
            let end = after_colon.find(['\r', '\n']).unwrap_or(after_colon.len());
            params.push(&after_colon[..end]);
            rest = &after_colon[end..];
            break;
        }

        let end = rest.find([' ', '\r', '\n']).unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    (rest, params)
}

/// A line split into borrowed components.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedLine<'a> {
    pub tags: Option<&'a str>,
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: SmallVec<[&'a str; 15]>,
}

/// `[@tags] [:prefix] <command> [params...] [:trailing]`
fn parse_line(input: &str) -> IResult<&str, ParsedLine<'_>> {
    let (input, tags) = opt(parse_tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, prefix) = opt(parse_prefix)(input)?;
    let (input, _) = space0(input)?;
    let (input, command) = parse_command(input)?;
    let (rest, params) = parse_params(input);

    Ok((
        rest,
        ParsedLine {
            tags,
            prefix,
            command,
            params,
        },
    ))
}

impl<'a> ParsedLine<'a> {
    /// Parse a line, returning the byte offset of the failure on error.
    pub fn parse(input: &'a str) -> Result<Self, usize> {
        match parse_line(input) {
            Ok((_, line)) => Ok(line),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(input.len() - e.input.len()),
            Err(nom::Err::Incomplete(_)) => Err(input.len()),
        }
    }
}
