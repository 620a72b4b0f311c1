//! Port specification parsing built on `nom`.
//!
//! Only the container-side port survives conversion: every instance shares
//! one network namespace, so host publishing has no meaning on the target.
//! Short syntax follows `[[ip:]host[-range]:]container[-range][/protocol]`.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_until, take_while},
    character::complete::{alpha1, char, digit1},
    combinator::{all_consuming, map_res, opt, recognize},
    multi::many0,
    sequence::{delimited, preceded, terminated},
};
use thiserror::Error;

use crate::parser::ast::{PortObject, PortSpec, Scalar};

/// Reasons a port entry cannot be turned into a container port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// The text does not follow the short port syntax.
    #[error("invalid port syntax \"{0}\"")]
    Syntax(String),
    /// The number is not a usable TCP/UDP port.
    #[error("port {0} is outside 1-65535")]
    OutOfRange(u64),
    /// A long-syntax entry without `target`.
    #[error("port object has no \"target\"")]
    MissingTarget,
}

/// Inclusive port range; a single port has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    /// First port.
    pub start: u16,
    /// Last port.
    pub end: u16,
}

/// Port sides of a short-syntax entry. The host address and protocol
/// suffix are checked by the grammar but not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortPort {
    /// Host-side port or range.
    pub published: Option<PortRange>,
    /// Container-side port or range.
    pub container: PortRange,
}

fn port_number(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |digits: &str| digits.parse::<u16>()).parse(input)
}

fn port_range(input: &str) -> IResult<&str, PortRange> {
    let (input, start) = port_number(input)?;
    let (input, end) = opt(preceded(char('-'), port_number)).parse(input)?;
    Ok((
        input,
        PortRange {
            start,
            end: end.unwrap_or(start),
        },
    ))
}

/// One `:`-terminated prefix segment: a bracketed IPv6 address or plain text.
fn host_segment(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(delimited(char('['), take_until("]"), char(']'))),
        take_while(|c: char| c != ':' && c != '/' && c != '['),
    ))
    .parse(input)
}

type ShortParts<'a> = (Vec<&'a str>, PortRange, Option<&'a str>);

fn short_syntax(input: &str) -> IResult<&str, ShortParts<'_>> {
    all_consuming((
        many0(terminated(host_segment, char(':'))),
        port_range,
        opt(preceded(char('/'), alpha1)),
    ))
    .parse(input)
}

fn checked_range(range: PortRange, text: &str) -> Result<PortRange, PortError> {
    if range.start == 0 {
        return Err(PortError::OutOfRange(0));
    }
    if range.end < range.start {
        return Err(PortError::Syntax(text.to_string()));
    }
    Ok(range)
}

/// Parses a short-syntax port string.
///
/// # Errors
///
/// Returns [`PortError::Syntax`] when the text does not match the grammar
/// and [`PortError::OutOfRange`] for port `0`.
pub fn parse_short(text: &str) -> Result<ShortPort, PortError> {
    let trimmed = text.trim();
    let (_, (prefix, container, _protocol)) =
        short_syntax(trimmed).map_err(|_| PortError::Syntax(text.to_string()))?;

    let published = match prefix.as_slice() {
        [] => None,
        [published] | [_, published] => Some(*published),
        _ => return Err(PortError::Syntax(text.to_string())),
    };

    let published = match published {
        Some(segment) if !segment.is_empty() => {
            let (_, range) = all_consuming(port_range)
                .parse(segment)
                .map_err(|_| PortError::Syntax(text.to_string()))?;
            Some(checked_range(range, text)?)
        }
        _ => None,
    };

    Ok(ShortPort {
        published,
        container: checked_range(container, text)?,
    })
}

fn from_number(number: u64) -> Result<u16, PortError> {
    u16::try_from(number)
        .ok()
        .filter(|port| *port != 0)
        .ok_or(PortError::OutOfRange(number))
}

fn from_text(text: &str) -> Result<u16, PortError> {
    parse_short(text).map(|port| port.container.start)
}

fn from_object(object: &PortObject) -> Result<u16, PortError> {
    match &object.target {
        None => Err(PortError::MissingTarget),
        Some(Scalar::Int(n)) => u64::try_from(*n)
            .map_err(|_| PortError::Syntax(n.to_string()))
            .and_then(from_number),
        Some(Scalar::String(s)) => from_text(s),
        Some(other) => Err(PortError::Syntax(other.to_string())),
    }
}

/// Resolves the container-side port of one `ports` entry.
///
/// A range resolves to its first port.
///
/// # Errors
///
/// Returns a [`PortError`] describing why the entry is unusable.
pub fn container_port(spec: &PortSpec) -> Result<u16, PortError> {
    match spec {
        PortSpec::Number(number) => from_number(*number),
        PortSpec::Text(text) => from_text(text),
        PortSpec::Object(object) => from_object(object),
    }
}
