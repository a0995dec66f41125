use std::time::Duration;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, one_of};
use nom::combinator::{all_consuming, map, map_res, opt, recognize, verify};
use nom::multi::many1;
use nom::sequence::{pair, preceded, terminated, tuple};
use nom::IResult;

use crate::error::{AnalyzerError, AnalyzerResult};

const MILLIS_PER_SECOND: f64 = 1_000.0;
const MILLIS_PER_MINUTE: f64 = 60.0 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: f64 = 60.0 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: f64 = 24.0 * MILLIS_PER_HOUR;
const MILLIS_PER_WEEK: f64 = 7.0 * MILLIS_PER_DAY;
const MILLIS_PER_YEAR: f64 = 365.0 * MILLIS_PER_DAY;

fn decimal(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(digit1, opt(pair(one_of(".,"), digit1)))),
        |s: &str| s.replace(',', ".").parse::<f64>(),
    )(input)
}

type TimeParts = (Option<f64>, Option<f64>, Option<f64>);

fn sign(input: &str) -> IResult<&str, f64> {
    map(opt(one_of("+-")), |c| if c == Some('-') { -1.0 } else { 1.0 })(input)
}

fn iso_component<'a>(designators: &'static str, scale: f64) -> impl FnMut(&'a str) -> IResult<&'a str, f64> {
    map(terminated(decimal, one_of(designators)), move |v| v * scale)
}

/// `PnDTnHnMn.nS`, as produced by java.time.Duration and friends.
fn iso_duration(input: &str) -> IResult<&str, f64> {
    let time_part = preceded(
        one_of("tT"),
        verify(
            tuple((
                opt(iso_component("hH", MILLIS_PER_HOUR)),
                opt(iso_component("mM", MILLIS_PER_MINUTE)),
                opt(iso_component("sS", MILLIS_PER_SECOND)),
            )),
            |(h, m, s): &TimeParts| h.is_some() || m.is_some() || s.is_some(),
        ),
    );
    let body = verify(
        pair(opt(iso_component("dD", MILLIS_PER_DAY)), opt(time_part)),
        |(d, t): &(Option<f64>, Option<TimeParts>)| d.is_some() || t.is_some(),
    );
    map(
        tuple((sign, one_of("pP"), body)),
        |(sign, _, (days, time))| {
            let (h, m, s) = time.unwrap_or((None, None, None));
            let total = days.unwrap_or(0.0) + h.unwrap_or(0.0) + m.unwrap_or(0.0) + s.unwrap_or(0.0);
            sign * total
        },
    )(input)
}

fn prom_unit(input: &str) -> IResult<&str, f64> {
    alt((
        map(tag("ms"), |_| 1.0),
        map(char('s'), |_| MILLIS_PER_SECOND),
        map(char('m'), |_| MILLIS_PER_MINUTE),
        map(char('h'), |_| MILLIS_PER_HOUR),
        map(char('d'), |_| MILLIS_PER_DAY),
        map(char('w'), |_| MILLIS_PER_WEEK),
        map(char('y'), |_| MILLIS_PER_YEAR),
    ))(input)
}

/// `1h30m`, `500ms`, `-5m`.
fn prom_duration(input: &str) -> IResult<&str, f64> {
    map(
        pair(sign, many1(pair(decimal, prom_unit))),
        |(sign, parts)| sign * parts.iter().map(|(v, scale)| v * scale).sum::<f64>(),
    )(input)
}

/// A bare integer is taken as milliseconds.
fn bare_millis(input: &str) -> IResult<&str, f64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| s.parse::<i64>().map(|v| v as f64))(input)
}

/// Parses a duration into signed milliseconds.
pub fn parse_duration_millis(arg: &str) -> AnalyzerResult<i64> {
    let trimmed = arg.trim();
    let parsed = all_consuming(alt((iso_duration, prom_duration, bare_millis)))(trimmed);
    match parsed {
        Ok((_, millis)) if millis.is_finite() => Ok(millis.round() as i64),
        _ => Err(AnalyzerError::InvalidDuration(arg.to_string())),
    }
}

/// Parses a lookback range. The range must be strictly positive.
pub fn parse_range(arg: &str) -> AnalyzerResult<Duration> {
    let millis = parse_duration_millis(arg)?;
    if millis <= 0 {
        return Err(AnalyzerError::NonPositiveDuration(arg.to_string()));
    }
    Ok(Duration::from_millis(millis as u64))
}
