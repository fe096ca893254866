//! Duration strings
//!
//! Intervals in the config file use the compact unit syntax common to
//! daemon configs: a sequence of decimal numbers, each with an optional
//! fraction and a mandatory unit suffix, such as `"300ms"`, `"1.5h"` or
//! `"2h45m"`. Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`.

use crate::error::{Error, Result};
use std::time::Duration;

const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 60 * 60 * 1_000_000_000),
];

/// Parse a duration string such as `"30s"` or `"1h30m"`.
///
/// A bare `"0"` is accepted and yields a zero duration; use
/// [`parse_positive_duration`] where zero is meaningless.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let original = input;
    let mut rest = input.trim();

    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    } else if rest.starts_with('-') {
        return Err(invalid(original, "negative durations are not allowed"));
    }

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid(original, "empty duration"));
    }

    let mut total_nanos: u128 = 0;

    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_number) = match after_int.strip_prefix('.') {
            Some(after_dot) => {
                let frac_len = after_dot
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after_dot.len());
                after_dot.split_at(frac_len)
            }
            None => ("", after_int),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid(original, "expected a number"));
        }

        let unit_len = after_number
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_number.len());
        let (unit, remaining) = after_number.split_at(unit_len);

        if unit.is_empty() {
            return Err(invalid(original, "missing unit"));
        }

        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| invalid(original, &format!("unknown unit {unit:?}")))?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| invalid(original, "number out of range"))?
        };

        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| invalid(original, "duration out of range"))?;

        if !frac_part.is_empty() {
            // Digits beyond nanosecond precision for the unit carry no weight.
            let mut frac_nanos: u128 = 0;
            let mut place = scale;
            for digit in frac_part.bytes() {
                place /= 10;
                if place == 0 {
                    break;
                }
                frac_nanos += u128::from(digit - b'0') * place;
            }
            nanos = nanos
                .checked_add(frac_nanos)
                .ok_or_else(|| invalid(original, "duration out of range"))?;
        }

        total_nanos = total_nanos
            .checked_add(nanos)
            .ok_or_else(|| invalid(original, "duration out of range"))?;
        rest = remaining;
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000)
        .map_err(|_| invalid(original, "duration out of range"))?;
    let subsec = (total_nanos % 1_000_000_000) as u32;

    Ok(Duration::new(secs, subsec))
}

/// Parse a duration string and reject zero.
pub fn parse_positive_duration(input: &str) -> Result<Duration> {
    let duration = parse_duration(input)?;
    if duration.is_zero() {
        return Err(invalid(input, "duration must be greater than zero"));
    }
    Ok(duration)
}

fn invalid(input: &str, reason: &str) -> Error {
    Error::config(format!("invalid duration {input:?}: {reason}"))
}
