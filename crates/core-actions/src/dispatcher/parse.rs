//! Action line and argument parsing.
//!
//! An action line is `Name(arg, arg, ...)` with `;`-separated actions on
//! one line; bare `Name` and `Name()` are equivalent. Arguments may be
//! quoted to carry commas or parentheses. Numeric arguments accept an
//! optional unit suffix (`mm`, `mil`, `cmil`, `in`; absent means internal
//! units) and a `+`/`-` prefix marking the value as relative.
//!
//! Parsing is pure classification: no side effects, errors come back as
//! values for the dispatcher to message.

use core_geom::{Coord, MIL, MM, round_away};

/// One parsed action invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCall {
    pub name: String,
    pub args: Vec<String>,
}

/// Split an input line into action calls. Returns `Err` with a short
/// description when brackets or quotes do not balance.
pub fn parse_action_line(line: &str) -> Result<Vec<ActionCall>, String> {
    let mut out = Vec::new();
    let mut rest = line.trim();
    while !rest.is_empty() {
        // Name runs to '(' or separator.
        let name_end = rest
            .find(|c: char| c == '(' || c == ';')
            .unwrap_or(rest.len());
        let name = rest[..name_end].trim();
        if name.is_empty() {
            return Err("missing action name".into());
        }
        let mut args = Vec::new();
        rest = rest[name_end..].trim_start();
        if let Some(stripped) = rest.strip_prefix('(') {
            let (parsed, remainder) = parse_args(stripped)?;
            args = parsed;
            rest = remainder.trim_start();
        }
        out.push(ActionCall {
            name: name.to_string(),
            args,
        });
        match rest.strip_prefix(';') {
            Some(r) => rest = r.trim_start(),
            None if rest.is_empty() => break,
            None => return Err(format!("unexpected input at {rest:?}")),
        }
    }
    Ok(out)
}

/// Parse a comma-separated argument list up to the closing parenthesis.
/// Returns the arguments and the unconsumed remainder.
fn parse_args(input: &str) -> Result<(Vec<String>, &str), String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut chars = input.char_indices();
    let mut in_quote = false;
    loop {
        let Some((i, c)) = chars.next() else {
            return Err("unterminated argument list".into());
        };
        match c {
            '"' => in_quote = !in_quote,
            ',' if !in_quote => {
                args.push(current.trim().to_string());
                current.clear();
            }
            ')' if !in_quote => {
                let trimmed = current.trim();
                if !trimmed.is_empty() || !args.is_empty() {
                    args.push(trimmed.to_string());
                }
                return Ok((args, &input[i + c.len_utf8()..]));
            }
            _ => current.push(c),
        }
    }
}

/// A numeric argument: a coordinate value plus whether it was written as a
/// relative (`+`/`-` prefixed) amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedValue {
    pub value: f64,
    pub relative: bool,
}

impl ParsedValue {
    pub fn coord(&self) -> Coord {
        round_away(self.value)
    }

    /// Resolve against a current value: relative adds, absolute replaces.
    pub fn resolve(&self, current: Coord) -> Coord {
        if self.relative {
            current + self.coord()
        } else {
            self.coord()
        }
    }
}

/// Parse a value with an optional unit suffix. `+`/`-` marks it relative
/// (a leading `-` on an absolute coordinate is still accepted as the
/// relative form, matching the interactive surface).
pub fn parse_value(arg: &str) -> Result<ParsedValue, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err("empty value".into());
    }
    let relative = arg.starts_with('+') || arg.starts_with('-');
    let (num_str, unit) = split_unit(arg);
    let number: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("bad number {num_str:?}"))?;
    let scale = match unit {
        "" => 1.0,
        "mm" => MM as f64,
        "mil" => MIL as f64,
        "cmil" => MIL as f64 / 100.0,
        "in" => MIL as f64 * 1000.0,
        other => return Err(format!("unknown unit {other:?}")),
    };
    Ok(ParsedValue {
        value: number * scale,
        relative,
    })
}

fn split_unit(arg: &str) -> (&str, &str) {
    let split = arg
        .char_indices()
        .find(|(_, c)| c.is_ascii_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(arg.len());
    (&arg[..split], arg[split..].trim())
}

/// Parse an integer argument (counts, buffer numbers, rotation steps).
pub fn parse_int(arg: &str) -> Result<i64, String> {
    arg.trim()
        .parse()
        .map_err(|_| format!("bad integer {arg:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[&str]) -> ActionCall {
        ActionCall {
            name: name.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn parses_single_action() {
        assert_eq!(
            parse_action_line("Mode(Via)").unwrap(),
            vec![call("Mode", &["Via"])]
        );
        assert_eq!(parse_action_line("Undo()").unwrap(), vec![call("Undo", &[])]);
        assert_eq!(parse_action_line("Redo").unwrap(), vec![call("Redo", &[])]);
    }

    #[test]
    fn parses_sequences_and_quotes() {
        let calls =
            parse_action_line("Mode(Via); Notify(10000, 10000) ; Message(\"a, b(c)\")").unwrap();
        assert_eq!(
            calls,
            vec![
                call("Mode", &["Via"]),
                call("Notify", &["10000", "10000"]),
                call("Message", &["a, b(c)"]),
            ]
        );
    }

    #[test]
    fn rejects_unbalanced_input() {
        assert!(parse_action_line("Mode(Via").is_err());
        assert!(parse_action_line("(oops)").is_err());
        assert!(parse_action_line("Mode(\"Via)").is_err());
    }

    #[test]
    fn unit_suffixes_scale() {
        assert_eq!(parse_value("10").unwrap().coord(), 10);
        assert_eq!(parse_value("1mm").unwrap().coord(), 1_000_000);
        assert_eq!(parse_value("10mil").unwrap().coord(), 254_000);
        assert_eq!(parse_value("100cmil").unwrap().coord(), 25_400);
        assert_eq!(parse_value("0.1in").unwrap().coord(), 2_540_000);
        assert_eq!(parse_value("1.5 mm").unwrap().coord(), 1_500_000);
    }

    #[test]
    fn relative_prefix_is_detected() {
        let v = parse_value("+5mil").unwrap();
        assert!(v.relative);
        assert_eq!(v.resolve(1000), 1000 + 127_000);
        let v = parse_value("-5mil").unwrap();
        assert!(v.relative);
        assert_eq!(v.resolve(200_000), 73_000);
        let v = parse_value("40").unwrap();
        assert!(!v.relative);
        assert_eq!(v.resolve(999), 40);
    }

    #[test]
    fn bad_values_error() {
        assert!(parse_value("").is_err());
        assert!(parse_value("12zorks").is_err());
        assert!(parse_value("twelve").is_err());
    }
}
