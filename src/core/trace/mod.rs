//! Tokenizes a trace line into an [`Operation`]. This is the input parser
//! the spec calls out as an external collaborator (§1) rather than part
//! of THE CORE — it has no knowledge of sites, locks, or transactions,
//! only of the textual format in §6.

use crate::core::common::error::SimError;

/// One parsed trace operation. Unknown `op_name`s are not represented
/// here — `parse_line` returns `Ok(None)` for them so the caller can
/// silently skip, matching §6 ("Unknown operations are skipped").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Begin { t: String },
    BeginReadOnly { t: String },
    Read { t: String, x: String },
    Write { t: String, x: String, v: i64 },
    End { t: String },
    Fail { site: String },
    Recover { site: String },
    Dump { x: Option<String> },
}

/// Parses one non-blank, non-comment trace line of the form
/// `op_name(arg1, arg2, ...)`. Returns `Ok(None)` for a recognized-shape
/// call whose `op_name` isn't one of the recognized operations (skip),
/// and `Err(SimError::MalformedLine)` only when the line cannot be
/// tokenized into `(op_name, args)` at all.
pub fn parse_line(line: &str) -> Result<Option<Operation>, SimError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("//") {
        return Ok(None);
    }

    let open = line.find('(').ok_or_else(|| SimError::MalformedLine(line.to_string()))?;
    let close = line.rfind(')').ok_or_else(|| SimError::MalformedLine(line.to_string()))?;
    if close < open {
        return Err(SimError::MalformedLine(line.to_string()));
    }

    let op_name = line[..open].trim();
    let raw_args = &line[open + 1..close];
    let args: Vec<&str> = if raw_args.trim().is_empty() {
        Vec::new()
    } else {
        raw_args.split(',').map(str::trim).collect()
    };

    let op = match op_name {
        "begin" => args.first().map(|t| Operation::Begin { t: (*t).to_string() }),
        "beginRO" => args.first().map(|t| Operation::BeginReadOnly { t: (*t).to_string() }),
        "R" => match (args.first(), args.get(1)) {
            (Some(t), Some(x)) => Some(Operation::Read { t: (*t).to_string(), x: (*x).to_string() }),
            _ => None,
        },
        "W" => match (args.first(), args.get(1), args.get(2)) {
            (Some(t), Some(x), Some(v)) => v
                .parse::<i64>()
                .ok()
                .map(|v| Operation::Write { t: (*t).to_string(), x: (*x).to_string(), v }),
            _ => None,
        },
        "end" => args.first().map(|t| Operation::End { t: (*t).to_string() }),
        "fail" => args.first().map(|s| Operation::Fail { site: (*s).to_string() }),
        "recover" => args.first().map(|s| Operation::Recover { site: (*s).to_string() }),
        "dump" => Some(Operation::Dump { x: args.first().map(|s| (*s).to_string()) }),
        _ => None,
    };
    Ok(op)
}

/// Parses an entire trace file's contents, line by line. A malformed line
/// is a `FATAL` per §7 ("logged; does not terminate the run; operation
/// returns failure value"), so it is skipped rather than aborting the
/// whole parse — every other line in the file still runs. Malformed lines
/// are returned alongside the successfully parsed operations so the
/// caller can report them.
pub fn parse_trace(contents: &str) -> (Vec<Operation>, Vec<SimError>) {
    let mut ops = Vec::new();
    let mut errors = Vec::new();
    for line in contents.lines() {
        match parse_line(line) {
            Ok(Some(op)) => ops.push(op),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }
    (ops, errors)
}
