// Prompting and per-field parse-or-reject functions

use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::InputError;
use crate::models::{ResourceId, ShrinkRequest, Target};
use crate::units::parse_size;

/// Writes `question` and reads one line. `None` when input is closed.
pub async fn prompt<R, W>(reader: &mut R, writer: &mut W, question: &str) -> anyhow::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(writer, "{} ", question)?;
    writer.flush()?;
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        writeln!(writer)?;
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Repeats the question until `parse` accepts the answer. `None` when input is closed.
pub async fn prompt_until<R, W, T>(
    reader: &mut R,
    writer: &mut W,
    question: &str,
    mut parse: impl FnMut(&str) -> Result<T, InputError>,
) -> anyhow::Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        let Some(line) = prompt(reader, writer, question).await? else {
            return Ok(None);
        };
        match parse(&line) {
            Ok(value) => return Ok(Some(value)),
            Err(e) => writeln!(writer, "  ! {}", e)?,
        }
    }
}

pub fn parse_target_count(raw: &str, max: usize) -> Result<usize, InputError> {
    let n: usize = raw
        .trim()
        .parse()
        .map_err(|_| InputError::new("target count", format!("'{}' is not a number", raw.trim())))?;
    if n == 0 || n > max {
        return Err(InputError::new(
            "target count",
            format!("must be between 1 and {}", max),
        ));
    }
    Ok(n)
}

/// Host names, IP addresses (optionally with `:port` or `[v6]`) and the `.` alias.
pub fn parse_target_name(raw: &str, existing: &[Target]) -> Result<Target, InputError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(InputError::new("target", "must not be empty"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '[' | ']')))
    {
        return Err(InputError::new(
            "target",
            format!("'{}' is not allowed in a host name", bad),
        ));
    }
    if existing.iter().any(|t| t.name().eq_ignore_ascii_case(name)) {
        return Err(InputError::new("target", format!("{} was already entered", name)));
    }
    Ok(Target::new(name))
}

pub fn parse_resource(raw: &str) -> Result<ResourceId, InputError> {
    ResourceId::parse(raw)
}

pub fn parse_username(raw: &str) -> Result<String, InputError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(InputError::new("username", "must not be empty"));
    }
    Ok(name.to_string())
}

pub fn parse_password(raw: &str) -> Result<String, InputError> {
    if raw.is_empty() {
        return Err(InputError::new("password", "must not be empty"));
    }
    Ok(raw.to_string())
}

pub fn parse_shrink_amount(raw: &str) -> Result<ShrinkRequest, InputError> {
    let delta = parse_size(raw).map_err(|e| InputError::new("shrink amount", e))?;
    if delta <= 0 {
        return Err(InputError::new("shrink amount", "must be greater than zero"));
    }
    Ok(ShrinkRequest::new(delta))
}

/// `y` / `yes` in any case; everything else is a no.
pub fn is_affirmative(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
