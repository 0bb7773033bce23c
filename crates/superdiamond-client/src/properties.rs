//! Reader for the line-oriented properties text format.
//!
//! Follows the usual properties conventions: `#` and `!` start comment lines,
//! keys end at the first unescaped `=`, `:` or whitespace, an odd number of
//! trailing backslashes joins the next line, and `\t`, `\n`, `\r`, `\f` and
//! `\uXXXX` escapes are decoded. Pairs are returned in file order, duplicates
//! included.

use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

const WHITESPACE: [char; 3] = [' ', '\t', '\u{c}'];

/// Errors raised while reading properties text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertiesError {
    /// A `\u` escape was not followed by four hex digits naming a character.
    #[error("line {line}: malformed \\uXXXX escape")]
    MalformedUnicodeEscape {
        /// One-based line number where the logical line starts.
        line: usize,
    },
}

/// Parses properties text into ordered `(key, value)` pairs.
pub fn parse(text: &str) -> Result<Vec<(String, String)>, PropertiesError> {
    parse_from_line(text, 1)
}

/// Parses `text`, numbering its first line `first_line` in error reports.
pub(crate) fn parse_from_line(
    text: &str,
    first_line: usize,
) -> Result<Vec<(String, String)>, PropertiesError> {
    let mut entries = Vec::new();
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .enumerate();

    while let Some((index, line)) = lines.next() {
        let content = line.trim_start_matches(WHITESPACE);
        if content.is_empty() || content.starts_with(['#', '!']) {
            continue;
        }

        let mut logical = content.to_owned();
        while has_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start_matches(WHITESPACE)),
                None => break,
            }
        }
        entries.push(split_entry(&logical, first_line + index)?);
    }

    Ok(entries)
}

fn has_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|ch| *ch == '\\').count() % 2 == 1
}

fn split_entry(line: &str, number: usize) -> Result<(String, String), PropertiesError> {
    let mut chars = line.chars().peekable();
    let mut key = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => key.extend(unescape(&mut chars, number)?),
            '=' | ':' => break,
            ch if WHITESPACE.contains(&ch) => {
                skip_whitespace(&mut chars);
                if matches!(chars.peek(), Some('=' | ':')) {
                    chars.next();
                }
                break;
            }
            ch => key.push(ch),
        }
    }

    skip_whitespace(&mut chars);
    let mut value = String::new();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            value.extend(unescape(&mut chars, number)?);
        } else {
            value.push(ch);
        }
    }

    Ok((key, value))
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|ch| WHITESPACE.contains(ch)).is_some() {}
}

fn unescape(
    chars: &mut Peekable<Chars<'_>>,
    line: usize,
) -> Result<Option<char>, PropertiesError> {
    let decoded = match chars.next() {
        Some('t') => '\t',
        Some('n') => '\n',
        Some('r') => '\r',
        Some('f') => '\u{c}',
        Some('u') => decode_unicode(chars, line)?,
        Some(other) => other,
        None => return Ok(None),
    };
    Ok(Some(decoded))
}

fn decode_unicode(chars: &mut Peekable<Chars<'_>>, line: usize) -> Result<char, PropertiesError> {
    let malformed = || PropertiesError::MalformedUnicodeEscape { line };
    let high = read_hex4(chars).ok_or_else(malformed)?;
    if !(0xD800..=0xDBFF).contains(&high) {
        return char::from_u32(high).ok_or_else(malformed);
    }

    // A high surrogate must be followed by its low half as another escape.
    if chars.next() != Some('\\') || chars.next() != Some('u') {
        return Err(malformed());
    }
    let low = read_hex4(chars).ok_or_else(malformed)?;
    if !(0xDC00..=0xDFFF).contains(&low) {
        return Err(malformed());
    }
    let combined = 0x1_0000 + ((high - 0xD800) << 10) + (low - 0xDC00);
    char::from_u32(combined).ok_or_else(malformed)
}

fn read_hex4(chars: &mut Peekable<Chars<'_>>) -> Option<u32> {
    let mut code = 0_u32;
    for _ in 0..4 {
        let digit = chars.next()?.to_digit(16)?;
        code = code * 16 + digit;
    }
    Some(code)
}
