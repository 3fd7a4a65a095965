use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

static NUMERIC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\^?(\d+)\$?$").expect("numeric pattern is valid"));

/// Rewrites `/pattern/i` values into `{"$regex": "pattern", "$options": "i"}`.
///
/// Literals are recognised in value position only (after `:`, `[` or `,`)
/// and never inside quoted strings.
#[must_use]
pub fn normalize_regex_literals(body: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut copied = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut previous: Option<char> = None;
    let mut index = 0;

    while let Some(c) = body[index..].chars().next() {
        let next = index + c.len_utf8();

        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
                previous = Some(c);
            }
            index = next;
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '/' if matches!(previous, Some(':' | '[' | ',')) => {
                if let Some((pattern, end)) = regex_literal(body, index) {
                    out.push_str(&body[copied..index]);
                    let pattern = Value::String(pattern.to_string());
                    out.push_str(&format!("{{\"$regex\": {pattern}, \"$options\": \"i\"}}"));
                    copied = end;
                    previous = Some('}');
                    index = end;
                    continue;
                }
            }
            _ => {}
        }
        if !c.is_whitespace() {
            previous = Some(c);
        }
        index = next;
    }

    if copied == 0 {
        Cow::Borrowed(body)
    } else {
        out.push_str(&body[copied..]);
        Cow::Owned(out)
    }
}

/// Matches `/pattern/i` starting at the slash at `start`, returning the
/// pattern and the index just past the flag.
fn regex_literal(body: &str, start: usize) -> Option<(&str, usize)> {
    let rest = &body[start + 1..];
    let mut escaped = false;

    for (offset, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '\n' => return None,
            '/' => {
                if offset == 0 {
                    return None;
                }
                let flag_at = start + 1 + offset + 1;
                let after = body[flag_at..].strip_prefix('i')?;
                if after.chars().next().is_some_and(is_ident_char) {
                    return None;
                }
                return Some((&rest[..offset], flag_at + 1));
            }
            _ => {}
        }
    }
    None
}

/// Replaces regex filters that only match a whole number with the number.
///
/// Generators regularly express `{id: 9}` as `{id: {"$regex": "^9$"}}`, which
/// never matches a numeric field.
pub fn coerce_numeric_regex(filter: &mut Map<String, Value>) {
    for value in filter.values_mut() {
        let Some(number) = numeric_regex(value) else {
            continue;
        };
        *value = Value::from(number);
    }
}

fn numeric_regex(value: &Value) -> Option<i64> {
    let operator = value.as_object()?;
    let pattern = operator
        .get("$regex")
        .or_else(|| operator.get("regex"))?
        .as_str()?;
    let digits = NUMERIC_PATTERN.captures(pattern)?.get(1)?.as_str();
    digits.parse().ok()
}

/// Turns the relaxed object syntax generators emit into strict JSON.
///
/// Bare identifier keys get quoted and single-quoted strings become
/// double-quoted. Anything else is copied through for `serde_json` to judge.
pub(crate) fn relax_json(fragment: &str) -> String {
    let chars: Vec<char> = fragment.chars().collect();
    let mut out = String::with_capacity(fragment.len() + 16);
    let mut expect_key = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                i = copy_string(&chars, i, &mut out);
                expect_key = false;
                continue;
            }
            '{' | ',' => {
                out.push(c);
                expect_key = true;
            }
            c if c.is_whitespace() => out.push(c),
            c if expect_key && is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let mut lookahead = i;
                while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                    lookahead += 1;
                }
                if chars.get(lookahead) == Some(&':') {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
                expect_key = false;
                continue;
            }
            _ => {
                out.push(c);
                expect_key = false;
            }
        }
        i += 1;
    }
    out
}

/// Copies the string literal starting at `start` as a double-quoted JSON
/// string and returns the index just past it.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            match chars.get(i + 1) {
                Some('\'') if quote == '\'' => out.push('\''),
                Some(&next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
            i += 2;
            continue;
        }
        if c == quote {
            out.push('"');
            return i + 1;
        }
        if c == '"' {
            out.push_str("\\\"");
        } else {
            out.push(c);
        }
        i += 1;
    }
    i
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}
