// ABOUTME: Lenient parsing of function-call arguments produced by the model.
// ABOUTME: Falls back to JSON5 after escaping raw control characters in strings.

use serde::de::DeserializeOwned;

use crate::error::CommandError;

/// Parse function-call arguments, tolerating near-valid JSON.
///
/// Strict JSON is tried first. On failure, raw newlines and tabs inside
/// string literals are escaped and the result is read as JSON5, which also
/// accepts trailing commas, single quotes and unquoted keys. Input that
/// still cannot be read reports the original JSON error.
pub(crate) fn parse_arguments<T: DeserializeOwned>(arguments: &str) -> Result<T, CommandError> {
    let err = match serde_json::from_str(arguments) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    let repaired = escape_control_characters(arguments);
    match json5::from_str(&repaired) {
        Ok(value) => {
            tracing::debug!(error = %err, "repaired function arguments");
            Ok(value)
        }
        Err(_) => Err(CommandError::MalformedArguments(err)),
    }
}

/// Escape control characters that appear inside quoted strings.
fn escape_control_characters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in text.chars() {
        let Some(open) = quote else {
            if c == '"' || c == '\'' {
                quote = Some(c);
            }
            out.push(c);
            continue;
        };

        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == open => {
                quote = None;
                out.push(c);
            }
            c => out.push(c),
        }
    }

    out
}
