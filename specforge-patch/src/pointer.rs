//! Slash-delimited pointer parsing and navigation
//!
//! Paths follow the JSON Pointer convention: they begin with `/`, segments
//! escape `/` as `~1` and `~` as `~0`, and the token `-` addresses one past
//! the end of a sequence. The root (`""` or `"/"`) is never a legal mutation
//! target.

use serde_json::Value;
use specforge_core::PatchError;

/// One-past-the-end sequence token.
pub const END_TOKEN: &str = "-";

/// Parse a pointer into its unescaped segments. Root paths are rejected here
/// so no caller can ever address the whole document.
pub fn parse_pointer(path: &str) -> Result<Vec<String>, PatchError> {
    if path.is_empty() || path == "/" {
        return Err(PatchError::ForbiddenTarget {
            path: path.to_string(),
        });
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(PatchError::MalformedPath {
            path: path.to_string(),
            reason: "pointer must begin with '/'".to_string(),
        });
    };
    rest.split('/').map(|raw| unescape(path, raw)).collect()
}

/// Escape a single segment for embedding in a pointer.
pub fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape(path: &str, raw: &str) -> Result<String, PatchError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            other => {
                return Err(PatchError::MalformedPath {
                    path: path.to_string(),
                    reason: match other {
                        Some(c) => format!("invalid escape '~{}'", c),
                        None => "dangling '~' escape".to_string(),
                    },
                })
            }
        }
    }
    Ok(out)
}

/// Interpret a token as a sequence index. `allow_end` permits the
/// one-past-the-end slot (`-` or index == len); navigation and every op
/// except `set` address existing slots only.
pub fn seq_index(
    path: &str,
    token: &str,
    len: usize,
    allow_end: bool,
) -> Result<usize, PatchError> {
    let out_of_range = || PatchError::IndexOutOfRange {
        path: path.to_string(),
        index: token.to_string(),
        len,
    };
    let idx = if token == END_TOKEN {
        len
    } else {
        token.parse::<usize>().map_err(|_| out_of_range())?
    };
    let in_range = if allow_end { idx <= len } else { idx < len };
    if in_range {
        Ok(idx)
    } else {
        Err(out_of_range())
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Walk every token but the last, returning the resolved parent container and
/// the final unconsumed token for the caller to interpret.
pub fn resolve<'a, 'b>(
    root: &'a mut Value,
    path: &str,
    tokens: &'b [String],
) -> Result<(&'a mut Value, &'b str), PatchError> {
    let (last, walk) = tokens
        .split_last()
        .ok_or_else(|| PatchError::MalformedPath {
            path: path.to_string(),
            reason: "empty pointer".to_string(),
        })?;

    let mut current = root;
    for token in walk {
        current = match current {
            Value::Object(map) => {
                map.get_mut(token)
                    .ok_or_else(|| PatchError::NotFound {
                        path: path.to_string(),
                        segment: token.clone(),
                    })?
            }
            Value::Array(seq) => {
                let idx = seq_index(path, token, seq.len(), false)?;
                &mut seq[idx]
            }
            scalar => {
                return Err(PatchError::TypeMismatch {
                    path: path.to_string(),
                    expected: "object or array",
                    found: value_kind(scalar),
                })
            }
        };
    }
    Ok((current, last.as_str()))
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any segment survives escape -> parse round trip, including ones
        /// containing the separator and escape characters.
        #[test]
        fn prop_escape_round_trips(segment in ".+") {
            let path = format!("/{}", escape(&segment));
            let tokens = parse_pointer(&path).unwrap();
            prop_assert_eq!(tokens, vec![segment]);
        }

        /// Multi-segment pointers keep segment count and content.
        #[test]
        fn prop_multi_segment_round_trips(
            segments in prop::collection::vec("[a-z~/0-9]{0,8}", 2..5)
        ) {
            let path: String = segments
                .iter()
                .map(|s| format!("/{}", escape(s)))
                .collect();
            let tokens = parse_pointer(&path).unwrap();
            prop_assert_eq!(tokens, segments);
        }
    }
}
