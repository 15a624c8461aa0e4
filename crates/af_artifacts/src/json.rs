//! # JSON conventions
//!
//! Two emission modes, both canonical:
//! - pretty: two-space indentation plus a trailing newline (summary,
//!   resolved config, checkpoints)
//! - compact: no spaces, one object per line (action log)

use serde::Serialize;

use af_types::{ForgeError, ForgeResult};

/// Pretty document: two-space indent, final newline.
pub fn to_pretty_document<T: Serialize>(value: &T) -> ForgeResult<String> {
    let mut body = serde_json::to_string_pretty(value)
        .map_err(|e| ForgeError::ArtifactWrite(format!("JSON serialization failed: {}", e)))?;
    body.push('\n');
    Ok(body)
}

/// Compact single-line object (no trailing newline; the caller joins lines).
pub fn to_compact_line<T: Serialize>(value: &T) -> ForgeResult<String> {
    serde_json::to_string(value)
        .map_err(|e| ForgeError::ArtifactWrite(format!("JSON serialization failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Doc {
        a: u32,
        b: &'static str,
    }

    #[test]
    fn pretty_uses_two_space_indent_and_trailing_newline() {
        let doc = to_pretty_document(&Doc { a: 1, b: "x" }).unwrap();
        assert!(doc.starts_with("{\n  \"a\": 1"));
        assert!(doc.ends_with("}\n"));
    }

    #[test]
    fn compact_has_no_spaces() {
        let line = to_compact_line(&Doc { a: 1, b: "x" }).unwrap();
        assert_eq!(line, "{\"a\":1,\"b\":\"x\"}");
    }
}
