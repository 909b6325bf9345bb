// Request fingerprinting
//
// Deterministic cache key derived from a tool and its normalized parameters

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::tools::{Params, ToolKind, ToolRequest};

/// Namespace so gateway keys never collide with other users of the store
pub const NAMESPACE: &str = "osint";

/// Opaque, fixed-length cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a validated request
pub fn fingerprint_request(request: &ToolRequest) -> Fingerprint {
    fingerprint(request.tool(), request.params())
}

/// Hash `<tool>\n<canonical params>` with SHA-256
pub fn fingerprint(tool: ToolKind, params: &Params) -> Fingerprint {
    let mut canonical = String::new();
    canonical.push_str(tool.as_str());
    canonical.push('\n');
    write_canonical_map(&mut canonical, params.iter());

    let digest = Sha256::digest(canonical.as_bytes());
    Fingerprint(format!("{}:{:x}", NAMESPACE, digest))
}

fn write_canonical_map<'a>(out: &mut String, entries: impl Iterator<Item = (&'a String, &'a Value)>) {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, key);
        out.push(':');
        write_canonical(out, value);
    }
    out.push('}');
}

// JSON text with object keys sorted at every level
fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => write_canonical_map(out, map.iter()),
    }
}

fn write_string(out: &mut String, s: &str) {
    // serde_json escaping keeps quotes/commas inside values unambiguous
    out.push_str(&Value::String(s.to_string()).to_string());
}
