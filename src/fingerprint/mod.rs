//! 指纹生成：从调用参数派生稳定的字符串键。
//!
//! # Fingerprint Generator
//!
//! Derives the stable key ("hash") that identifies "the same logical call".
//! The key doubles as the cache key and as the identity checked by the
//! orchestrator before any externally-visible effect.
//!
//! | Parameters (as JSON)      | Digest input                                   |
//! |---------------------------|------------------------------------------------|
//! | `null` (e.g. `()`), `[]`  | the sentinel `"default"`                       |
//! | object, or `[object]`     | entries sorted by key: `[["a",1],["b",2]]`     |
//! | array (tuples)            | the serialized argument list                   |
//! | any other scalar          | a one-element argument list: `[42]`            |
//!
//! A custom stringifier replaces the table above entirely.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Digest input used when a call has no parameters.
pub const EMPTY_PARAMS_SENTINEL: &str = "default";

/// Caller-supplied replacement for the default parameter serialization.
pub type ParamsStringifier<P> = Arc<dyn Fn(&P) -> String + Send + Sync>;

/// Computes fingerprints for a parameter type `P`.
pub struct Fingerprinter<P> {
    stringifier: Option<ParamsStringifier<P>>,
}

impl<P> Fingerprinter<P> {
    pub fn new() -> Self {
        Self { stringifier: None }
    }

    pub fn with_stringifier(stringifier: ParamsStringifier<P>) -> Self {
        Self {
            stringifier: Some(stringifier),
        }
    }
}

impl<P: Serialize> Fingerprinter<P> {
    /// Fingerprint a parameter list.
    pub fn hash(&self, parameters: &P) -> String {
        let input = match &self.stringifier {
            Some(f) => f(parameters),
            None => params_string(parameters),
        };
        digest(&input)
    }
}

impl<P> Default for Fingerprinter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for Fingerprinter<P> {
    fn clone(&self) -> Self {
        Self {
            stringifier: self.stringifier.clone(),
        }
    }
}

impl<P> fmt::Debug for Fingerprinter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("custom_stringifier", &self.stringifier.is_some())
            .finish()
    }
}

/// Canonical digest input for a parameter list.
pub fn params_string<P: Serialize>(parameters: &P) -> String {
    let value = match serde_json::to_value(parameters) {
        Ok(v) => v,
        Err(e) => {
            // e.g. maps with non-string keys
            tracing::warn!(error = %e, "parameters are not JSON-serializable, using error text");
            return format!("{}:{}", EMPTY_PARAMS_SENTINEL, e);
        }
    };

    match value {
        serde_json::Value::Null => EMPTY_PARAMS_SENTINEL.to_string(),
        serde_json::Value::Object(map) => object_unique_string(&map),
        serde_json::Value::Array(items) => match items.as_slice() {
            [] => EMPTY_PARAMS_SENTINEL.to_string(),
            [serde_json::Value::Object(map)] => object_unique_string(map),
            _ => serde_json::Value::Array(items).to_string(),
        },
        scalar => serde_json::Value::Array(vec![scalar]).to_string(),
    }
}

/// Key-order independent rendering of a keyed structure: its entries sorted by key.
pub fn object_unique_string(map: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut entries: Vec<(&String, &serde_json::Value)> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    let pairs: Vec<serde_json::Value> = entries
        .into_iter()
        .map(|(k, v)| serde_json::Value::Array(vec![serde_json::Value::String(k.clone()), v.clone()]))
        .collect();
    serde_json::Value::Array(pairs).to_string()
}

/// Hex-encoded SHA-256 of `input`.
pub fn digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_empty_params_use_sentinel() {
        let fp = Fingerprinter::<()>::new();
        assert_eq!(fp.hash(&()), digest("default"));
    }

    #[test]
    fn test_object_unique_string_sorts_keys() {
        let v = json!({"b": 2, "a": 1});
        let map = v.as_object().cloned().unwrap_or_default();
        assert_eq!(object_unique_string(&map), r#"[["a",1],["b",2]]"#);
    }

    #[test]
    fn test_key_order_does_not_change_hash() {
        let fp = Fingerprinter::<HashMap<String, i64>>::new();
        let mut first = HashMap::new();
        first.insert("zeta".to_string(), 1);
        first.insert("alpha".to_string(), 2);
        let mut second = HashMap::new();
        second.insert("alpha".to_string(), 2);
        second.insert("zeta".to_string(), 1);
        assert_eq!(fp.hash(&first), fp.hash(&second));
    }

    #[test]
    fn test_tuple_is_argument_list() {
        assert_eq!(params_string(&(1, "x")), r#"[1,"x"]"#);
        assert_eq!(params_string(&42), "[42]");
        assert_eq!(params_string(&Vec::<u8>::new()), EMPTY_PARAMS_SENTINEL);
    }

    #[test]
    fn test_single_object_argument_is_key_sorted() {
        #[derive(Serialize)]
        struct Query {
            page: u32,
            filter: &'static str,
        }
        let q = Query { page: 2, filter: "open" };
        assert_eq!(params_string(&(q,)), r#"[["filter","open"],["page",2]]"#);
    }

    #[test]
    fn test_distinct_params_distinct_hashes() {
        let fp = Fingerprinter::<(u32, u32)>::new();
        assert_ne!(fp.hash(&(1, 2)), fp.hash(&(2, 1)));
        assert_eq!(fp.hash(&(1, 2)), fp.hash(&(1, 2)));
    }

    #[test]
    fn test_custom_stringifier_overrides_default() {
        let fp = Fingerprinter::<(u32, u32)>::with_stringifier(Arc::new(|(a, b)| format!("{}-{}", a, b)));
        assert_eq!(fp.hash(&(1, 2)), digest("1-2"));
    }
}
