// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Dotted-path extraction over Jira JSON (objects and array indices) with typed, lenient conversion
// role: extension/serde_json
// outputs: JsonFetch trait and JsonFetched wrapper; list helpers for Jira "array of {name}" shapes
// invariants: No panics; missing paths and JSON null yield None; to_or_default returns T::default on failure
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::de::DeserializeOwned;

/// A located JSON value awaiting typed extraction.
pub struct JsonFetched<'a> {
  inner: Option<&'a serde_json::Value>,
}

impl<'a> JsonFetched<'a> {
  /// Deserialize as `T`; JSON null is treated as absent.
  pub fn to<T>(&self) -> Option<T>
  where
    T: DeserializeOwned,
  {
    self
      .inner
      .filter(|v| !v.is_null())
      .and_then(|v| T::deserialize(v).ok())
  }

  pub fn to_or_default<T>(&self) -> T
  where
    T: DeserializeOwned + Default,
  {
    self.to::<T>().unwrap_or_default()
  }

  /// Collect `field` from every object of an array (e.g. `components[].name`).
  pub fn names(&self, field: &str) -> Vec<String> {
    let Some(arr) = self.inner.and_then(|v| v.as_array()) else {
      return Vec::new();
    };

    arr
      .iter()
      .filter_map(|item| item.get(field).and_then(|n| n.as_str()))
      .map(str::to_string)
      .collect()
  }
}

/// Fetch nested values via dotted paths like "fields.status.statusCategory.key".
/// Numeric segments index into arrays ("issues.0.key").
pub trait JsonFetch {
  fn fetch(&self, path: &str) -> JsonFetched<'_>;
}

impl JsonFetch for serde_json::Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched { inner: Some(self) };
    }

    let mut cur = self;

    for key in path.split('.') {
      let next = match cur {
        serde_json::Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => cur.get(key),
      };

      match next {
        Some(v) => cur = v,
        None => return JsonFetched { inner: None },
      }
    }

    JsonFetched { inner: Some(cur) }
  }
}
