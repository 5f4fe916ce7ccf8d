// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Document store for user-owned data (objectives, assessments, manual key results) and the shared fetch cache
// role: persistence/documents
// inputs: collection name, document id, JSON documents
// outputs: One pretty JSON file per document under <root>/<collection>/<id>.json
// side_effects: Creates directories; writes and removes files
// invariants:
// - upsert with merge=true deep-merges objects into the existing document; merge=false replaces it
// - writes go through a temp file + rename, so readers never see half-written documents
// - no cross-document transactions; each document is consistent only with itself
// errors: IO and JSON errors surface as DashboardError::Store with the file path
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{DashboardError, Result};

pub const STRATEGIC_OBJECTIVES: &str = "strategic_objectives";
pub const ASSESSMENT_DATA: &str = "assessment_data";
pub const EPIC_PROGRESS_CACHE: &str = "epic_progress_cache";
pub const MANUAL_OKRS: &str = "manual_okrs";

pub trait DocumentStore: Send + Sync {
  fn get(&self, collection: &str, id: &str) -> Result<Option<serde_json::Value>>;
  /// All documents of a collection, ordered by id.
  fn list(&self, collection: &str) -> Result<Vec<(String, serde_json::Value)>>;
  fn upsert(&self, collection: &str, id: &str, doc: serde_json::Value, merge: bool) -> Result<()>;
  /// Returns whether a document was removed.
  fn delete(&self, collection: &str, id: &str) -> Result<bool>;
  /// Removes every document of a collection; returns how many were removed.
  fn clear(&self, collection: &str) -> Result<usize>;
}

pub struct FileDocumentStore {
  root: PathBuf,
}

impl FileDocumentStore {
  pub fn new<P: AsRef<Path>>(root: P) -> Self {
    Self { root: root.as_ref().to_path_buf() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn doc_path(&self, collection: &str, id: &str) -> PathBuf {
    self.root.join(collection).join(format!("{}.json", file_stem_for(id)))
  }
}

/// Map an arbitrary id onto a portable file stem.
fn file_stem_for(id: &str) -> String {
  id.chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
    .collect()
}

fn store_err(path: &Path, e: impl std::fmt::Display) -> DashboardError {
  DashboardError::Store(format!("{}: {}", path.display(), e))
}

/// Recursive object merge; non-object values are replaced.
fn merge_json(base: &mut serde_json::Value, patch: serde_json::Value) {
  match (base, patch) {
    (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
      for (k, v) in patch_map {
        match base_map.get_mut(&k) {
          Some(existing) => merge_json(existing, v),
          None => {
            base_map.insert(k, v);
          }
        }
      }
    }
    (base, patch) => *base = patch,
  }
}

impl DocumentStore for FileDocumentStore {
  fn get(&self, collection: &str, id: &str) -> Result<Option<serde_json::Value>> {
    let path = self.doc_path(collection, id);
    let raw = match std::fs::read(&path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(store_err(&path, e)),
    };
    serde_json::from_slice(&raw).map(Some).map_err(|e| store_err(&path, e))
  }

  fn list(&self, collection: &str) -> Result<Vec<(String, serde_json::Value)>> {
    let dir = self.root.join(collection);
    let entries = match std::fs::read_dir(&dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(store_err(&dir, e)),
    };

    let mut out = Vec::new();
    for entry in entries {
      let path = entry.map_err(|e| store_err(&dir, e))?.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }
      let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
        continue;
      };
      let raw = std::fs::read(&path).map_err(|e| store_err(&path, e))?;
      let doc = serde_json::from_slice(&raw).map_err(|e| store_err(&path, e))?;
      out.push((stem, doc));
    }

    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
  }

  fn upsert(&self, collection: &str, id: &str, doc: serde_json::Value, merge: bool) -> Result<()> {
    let path = self.doc_path(collection, id);

    let to_write = if merge {
      match self.get(collection, id)? {
        Some(mut existing) => {
          merge_json(&mut existing, doc);
          existing
        }
        None => doc,
      }
    } else {
      doc
    };

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| store_err(parent, e))?;
    }

    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(&to_write).map_err(|e| store_err(&path, e))?;
    std::fs::write(&tmp, bytes).map_err(|e| store_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| store_err(&path, e))?;

    Ok(())
  }

  fn delete(&self, collection: &str, id: &str) -> Result<bool> {
    let path = self.doc_path(collection, id);
    match std::fs::remove_file(&path) {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(store_err(&path, e)),
    }
  }

  fn clear(&self, collection: &str) -> Result<usize> {
    let ids: Vec<String> = self.list(collection)?.into_iter().map(|(id, _)| id).collect();
    let mut removed = 0;
    for id in ids {
      if self.delete(collection, &id)? {
        removed += 1;
      }
    }
    Ok(removed)
  }
}

pub fn get_typed<T: DeserializeOwned>(store: &dyn DocumentStore, collection: &str, id: &str) -> Result<Option<T>> {
  match store.get(collection, id)? {
    Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
    None => Ok(None),
  }
}

/// Typed listing; documents that no longer match `T` are skipped with a warning.
pub fn list_typed<T: DeserializeOwned>(store: &dyn DocumentStore, collection: &str) -> Result<Vec<T>> {
  let mut out = Vec::new();
  for (id, doc) in store.list(collection)? {
    match serde_json::from_value::<T>(doc) {
      Ok(t) => out.push(t),
      Err(e) => warn!(collection, id = %id, error = %e, "skipping malformed document"),
    }
  }
  Ok(out)
}

pub fn put_typed<T: Serialize>(store: &dyn DocumentStore, collection: &str, id: &str, value: &T, merge: bool) -> Result<()> {
  store.upsert(collection, id, serde_json::to_value(value)?, merge)
}
