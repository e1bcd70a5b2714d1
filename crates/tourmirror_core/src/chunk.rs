use serde::Deserialize;
use serde::Serialize;

/// One entry recovered from the runtime bundle's chunk hash table.
///
/// The hash table decides which chunks exist. The name table only supplies a
/// display name; chunks without one are addressed by their raw id.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ChunkEntry {
  /// Bundler-internal chunk identifier. Opaque, not always numeric.
  pub id: String,
  pub name: Option<String>,
  /// Lowercase hex cache-busting segment.
  pub content_hash: String,
}

impl ChunkEntry {
  pub fn file_name(&self) -> String {
    let name = self.name.as_deref().unwrap_or(&self.id);
    format!("js/{}.{}.js", name, self.content_hash)
  }
}

/// A stylesheet chunk. These carry no content hash in their file names.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CssChunkEntry {
  pub name: String,
}

impl CssChunkEntry {
  pub fn file_name(&self) -> String {
    format!("css/{}.css", self.name)
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn named_chunk_uses_name_and_hash() {
    let entry = ChunkEntry {
      id: String::from("239"),
      name: Some(String::from("three-examples")),
      content_hash: String::from("abc123"),
    };

    assert_eq!(entry.file_name(), "js/three-examples.abc123.js");
  }

  #[test]
  fn unnamed_chunk_falls_back_to_id() {
    let entry = ChunkEntry {
      id: String::from("240"),
      name: None,
      content_hash: String::from("def456"),
    };

    assert_eq!(entry.file_name(), "js/240.def456.js");
  }

  #[test]
  fn css_chunk_has_no_hash_segment() {
    let entry = CssChunkEntry {
      name: String::from("init"),
    };

    assert_eq!(entry.file_name(), "css/init.css");
  }
}
