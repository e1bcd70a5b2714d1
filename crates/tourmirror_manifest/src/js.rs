use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tourmirror_core::chunk::ChunkEntry;

use crate::object_literal::parse_pairs;
use crate::strategy::first_capture;
use crate::strategy::MarkerStrategy;

// Name table as emitted today: n.u=e=>"js/"+({239:"three-examples",...}[e]||e)
static MODULE_URL_NAMES: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"n\.u=e=>"js/"\+\((\{.*?)\}\[e\]\|\|e\)"#).unwrap());

// Hash table as emitted today: +"."+{239:"abc123",...}[e]+".js"
static DOT_CONCAT_HASHES: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(?s)\+\s*["']\.["']\s*\+\s*(\{.*?\})\s*\[e\]\s*\+\s*["']\.js["']"#).unwrap()
});

// Older emissions index straight into a hex-valued literal: {id:"hex",...}[e]+".js"
static SUFFIX_INDEX_HASHES: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?s)(\{[\w\d]+:"[a-f0-9]+".*?\})\[e\]\+"\.js""#).unwrap());

static NAME_STRATEGIES: &[MarkerStrategy] =
  &[MarkerStrategy::new("module-url", &MODULE_URL_NAMES)];

static HASH_STRATEGIES: &[MarkerStrategy] = &[
  MarkerStrategy::new("dot-concat", &DOT_CONCAT_HASHES),
  MarkerStrategy::new("suffix-index", &SUFFIX_INDEX_HASHES),
];

/// Recovers the JS chunk manifest from runtime bundle text.
///
/// Total over arbitrary input: a missing hash table yields an empty manifest
/// and a warning. Entries come back in hash table order.
pub fn parse_js(runtime: &str) -> Vec<ChunkEntry> {
  let name_table: HashMap<String, String> =
    first_capture("js chunk name table", NAME_STRATEGIES, runtime)
      .map(|literal| parse_pairs(literal).into_iter().collect())
      .unwrap_or_default();

  let Some(hash_literal) = first_capture("js chunk hash table", HASH_STRATEGIES, runtime) else {
    return Vec::new();
  };

  parse_pairs(hash_literal)
    .into_iter()
    .map(|(id, content_hash)| {
      let name = name_table.get(&id).cloned();
      ChunkEntry { id, name, content_hash }
    })
    .collect()
}
