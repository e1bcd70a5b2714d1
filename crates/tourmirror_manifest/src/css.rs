use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tourmirror_core::chunk::CssChunkEntry;

use crate::object_literal::parse_pairs;
use crate::strategy::first_capture;
use crate::strategy::MarkerStrategy;

// Name table: n.miniCssF=e=>"css/"+({5385:"init",...}[e]||e)+".css"
static MINI_CSS_NAMES: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"n\.miniCssF=e=>"css/"\+\((\{.*?)\}\[e\]\|\|e\)\+"\.css""#).unwrap());

// Flag set inside the loader: n.f.miniCss=(r,a)=>{...{1442:1,5385:1}[r]...}
static MINI_CSS_FLAGS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?s)n\.f\.miniCss=.*?\s*(\{[\d:,]+\})\s*\[r\]"#).unwrap());

static NAME_STRATEGIES: &[MarkerStrategy] =
  &[MarkerStrategy::new("mini-css-url", &MINI_CSS_NAMES)];

static FLAG_STRATEGIES: &[MarkerStrategy] =
  &[MarkerStrategy::new("mini-css-loader", &MINI_CSS_FLAGS)];

/// Recovers the CSS chunk manifest from runtime bundle text.
///
/// The loader's flag set decides which sheets are real; ids missing from the
/// name table keep their raw id as the name. Without a flag set every named
/// sheet is returned, which over-fetches at worst while a missing sheet
/// breaks rendering.
pub fn parse_css(runtime: &str) -> Vec<CssChunkEntry> {
  let name_pairs = first_capture("css chunk name table", NAME_STRATEGIES, runtime)
    .map(parse_pairs)
    .unwrap_or_default();

  if let Some(flag_literal) = first_capture("css chunk flag set", FLAG_STRATEGIES, runtime) {
    let name_table: HashMap<&str, &str> = name_pairs
      .iter()
      .map(|(id, name)| (id.as_str(), name.as_str()))
      .collect();
    return parse_pairs(flag_literal)
      .into_iter()
      .map(|(id, _)| {
        let name = name_table.get(id.as_str()).map(|name| name.to_string()).unwrap_or(id);
        CssChunkEntry { name }
      })
      .collect();
  }

  name_pairs
    .into_iter()
    .map(|(_, name)| CssChunkEntry { name })
    .collect()
}
