use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use tracing::warn;

/// One named way of locating a table literal inside minified bundle text.
/// Minifier output shifts between bundle generations, so each table is
/// hunted with an ordered chain of these.
pub(crate) struct MarkerStrategy {
  name: &'static str,
  pattern: &'static LazyLock<Regex>,
}

impl MarkerStrategy {
  pub(crate) const fn new(name: &'static str, pattern: &'static LazyLock<Regex>) -> Self {
    Self { name, pattern }
  }

  fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
    self
      .pattern
      .captures(text)
      .and_then(|captures| captures.get(1))
      .map(|segment| segment.as_str())
  }
}

/// Tries each strategy in order and returns the first captured literal. A
/// miss across the whole chain is a warning, never an error: the caller
/// proceeds with whatever else it recovered.
pub(crate) fn first_capture<'t>(
  table: &str,
  strategies: &[MarkerStrategy],
  text: &'t str,
) -> Option<&'t str> {
  for strategy in strategies {
    if let Some(capture) = strategy.capture(text) {
      debug!("located the {table} via its {} marker", strategy.name);
      return Some(capture);
    }
  }
  warn!("no {table} marker found in the runtime bundle");
  None
}
