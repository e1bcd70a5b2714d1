/// Splits a minified `{key:value,...}` literal into string pairs, preserving
/// source order. Entries split on commas and keys from values on the first
/// colon; entries without a colon are skipped. Values lose one surrounding
/// layer of quotes.
pub(crate) fn parse_pairs(literal: &str) -> Vec<(String, String)> {
  let body = literal.trim().trim_start_matches('{').trim_end_matches('}');
  let mut pairs = Vec::new();
  for entry in body.split(',') {
    let Some((key, value)) = entry.split_once(':') else {
      continue;
    };
    pairs.push((key.trim().to_string(), strip_quotes(value.trim()).to_string()));
  }
  pairs
}

fn strip_quotes(value: &str) -> &str {
  let value = value.strip_prefix(['"', '\'']).unwrap_or(value);
  value.strip_suffix(['"', '\'']).unwrap_or(value)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn pairs_keep_source_order() {
    let pairs = parse_pairs(r#"{239:"abc123",240:"def456"}"#);

    assert_eq!(
      pairs,
      vec![
        (String::from("239"), String::from("abc123")),
        (String::from("240"), String::from("def456")),
      ]
    );
  }

  #[test]
  fn single_quoted_values_are_unquoted_once() {
    let pairs = parse_pairs("{5385:'init'}");

    assert_eq!(pairs, vec![(String::from("5385"), String::from("init"))]);
  }

  #[test]
  fn entries_without_a_colon_are_skipped() {
    let pairs = parse_pairs(r#"{239:"abc",garbage,240:"def"}"#);

    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[1].0, "240");
  }

  #[test]
  fn unterminated_literal_still_parses() {
    let pairs = parse_pairs(r#"{239:"three-examples""#);

    assert_eq!(pairs, vec![(String::from("239"), String::from("three-examples"))]);
  }
}
