/// Extracts the model id from a share URL. A bare id passes through
/// unchanged, so both forms are accepted everywhere an id is.
pub fn parse_page_id(input: &str) -> String {
  let tail = input.rsplit("m=").next().unwrap_or(input);
  match tail.split_once('&') {
    Some((id, _)) => id.to_string(),
    None => tail.to_string(),
  }
}
