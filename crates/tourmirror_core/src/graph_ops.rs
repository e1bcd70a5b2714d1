use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use tracing::warn;

/// Placeholder inside request templates, replaced with the live model id
/// when templates load.
pub const MODEL_ID_PLACEHOLDER: &str = "[MATTERPORT_MODEL_ID]";

/// Request body templates for the data query endpoint, keyed by operation
/// name. A template file `graph_<Op>.json` (or plain `<Op>.json`) registers
/// the operation `<Op>`. Captured responses on disk always win over these at
/// replay time.
#[derive(Clone, Debug, Default)]
pub struct OperationTemplates {
  templates: HashMap<String, String>,
}

impl OperationTemplates {
  pub fn load(dir: &Path, page_id: &str) -> Self {
    let entries = match std::fs::read_dir(dir) {
      Ok(entries) => entries,
      Err(error) => {
        warn!("no graph operation templates at {}: {error}", dir.display());
        return Self::default();
      }
    };

    let mut templates = HashMap::new();
    for entry in entries.flatten() {
      let file_name = entry.file_name();
      let Some(file_name) = file_name.to_str() else {
        continue;
      };
      let Some(stem) = file_name.strip_suffix(".json") else {
        continue;
      };
      let operation = stem.strip_prefix("graph_").unwrap_or(stem);
      match std::fs::read_to_string(entry.path()) {
        Ok(body) => {
          templates.insert(operation.to_string(), body.replace(MODEL_ID_PLACEHOLDER, page_id));
        }
        Err(error) => warn!("skipping unreadable template {file_name}: {error}"),
      }
    }
    Self { templates }
  }

  pub fn get(&self, operation: &str) -> Option<&str> {
    self.templates.get(operation).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.templates.iter().map(|(operation, body)| (operation.as_str(), body.as_str()))
  }

  pub fn len(&self) -> usize {
    self.templates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.templates.is_empty()
  }
}

/// Where the captured response snapshot for an operation lives inside a
/// mirror. The downloader writes here and the replay server reads here.
pub fn captured_response_path(mirror_root: &Path, operation: &str) -> PathBuf {
  mirror_root.join("api/mp/models").join(format!("graph_{operation}.json"))
}
