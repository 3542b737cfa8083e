//! Loads the `MESSAGE_CONFIG_PATH` JSON document into a [`FactMapper`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use counters_core::mapper::{FactMapper, FieldConfig};

use crate::error::{ConfigError, Result};
use crate::load_json;

/// The JSON document named by `MESSAGE_CONFIG_PATH`: every field projection
/// rule the mapper knows about, plus the short-field-name toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub use_short_names: bool,
}

impl MessageConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path)
    }

    /// Builds the [`FactMapper`] this configuration describes, surfacing
    /// any construction-time rejection (empty `message_types`, etc.) as a
    /// fatal [`ConfigError`].
    pub fn build_mapper(&self) -> Result<FactMapper> {
        FactMapper::new(self.fields.clone(), self.use_short_names)
            .map_err(|e| ConfigError::Rejected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_fields_and_builds_a_mapper() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "fields": [
                    {{"src": "accountId", "dst": "account", "message_types": [1], "required": true, "key_order": 0, "field_type": {{"kind": "string"}}}}
                ]
            }}"#
        )
        .unwrap();

        let cfg = MessageConfig::load(file.path()).unwrap();
        assert_eq!(cfg.fields.len(), 1);
        let mapper = cfg.build_mapper().unwrap();
        assert!(mapper.knows_message_type(1));
    }

    #[test]
    fn rejects_field_with_no_message_types() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"fields": [{{"src": "a", "dst": "a", "message_types": [], "required": false, "key_order": null, "field_type": {{"kind": "string"}}}}]}}"#
        )
        .unwrap();

        let cfg = MessageConfig::load(file.path()).unwrap();
        assert!(cfg.build_mapper().is_err());
    }

    #[test]
    fn missing_file_surfaces_read_error() {
        let err = MessageConfig::load("/nonexistent/message.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
