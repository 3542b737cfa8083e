//! Loads the `INDEX_CONFIG_PATH` JSON document into [`counters_core::indexer::IndexFieldConfig`]s.

use std::path::Path;

use serde::{Deserialize, Serialize};

use counters_core::indexer::IndexFieldConfig;
use counters_core::index_entry::IndexValueMode;

use crate::error::{ConfigError, Result};
use crate::load_json;

/// One entry definition as written in the JSON config: `index_value_mode`
/// is the wire-level integer (`1` opaque, `2` transparent), decoded into
/// [`IndexValueMode`] at load time so a typo fails fast instead of
/// silently defaulting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntryDefinition {
    pub field_name: String,
    pub date_name: String,
    pub index_type_name: String,
    pub index_type: i32,
    pub index_value_mode: i32,
}

impl IndexEntryDefinition {
    fn to_core(&self) -> Result<IndexFieldConfig> {
        let mode = IndexValueMode::from_wire(self.index_value_mode).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: format!("indexConfig.{}.index_value_mode", self.index_type_name),
                reason: format!("unknown indexValueMode {}", self.index_value_mode),
            }
        })?;
        Ok(IndexFieldConfig {
            field_name: self.field_name.clone(),
            date_name: self.date_name.clone(),
            index_type_name: self.index_type_name.clone(),
            index_type: self.index_type,
            index_value_mode: mode,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub entries: Vec<IndexEntryDefinition>,
    /// `INCLUDE_FACT_DATA_TO_INDEX` -- embeds the fact payload into each
    /// index entry so counters never need a join back to `facts`.
    #[serde(default)]
    pub include_fact_data_to_index: bool,
}

impl IndexConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path)
    }

    /// Converts every entry definition, failing on the first invalid
    /// `index_value_mode` encountered.
    pub fn to_core_configs(&self) -> Result<Vec<IndexFieldConfig>> {
        self.entries.iter().map(IndexEntryDefinition::to_core).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn decodes_opaque_and_transparent_modes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "entries": [
                    {{"field_name": "account", "date_name": "txDate", "index_type_name": "by_account", "index_type": 1, "index_value_mode": 1}},
                    {{"field_name": "device", "date_name": "txDate", "index_type_name": "by_device", "index_type": 2, "index_value_mode": 2}}
                ],
                "include_fact_data_to_index": true
            }}"#
        )
        .unwrap();

        let cfg = IndexConfig::load(file.path()).unwrap();
        let configs = cfg.to_core_configs().unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].index_value_mode, IndexValueMode::Opaque);
        assert_eq!(configs[1].index_value_mode, IndexValueMode::Transparent);
        assert!(cfg.include_fact_data_to_index);
    }

    #[test]
    fn rejects_unknown_index_value_mode() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"entries": [{{"field_name": "a", "date_name": "d", "index_type_name": "t", "index_type": 1, "index_value_mode": 9}}]}}"#
        )
        .unwrap();

        let cfg = IndexConfig::load(file.path()).unwrap();
        assert!(cfg.to_core_configs().is_err());
    }
}
