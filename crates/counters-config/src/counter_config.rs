//! Loads the `COUNTER_CONFIG_PATH` JSON document into [`CounterDefinition`]s.

use std::path::Path;

use serde::{Deserialize, Serialize};

use counters_aggregate::{CounterDefinition, CounterProducer};
use counters_core::indexer::IndexFieldConfig;

use crate::error::{ConfigError, Result};
use crate::load_json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    pub counters: Vec<CounterDefinition>,
}

impl CounterConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path)
    }

    /// Builds the [`CounterProducer`] this configuration describes against
    /// an already-loaded set of index entry definitions, surfacing
    /// duplicate names / unknown index references as a fatal [`ConfigError`].
    pub fn build_producer(&self, index_configs: &[IndexFieldConfig]) -> Result<CounterProducer> {
        CounterProducer::new(self.counters.clone(), index_configs)
            .map_err(|e| ConfigError::Rejected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use counters_core::index_entry::IndexValueMode;
    use std::io::Write;

    fn index_configs() -> Vec<IndexFieldConfig> {
        vec![IndexFieldConfig {
            field_name: "account".into(),
            date_name: "txDate".into(),
            index_type_name: "by_account".into(),
            index_type: 1,
            index_value_mode: IndexValueMode::Opaque,
        }]
    }

    #[test]
    fn loads_and_builds_a_producer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "counters": [
                    {{
                        "name": "dailyCount",
                        "index_type_name": "by_account",
                        "from_time_ms": 86400000,
                        "to_time_ms": 0,
                        "max_evaluated_records": 0,
                        "max_matching_records": 0,
                        "computation_conditions": null,
                        "evaluation_conditions": null,
                        "attributes": {{"count": {{"$sum": 1}}}}
                    }}
                ]
            }}"#
        )
        .unwrap();

        let cfg = CounterConfig::load(file.path()).unwrap();
        assert_eq!(cfg.counters.len(), 1);
        assert!(cfg.build_producer(&index_configs()).is_ok());
    }

    #[test]
    fn duplicate_counter_names_rejected_at_build_time() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "counters": [
                    {{"name": "c1", "index_type_name": "by_account", "attributes": {{"count": {{"$sum": 1}}}}}},
                    {{"name": "c1", "index_type_name": "by_account", "attributes": {{"count": {{"$sum": 1}}}}}}
                ]
            }}"#
        )
        .unwrap();

        let cfg = CounterConfig::load(file.path()).unwrap();
        let err = cfg.build_producer(&index_configs()).unwrap_err();
        assert!(matches!(err, ConfigError::Rejected(_)));
    }
}
