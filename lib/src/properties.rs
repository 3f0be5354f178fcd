use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::record::{is_identifier, TablePath};

fn default_table() -> String {
    "series".to_string()
}

fn default_path_prefix() -> String {
    "/local/".to_string()
}

fn default_task_count() -> u64 {
    1000
}

fn default_duration_ms() -> u64 {
    1000
}

fn default_min_jitter_ms() -> u64 {
    0
}

fn default_max_jitter_ms() -> u64 {
    500
}

fn default_string_length() -> usize {
    10
}

fn default_comment() -> String {
    "comment".to_string()
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Properties {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default = "default_task_count")]
    pub task_count: u64,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_min_jitter_ms")]
    pub min_jitter_ms: u64,
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
    #[serde(default = "default_string_length")]
    pub string_length: usize,
    #[serde(default = "default_comment")]
    pub comment: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            table: default_table(),
            path_prefix: default_path_prefix(),
            task_count: default_task_count(),
            duration_ms: default_duration_ms(),
            min_jitter_ms: default_min_jitter_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            string_length: default_string_length(),
            comment: default_comment(),
            seed: None,
        }
    }
}

impl Properties {
    pub fn from_toml(raw: &str) -> Result<Self> {
        let props: Properties =
            toml::from_str(raw).map_err(|e| Error::Properties(e.to_string()))?;
        props.validate()?;
        Ok(props)
    }

    pub fn validate(&self) -> Result<()> {
        if self.task_count == 0 {
            return Err(Error::Properties("task_count must be positive".into()));
        }
        if self.min_jitter_ms > self.max_jitter_ms {
            return Err(Error::Properties(format!(
                "min_jitter_ms ({}) exceeds max_jitter_ms ({})",
                self.min_jitter_ms, self.max_jitter_ms
            )));
        }
        if self.string_length == 0 {
            return Err(Error::Properties("string_length must be positive".into()));
        }
        if !is_identifier(&self.table) {
            return Err(Error::Properties(format!(
                "table name {:?} is not a plain identifier",
                self.table
            )));
        }
        Ok(())
    }

    pub fn table_path(&self) -> TablePath {
        TablePath::new(self.path_prefix.clone(), self.table.clone())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}
