use serde::{Deserialize, Serialize};

/// Main configuration structure for specweave
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Round loop configuration
    #[serde(default)]
    pub convergence: ConvergenceConfig,

    /// Analyzer configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Round loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConvergenceConfig {
    /// Hard stop on the number of rounds
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// A round with no high/critical conflicts and fewer than this many
    /// conflicts in total is accepted
    #[serde(default = "default_acceptable_conflict_ceiling")]
    pub acceptable_conflict_ceiling: usize,

    /// Wall-clock budget per producer call, in seconds
    #[serde(default)]
    pub producer_timeout_secs: Option<u64>,

    /// Emit change requests to producers between rounds
    #[serde(default = "default_true")]
    pub emit_change_requests: bool,
}

const fn default_max_rounds() -> u32 {
    5
}

const fn default_acceptable_conflict_ceiling() -> usize {
    3
}

const fn default_true() -> bool {
    true
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            acceptable_conflict_ceiling: default_acceptable_conflict_ceiling(),
            producer_timeout_secs: None,
            emit_change_requests: true,
        }
    }
}

/// Analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisConfig {
    /// Fields that are valid for every data source
    #[serde(default = "default_envelope_fields")]
    pub envelope_fields: Vec<String>,

    /// Receiver names whose `.field` accesses are treated as schema reads
    #[serde(default = "default_accessor_receivers")]
    pub accessor_receivers: Vec<String>,

    /// Identifiers never reported as unknown schema fields
    #[serde(default = "default_builtin_identifiers")]
    pub builtin_identifiers: Vec<String>,

    /// Parameter names that count as a data provider
    #[serde(default = "default_data_param_names")]
    pub data_param_names: Vec<String>,

    /// Run analyzers concurrently
    #[serde(default = "default_true")]
    pub parallel: bool,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn default_envelope_fields() -> Vec<String> {
    to_strings(&["id", "timestamp", "created_at", "updated_at"])
}

fn default_accessor_receivers() -> Vec<String> {
    to_strings(&["row", "record", "item", "datum", "d", "entry"])
}

fn default_builtin_identifiers() -> Vec<String> {
    to_strings(&[
        "length", "map", "filter", "reduce", "forEach", "find", "some", "every", "slice",
        "concat", "includes", "indexOf", "join", "keys", "values", "entries", "toString",
        "toFixed", "toLowerCase", "toUpperCase", "trim", "split", "push", "sort", "key",
        "props", "children", "constructor", "prototype",
    ])
}

fn default_data_param_names() -> Vec<String> {
    to_strings(&["data", "rows", "records", "items", "dataset", "dataSource"])
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            envelope_fields: default_envelope_fields(),
            accessor_receivers: default_accessor_receivers(),
            builtin_identifiers: default_builtin_identifiers(),
            data_param_names: default_data_param_names(),
            parallel: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
