//! External facts the analyzers check artifacts against.
//!
//! An [`ExternalContext`] is assembled once per round from the schema and
//! knowledge ports and handed to every analyzer by shared reference. It holds
//! a snapshot of the field schema, the domain rule bag, and the catalog of
//! component kinds.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::ports::{KnowledgeBase, SchemaProvider};

/// Knowledge topic holding the [`DomainRules`] bag.
pub const DOMAIN_RULES_TOPIC: &str = "domain_rules";
/// Knowledge topic holding extra or overriding [`KindProfile`]s.
pub const COMPONENT_KINDS_TOPIC: &str = "component_kinds";
/// Prefix of the `knowledge_errors` key recorded for a schema source whose
/// field map could not be loaded, e.g. `schema:wells`.
pub const SCHEMA_SOURCE_ERROR_PREFIX: &str = "schema:";

// ---------------------------------------------------------------------------
// Field types
// ---------------------------------------------------------------------------

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[serde(alias = "int", alias = "long")]
    Integer,
    #[serde(alias = "double", alias = "decimal", alias = "number")]
    Float,
    #[serde(alias = "text", alias = "str")]
    String,
    #[serde(alias = "enum", alias = "category")]
    Categorical,
    #[serde(alias = "bool")]
    Boolean,
    Date,
    #[serde(alias = "timestamp")]
    Datetime,
}

impl FieldType {
    pub fn class(&self) -> TypeClass {
        match self {
            Self::Integer | Self::Float => TypeClass::Numeric,
            Self::String | Self::Categorical | Self::Boolean => TypeClass::Categorical,
            Self::Date | Self::Datetime => TypeClass::Temporal,
        }
    }
}

/// Coarse type class used to check kind/field compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeClass {
    Numeric,
    Categorical,
    Temporal,
    Any,
}

impl TypeClass {
    /// Whether a component of this class can display a field of class `field`.
    pub fn accepts(&self, field: TypeClass) -> bool {
        *self == TypeClass::Any || field == TypeClass::Any || *self == field
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Temporal => "temporal",
            Self::Any => "any",
        }
    }
}

/// Schema entry for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Explicit processing-stage marker.
    #[serde(default)]
    pub stage: Option<String>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            stage: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn in_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }
}

// ---------------------------------------------------------------------------
// SchemaSnapshot
// ---------------------------------------------------------------------------

/// Per-source field maps plus the always-valid envelope fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub sources: BTreeMap<String, BTreeMap<String, FieldSpec>>,
    pub envelope_fields: BTreeSet<String>,
}

impl SchemaSnapshot {
    pub fn has_source(&self, source: &str) -> bool {
        self.sources.contains_key(source)
    }

    /// Every field of every source, plus the envelope fields.
    pub fn union(&self) -> BTreeSet<String> {
        self.sources
            .values()
            .flat_map(|fields| fields.keys().cloned())
            .chain(self.envelope_fields.iter().cloned())
            .collect()
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.envelope_fields.contains(field)
            || self.sources.values().any(|fields| fields.contains_key(field))
    }

    /// Find a field's spec. With a source qualifier only that source is
    /// searched; otherwise the first source (in name order) defining it wins.
    pub fn lookup(&self, source: Option<&str>, field: &str) -> Option<&FieldSpec> {
        match source {
            Some(source) => self.sources.get(source).and_then(|fields| fields.get(field)),
            None => self.sources.values().find_map(|fields| fields.get(field)),
        }
    }
}

// ---------------------------------------------------------------------------
// KindCatalog
// ---------------------------------------------------------------------------

/// What a component kind implies for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindProfile {
    /// Field class the kind can display.
    #[serde(default = "default_type_class")]
    pub type_class: TypeClass,
    /// Props the implementation must accept.
    #[serde(default)]
    pub required_props: Vec<String>,
    /// External capability (matched against imports) the kind needs.
    #[serde(default)]
    pub capability: Option<String>,
}

fn default_type_class() -> TypeClass {
    TypeClass::Any
}

impl KindProfile {
    fn new(type_class: TypeClass, required_props: &[&str], capability: Option<&str>) -> Self {
        Self {
            type_class,
            required_props: required_props.iter().map(|p| (*p).to_string()).collect(),
            capability: capability.map(str::to_string),
        }
    }
}

/// Profiles keyed by lowercase kind name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCatalog {
    kinds: BTreeMap<String, KindProfile>,
}

impl KindCatalog {
    pub fn empty() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    pub fn profile(&self, kind: &str) -> Option<&KindProfile> {
        self.kinds.get(&kind.to_lowercase())
    }

    pub fn insert(&mut self, kind: impl Into<String>, profile: KindProfile) {
        self.kinds.insert(kind.into().to_lowercase(), profile);
    }
}

impl Default for KindCatalog {
    fn default() -> Self {
        use TypeClass::{Any, Categorical, Numeric, Temporal};

        let mut catalog = Self::empty();
        for chart in ["bar_chart", "line_chart", "area_chart", "scatter_chart", "histogram"] {
            catalog.insert(chart, KindProfile::new(Numeric, &["data"], Some("chart")));
        }
        for chart in ["pie_chart", "donut_chart"] {
            catalog.insert(chart, KindProfile::new(Categorical, &["data"], Some("chart")));
        }
        catalog.insert("kpi_card", KindProfile::new(Numeric, &["value"], None));
        catalog.insert("metric", KindProfile::new(Numeric, &["value"], None));
        catalog.insert("dropdown", KindProfile::new(Categorical, &["options"], None));
        catalog.insert("filter", KindProfile::new(Categorical, &[], None));
        catalog.insert("date_picker", KindProfile::new(Temporal, &[], None));
        catalog.insert("timeline", KindProfile::new(Temporal, &["data"], Some("chart")));
        catalog.insert("table", KindProfile::new(Any, &["data"], None));
        catalog.insert("map", KindProfile::new(Any, &["data"], Some("map")));
        catalog
    }
}

// ---------------------------------------------------------------------------
// DomainRules
// ---------------------------------------------------------------------------

/// The domain rule bag, normally served by the knowledge base under
/// [`DOMAIN_RULES_TOPIC`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainRules {
    /// Fields every spec in this domain must present.
    pub required_fields: Vec<String>,
    /// Field pairs that must never share an unsectioned view.
    pub forbidden_cooccurrences: Vec<[String; 2]>,
    /// Conventional label per field.
    pub labeling: BTreeMap<String, String>,
    /// Kind pairs that are redundant when both appear.
    pub redundant_kinds: Vec<[String; 2]>,
    /// Explicit stage per field; overrides schema markers and patterns.
    pub stage_markers: BTreeMap<String, String>,
    /// Regexes whose first capture group names the stage of a field.
    pub stage_patterns: Vec<String>,
    /// Kinds that count as a separating structural construct.
    pub separator_kinds: Vec<String>,
}

impl Default for DomainRules {
    fn default() -> Self {
        Self {
            required_fields: Vec::new(),
            forbidden_cooccurrences: Vec::new(),
            labeling: BTreeMap::new(),
            redundant_kinds: Vec::new(),
            stage_markers: BTreeMap::new(),
            stage_patterns: vec![
                r"(?i)(?:^|[_.])(stage[_-]?\d+)(?:[_.]|$)".to_string(),
                r"(?i)^(raw|processed)_".to_string(),
            ],
            separator_kinds: ["section", "tabs", "tab", "accordion", "divider", "page"]
                .iter()
                .map(|k| (*k).to_string())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// ExternalContext
// ---------------------------------------------------------------------------

/// Read-only external facts for one round of analysis.
#[derive(Debug, Clone, Default)]
pub struct ExternalContext {
    pub schema: SchemaSnapshot,
    pub rules: DomainRules,
    pub kinds: KindCatalog,
    /// Set when a knowledge topic could not be parsed. Analyzers that need
    /// the affected facts fail (and are isolated) instead of guessing.
    pub knowledge_errors: BTreeMap<String, String>,
}

impl ExternalContext {
    /// Snapshot the schema and knowledge ports.
    ///
    /// A missing knowledge topic falls back to defaults; a present but
    /// malformed one is recorded in `knowledge_errors`. So is a listed schema
    /// source whose field map is unavailable, which is left out of the
    /// snapshot.
    pub fn assemble(
        schema: &dyn SchemaProvider,
        knowledge: &dyn KnowledgeBase,
        envelope_fields: &[String],
    ) -> Self {
        let mut knowledge_errors = BTreeMap::new();

        let mut sources = BTreeMap::new();
        for source in schema.sources() {
            match schema.fields_for(&source) {
                Some(fields) => {
                    sources.insert(source, fields);
                }
                None => {
                    knowledge_errors.insert(
                        format!("{SCHEMA_SOURCE_ERROR_PREFIX}{source}"),
                        "source is listed but its fields could not be loaded".to_string(),
                    );
                }
            }
        }

        let rules = match knowledge.get(DOMAIN_RULES_TOPIC) {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
                knowledge_errors.insert(DOMAIN_RULES_TOPIC.to_string(), err.to_string());
                DomainRules::default()
            }),
            None => DomainRules::default(),
        };

        let mut kinds = KindCatalog::default();
        if let Some(value) = knowledge.get(COMPONENT_KINDS_TOPIC) {
            match serde_json::from_value::<BTreeMap<String, KindProfile>>(value) {
                Ok(extra) => {
                    for (kind, profile) in extra {
                        kinds.insert(kind, profile);
                    }
                }
                Err(err) => {
                    knowledge_errors.insert(COMPONENT_KINDS_TOPIC.to_string(), err.to_string());
                }
            }
        }

        Self {
            schema: SchemaSnapshot {
                sources,
                envelope_fields: envelope_fields.iter().cloned().collect(),
            },
            rules,
            kinds,
            knowledge_errors,
        }
    }

    /// Schema sources that were listed but failed to load.
    pub fn unloaded_sources(&self) -> Vec<&str> {
        self.knowledge_errors
            .keys()
            .filter_map(|key| key.strip_prefix(SCHEMA_SOURCE_ERROR_PREFIX))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wells_schema() -> SchemaSnapshot {
        let mut wells = BTreeMap::new();
        wells.insert("well_count".to_string(), FieldSpec::new(FieldType::Integer));
        wells.insert("operator".to_string(), FieldSpec::new(FieldType::String));
        let mut permits = BTreeMap::new();
        permits.insert("operator".to_string(), FieldSpec::new(FieldType::Categorical));
        let mut sources = BTreeMap::new();
        sources.insert("wells".to_string(), wells);
        sources.insert("permits".to_string(), permits);
        SchemaSnapshot {
            sources,
            envelope_fields: ["id".to_string()].into_iter().collect(),
        }
    }

    /// Lists `wells` and `permits` but only serves `wells`.
    struct PartialSchema;

    impl SchemaProvider for PartialSchema {
        fn sources(&self) -> BTreeSet<String> {
            ["permits".to_string(), "wells".to_string()].into_iter().collect()
        }

        fn fields_for(&self, source: &str) -> Option<BTreeMap<String, FieldSpec>> {
            (source == "wells").then(|| {
                [("well_count".to_string(), FieldSpec::new(FieldType::Integer))]
                    .into_iter()
                    .collect()
            })
        }
    }

    struct NoKnowledge;

    impl KnowledgeBase for NoKnowledge {
        fn get(&self, _topic: &str) -> Option<serde_json::Value> {
            None
        }
    }

    #[test]
    fn unloadable_schema_source_is_recorded_not_emptied() {
        let context = ExternalContext::assemble(&PartialSchema, &NoKnowledge, &[]);

        assert!(context.schema.sources.contains_key("wells"));
        assert!(!context.schema.sources.contains_key("permits"));
        assert!(context.knowledge_errors.contains_key("schema:permits"));
        assert_eq!(context.unloaded_sources(), vec!["permits"]);
    }

    #[test]
    fn union_includes_envelope_fields() {
        let schema = wells_schema();
        let union = schema.union();
        assert!(union.contains("well_count"));
        assert!(union.contains("operator"));
        assert!(union.contains("id"));
        assert!(schema.contains_field("id"));
        assert!(!schema.contains_field("depth"));
    }

    #[test]
    fn lookup_respects_qualifier_and_source_order() {
        let schema = wells_schema();
        // "permits" sorts before "wells"
        assert_eq!(
            schema.lookup(None, "operator").map(|f| f.field_type),
            Some(FieldType::Categorical)
        );
        assert_eq!(
            schema.lookup(Some("wells"), "operator").map(|f| f.field_type),
            Some(FieldType::String)
        );
        assert!(schema.lookup(Some("wells"), "missing").is_none());
    }

    #[test]
    fn type_class_compatibility() {
        assert!(TypeClass::Numeric.accepts(TypeClass::Numeric));
        assert!(!TypeClass::Numeric.accepts(TypeClass::Categorical));
        assert!(!TypeClass::Categorical.accepts(TypeClass::Numeric));
        assert!(TypeClass::Any.accepts(TypeClass::Temporal));
        assert_eq!(FieldType::Datetime.class(), TypeClass::Temporal);
    }

    #[test]
    fn field_type_aliases_parse() {
        let spec: FieldSpec = serde_yaml::from_str("type: int\nrequired: true").unwrap();
        assert_eq!(spec.field_type, FieldType::Integer);
        assert!(spec.required);
        let spec: FieldSpec = serde_yaml::from_str("type: enum").unwrap();
        assert_eq!(spec.field_type, FieldType::Categorical);
    }

    #[test]
    fn default_catalog_is_case_insensitive() {
        let catalog = KindCatalog::default();
        let bar = catalog.profile("Bar_Chart").unwrap();
        assert_eq!(bar.type_class, TypeClass::Numeric);
        assert_eq!(bar.required_props, vec!["data".to_string()]);
        assert_eq!(bar.capability.as_deref(), Some("chart"));
        assert!(catalog.profile("card").is_none());
    }

    #[test]
    fn domain_rules_parse_partial_documents() {
        let rules: DomainRules =
            serde_json::from_value(serde_json::json!({"required_fields": ["api_number"]}))
                .unwrap();
        assert_eq!(rules.required_fields, vec!["api_number".to_string()]);
        assert!(rules.separator_kinds.contains(&"section".to_string()));
    }
}
