//! Pattern-based extraction for component-style source text (JSX/TSX/JS).
//!
//! Only top-level (unindented) definitions start a unit. A unit's body runs
//! from its definition to the next top-level definition in the same module.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::domain::models::{AnalysisConfig, ImplArtifact};
use crate::domain::ports::{ExtractedUnit, StaticExtractor};

const IDENT: &str = r"[A-Za-z_$][\w$]*";

/// Regex-driven [`StaticExtractor`].
#[derive(Debug, Clone)]
pub struct RegexExtractor {
    function_def: Regex,
    arrow_def: Regex,
    /// Return annotation and arrow following a parenthesized parameter list.
    arrow_tail: Regex,
    class_def: Regex,
    props_access: Regex,
    props_destructure: Regex,
    data_source: Regex,
    event_wiring: Regex,
    jsx_child: Regex,
    field_access: Vec<Regex>,
    import: Regex,
}

/// A top-level definition found in one module.
struct Definition {
    start: usize,
    end: usize,
    name: String,
    params: Option<String>,
}

impl RegexExtractor {
    /// Build an extractor that treats `.field` and `['field']` on any of
    /// `accessor_receivers` as a schema read.
    pub fn new(accessor_receivers: &[String]) -> Result<Self, regex::Error> {
        let mut field_access = vec![
            Regex::new(r#"\bdataKey\s*=\s*\{?\s*["']([A-Za-z_][\w]*)["']"#)?,
            Regex::new(r#"\b(?:field|accessorKey|accessor)\s*:\s*["']([A-Za-z_][\w]*)["']"#)?,
        ];
        if !accessor_receivers.is_empty() {
            let receivers = accessor_receivers
                .iter()
                .map(|r| regex::escape(r))
                .collect::<Vec<_>>()
                .join("|");
            field_access.push(Regex::new(&format!(
                r"\b(?:{receivers})\??\.({IDENT})"
            ))?);
            field_access.push(Regex::new(&format!(
                r#"\b(?:{receivers})\s*\[\s*["']([A-Za-z_][\w]*)["']\s*\]"#
            ))?);
        }

        Ok(Self {
            function_def: Regex::new(&format!(
                r"(?m)^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*({IDENT})\s*(?:<[^>]*>)?\s*(\()"
            ))?,
            arrow_def: Regex::new(&format!(
                r"(?m)^(?:export\s+)?(?:const|let|var)\s+({IDENT})\s*(?::[^=\n]*)?=\s*(?:React\.memo\(\s*)?(?:async\s*)?(?:(\()|({IDENT})\s*=>)"
            ))?,
            arrow_tail: Regex::new(r"^\s*(?::[^=\n]*)?=>")?,
            class_def: Regex::new(&format!(
                r"(?m)^(?:export\s+)?(?:default\s+)?class\s+({IDENT})"
            ))?,
            props_access: Regex::new(&format!(r"\bprops\??\.({IDENT})"))?,
            props_destructure: Regex::new(r"\{([^{}]*)\}\s*=\s*(?:this\.)?props\b")?,
            data_source: Regex::new(
                r#"(?:\bfetch\(\s*["'`]([^"'`]+)["'`]|\buse(?:Data|Query|DataSource)\(\s*["']([^"']+)["']|\bdataSource\s*[:=]\s*\{?\s*["']([^"']+)["'])"#,
            )?,
            event_wiring: Regex::new(r"\bon[A-Z]\w*\s*=\s*\{|\baddEventListener\s*\(|\.on\(\s*[\x22']")?,
            jsx_child: Regex::new(r"<([A-Z][\w.]*)")?,
            field_access,
            import: Regex::new(
                r#"(?m)(?:^\s*import\s+(?:[^"';]*?\s+from\s+)?["']([^"']+)["']|\brequire\(\s*["']([^"']+)["']\s*\))"#,
            )?,
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, regex::Error> {
        Self::new(&config.accessor_receivers)
    }

    fn definitions(&self, source: &str) -> Vec<Definition> {
        let mut defs = Vec::new();

        for caps in self.function_def.captures_iter(source) {
            let (Some(whole), Some(name), Some(open)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let Some(close) = matching_close(source, open.start()) else {
                continue;
            };
            defs.push(Definition {
                start: whole.start(),
                end: close + 1,
                name: name.as_str().to_string(),
                params: Some(source[open.end()..close].to_string()),
            });
        }
        for caps in self.arrow_def.captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if let Some(param) = caps.get(3) {
                defs.push(Definition {
                    start: whole.start(),
                    end: whole.end(),
                    name: name.as_str().to_string(),
                    params: Some(param.as_str().to_string()),
                });
                continue;
            }
            let Some(open) = caps.get(2) else {
                continue;
            };
            // `const x = (a + b);` is not a definition
            let Some(close) = matching_close(source, open.start()) else {
                continue;
            };
            let Some(tail) = self.arrow_tail.find(&source[close + 1..]) else {
                continue;
            };
            defs.push(Definition {
                start: whole.start(),
                end: close + 1 + tail.end(),
                name: name.as_str().to_string(),
                params: Some(source[open.end()..close].to_string()),
            });
        }
        for caps in self.class_def.captures_iter(source) {
            if let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) {
                defs.push(Definition {
                    start: whole.start(),
                    end: whole.end(),
                    name: name.as_str().to_string(),
                    params: None,
                });
            }
        }

        defs.sort_by_key(|d| d.start);
        defs
    }

    fn unit_from(&self, module: &str, def: &Definition, body: &str) -> ExtractedUnit {
        let mut unit = ExtractedUnit::new(&def.name, module);

        if let Some(params) = &def.params {
            for (name, default) in parse_params(params) {
                if name != "props" {
                    unit.params.insert(name, default);
                }
            }
        }
        for caps in self.props_destructure.captures_iter(body) {
            if let Some(list) = caps.get(1) {
                for (name, default) in parse_entries(list.as_str()) {
                    unit.params.entry(name).or_insert(default);
                }
            }
        }
        for caps in self.props_access.captures_iter(body) {
            if let Some(name) = caps.get(1) {
                unit.params.entry(name.as_str().to_string()).or_insert(None);
            }
        }

        for caps in self.data_source.captures_iter(body) {
            if let Some(url) = caps.get(1) {
                if let Some(source) = source_from_url(url.as_str()) {
                    unit.data_sources.insert(source);
                }
            } else if let Some(name) = caps.get(2).or_else(|| caps.get(3)) {
                unit.data_sources.insert(name.as_str().to_string());
            }
        }

        unit.event_wiring = self.event_wiring.is_match(body);

        for caps in self.jsx_child.captures_iter(body) {
            if let Some(tag) = caps.get(1) {
                if tag.as_str() != def.name {
                    unit.children.insert(tag.as_str().to_string());
                }
            }
        }

        unit
    }
}

impl StaticExtractor for RegexExtractor {
    fn units(&self, artifact: &ImplArtifact) -> Vec<ExtractedUnit> {
        let mut units = Vec::new();
        for (module, source) in &artifact.modules {
            let defs = self.definitions(source);
            for (index, def) in defs.iter().enumerate() {
                let body_end = defs.get(index + 1).map_or(source.len(), |next| next.start);
                let body = source.get(def.end..body_end).unwrap_or_default();
                units.push(self.unit_from(module, def, body));
            }
        }
        units
    }

    fn field_accesses(&self, artifact: &ImplArtifact) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        for source in artifact.modules.values() {
            for pattern in &self.field_access {
                for caps in pattern.captures_iter(source) {
                    if let Some(field) = caps.get(1) {
                        fields.insert(field.as_str().to_string());
                    }
                }
            }
        }
        fields
    }

    fn imports(&self, artifact: &ImplArtifact) -> BTreeMap<String, BTreeSet<String>> {
        artifact
            .modules
            .iter()
            .map(|(module, source)| {
                let specs = self
                    .import
                    .captures_iter(source)
                    .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
                    .map(|spec| spec.as_str().to_string())
                    .collect();
                (module.clone(), specs)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Parameter parsing
// ---------------------------------------------------------------------------

/// Parse a parameter list: either a destructured object (`{ a, b = 1 }: P`)
/// or plain positional parameters.
fn parse_params(text: &str) -> Vec<(String, Option<String>)> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        if let Some(close) = matching_close(trimmed, 0) {
            return parse_entries(&trimmed[1..close]);
        }
    }
    parse_entries(text)
}

/// Parse comma-separated `name`, `name = default`, `name: alias` entries.
/// Rest entries (`...rest`) are skipped.
fn parse_entries(text: &str) -> Vec<(String, Option<String>)> {
    split_top_level(text)
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.starts_with("...") {
                return None;
            }
            let name: String = entry
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
                .collect();
            if name.is_empty() {
                return None;
            }
            let default = entry[name.len()..]
                .split_once('=')
                .and_then(|(_, value)| literal(value));
            Some((name, default))
        })
        .collect()
}

/// Walk `text` tracking bracket depth outside of quotes, calling `visit`
/// with each unquoted character and the depth before it. Stops when `visit`
/// returns `false`.
fn scan_nesting(text: &str, mut visit: impl FnMut(usize, char, i32) -> bool) {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;

    for (index, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => {
                if !visit(index, ch, depth) {
                    return;
                }
                match ch {
                    '"' | '\'' | '`' => quote = Some(ch),
                    '{' | '[' | '(' => depth += 1,
                    '}' | ']' | ')' => depth -= 1,
                    _ => {}
                }
            }
        }
    }
}

/// Index of the bracket closing the one at `open`, skipping nested brackets
/// and quoted text.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let rest = text.get(open..)?;
    let mut close = None;
    scan_nesting(rest, |index, ch, depth| {
        if matches!(ch, '}' | ']' | ')') && depth == 1 {
            close = Some(open + index);
            return false;
        }
        true
    });
    close
}

/// Split on commas that are not nested inside brackets or quotes.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;

    scan_nesting(text, |index, ch, depth| {
        if ch == ',' && depth == 0 {
            parts.push(&text[start..index]);
            start = index + 1;
        }
        true
    });
    parts.push(&text[start..]);
    parts
}

/// The normalized form of a literal default (quotes stripped), or `None`
/// for anything that is not a string, number, or boolean literal.
fn literal(value: &str) -> Option<String> {
    let value = value.trim();
    let mut chars = value.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
        if matches!(first, '"' | '\'' | '`') && first == last {
            return Some(value[1..value.len() - 1].to_string());
        }
    }
    if value == "true" || value == "false" || value.parse::<f64>().is_ok() {
        return Some(value.to_string());
    }
    None
}

/// `/api/v1/wells?limit=10` and `wells.json` both name the `wells` source.
fn source_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').find(|segment| !segment.is_empty())?;
    let name = last.split('.').next().unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}
