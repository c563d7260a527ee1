//! `specweave check`: one analysis pass over a spec and its implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::adapters::knowledge::load_structured;
use crate::adapters::{InMemoryKnowledge, InMemorySchema};
use crate::cli::analyzer_cluster;
use crate::cli::output::{conflict_table, list_table, output, CommandOutput};
use crate::domain::models::{Config, Conflict, ExternalContext, ImplArtifact, SpecArtifact};

/// Source file extensions read from an implementation directory.
const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "vue", "svelte"];

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Spec artifact (YAML or JSON)
    #[arg(long)]
    pub spec: PathBuf,

    /// Implementation source files or directories
    #[arg(long = "impl", required = true, num_args = 1..)]
    pub implementation: Vec<PathBuf>,

    /// Field schema (YAML or JSON): source -> field -> spec
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Knowledge base (YAML or JSON): topic -> value
    #[arg(long)]
    pub knowledge: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzerSummary {
    pub name: String,
    pub conflicts: usize,
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub modules: usize,
    pub analyzers: Vec<AnalyzerSummary>,
    pub conflicts: Vec<Conflict>,
}

impl CommandOutput for CheckOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["analyzer", "conflicts", "time", "status"]);
        for analyzer in &self.analyzers {
            table.add_row(vec![
                analyzer.name.clone(),
                analyzer.conflicts.to_string(),
                format!("{}ms", analyzer.duration_ms),
                analyzer.error.clone().unwrap_or_else(|| "ok".to_string()),
            ]);
        }
        format!(
            "Analyzed {} module(s)\n{table}\n\n{}",
            self.modules,
            conflict_table(&self.conflicts)
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(args: CheckArgs, config: &Config, json: bool) -> Result<()> {
    let spec: SpecArtifact = load_structured(&args.spec)
        .with_context(|| format!("Failed to load spec from {}", args.spec.display()))?;
    let implementation = load_implementation(&args.implementation)?;
    let schema = match &args.schema {
        Some(path) => InMemorySchema::from_file(path)?,
        None => InMemorySchema::new(),
    };
    let knowledge = match &args.knowledge {
        Some(path) => InMemoryKnowledge::from_file(path)?,
        None => InMemoryKnowledge::new(),
    };

    let context = ExternalContext::assemble(&schema, &knowledge, &config.analysis.envelope_fields);
    let cluster = analyzer_cluster(&config.analysis)?;
    let measurements = cluster.run_with_details(&spec, &implementation, &context);

    let result = CheckOutput {
        modules: implementation.modules.len(),
        analyzers: measurements
            .iter()
            .map(|m| AnalyzerSummary {
                name: m.analyzer_name.to_string(),
                conflicts: m.conflicts.len(),
                error: m.error.clone(),
                duration_ms: m.duration_ms,
            })
            .collect(),
        conflicts: measurements.into_iter().flat_map(|m| m.conflicts).collect(),
    };
    output(&result, json);
    Ok(())
}

/// Read every source file under `paths` into one implementation artifact.
/// Module names are paths relative to the directory they were found in.
pub fn load_implementation(paths: &[PathBuf]) -> Result<ImplArtifact> {
    let mut implementation = ImplArtifact::new();
    for path in paths {
        if path.is_dir() {
            let mut files = Vec::new();
            collect_sources(path, &mut files)?;
            files.sort();
            for file in files {
                let name = file.strip_prefix(path).unwrap_or(&file).display().to_string();
                implementation = implementation.with_module(name, read_source(&file)?);
            }
        } else {
            implementation = implementation.with_module(path.display().to_string(), read_source(path)?);
        }
    }
    Ok(implementation)
}

fn collect_sources(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.') || n == "node_modules");
            if !skipped {
                collect_sources(&path, files)?;
            }
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn loads_sources_recursively_and_skips_vendor_dirs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("charts")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/lib")).unwrap();
        fs::write(dir.path().join("charts/Bar.tsx"), "export function Bar() {}").unwrap();
        fs::write(dir.path().join("App.jsx"), "export function App() {}").unwrap();
        fs::write(dir.path().join("README.md"), "# readme").unwrap();
        fs::write(dir.path().join("node_modules/lib/index.js"), "module.exports = {}").unwrap();

        let implementation = load_implementation(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = implementation.modules.keys().cloned().collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| n.ends_with("Bar.tsx")));
        assert!(names.iter().any(|n| n == "App.jsx"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_implementation(&[PathBuf::from("/nonexistent/App.tsx")]).is_err());
    }
}
