//! `specweave replay`: drive the convergence loop with scripted producers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::ScriptedSession;
use crate::cli::analyzer_cluster;
use crate::cli::output::{conflict_table, list_table, output, CommandOutput};
use crate::domain::models::{Config, ConvergenceOutcome, RoundDecision, RoundRecord};
use crate::services::{ArtifactStore, ConvergenceController};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Session script (YAML or JSON)
    #[arg(long)]
    pub session: PathBuf,

    /// Round budget (overrides convergence.max_rounds)
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Acceptable conflict ceiling (overrides convergence.acceptable_conflict_ceiling)
    #[arg(long)]
    pub ceiling: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ReplayOutput {
    pub session_id: Uuid,
    pub outcome: ConvergenceOutcome,
    pub rounds: Vec<RoundRecord>,
    pub change_requests: usize,
    pub messages: usize,
    pub patches: usize,
}

impl CommandOutput for ReplayOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["round", "spec", "impl", "conflicts", "high+", "decision"]);
        for record in &self.rounds {
            let decision = match record.decision {
                RoundDecision::Continue => "continue".to_string(),
                RoundDecision::Halt(reason) => format!("halt: {reason}"),
            };
            table.add_row(vec![
                record.round.to_string(),
                format!("v{}", record.spec_version),
                format!("v{}", record.impl_version),
                record.conflict_count.to_string(),
                (record.severities.high + record.severities.critical).to_string(),
                decision,
            ]);
        }

        let mut lines = vec![
            format!("Session {}", self.session_id),
            format!(
                "Halted: {} after {} round(s)",
                self.outcome.halt_reason, self.outcome.rounds_used
            ),
        ];
        if let Some(failure) = &self.outcome.failure {
            lines.push(format!("Failure: {failure}"));
        }
        lines.push(format!(
            "Change requests: {}  Messages: {}  Patches: {}",
            self.change_requests, self.messages, self.patches
        ));
        lines.push(String::new());
        lines.push(table.to_string());
        lines.push(String::new());
        lines.push(conflict_table(&self.outcome.unresolved_conflicts));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ReplayArgs, config: &Config, json: bool) -> Result<()> {
    let session = ScriptedSession::from_file(&args.session)?;
    let (spec_producer, impl_producer) = session.producers();

    let cluster = analyzer_cluster(&config.analysis)?;
    let mut controller = ConvergenceController::new(
        Arc::new(spec_producer),
        Arc::new(impl_producer),
        cluster,
        Arc::new(session.schema.clone()),
        Arc::new(session.knowledge.clone()),
        config.convergence.clone(),
    )
    .with_envelope_fields(config.analysis.envelope_fields.clone());

    let max_rounds = args.max_rounds.unwrap_or(config.convergence.max_rounds);
    let ceiling = args
        .ceiling
        .unwrap_or(config.convergence.acceptable_conflict_ceiling);

    let mut store = ArtifactStore::new();
    let outcome = controller
        .run(&mut store, &session.requirements, max_rounds, ceiling)
        .await
        .context("Convergence run failed")?;

    let result = ReplayOutput {
        session_id: store.session_id(),
        outcome,
        rounds: store.round_log().to_vec(),
        change_requests: store.change_requests().len(),
        messages: store.messages().len(),
        patches: store.patches().len(),
    };
    output(&result, json);
    Ok(())
}
