//! Display utilities for the CLI

use colored::*;

use quorumvault_types::VaultEvent;

use crate::script::{ScriptRun, StepResult};

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", "━".repeat(60).bright_black());
    println!(" {}", title.bright_white().bold());
    println!("{}", "━".repeat(60).bright_black());
}

/// Print a success message
pub fn success(message: &str) {
    println!("  {} {}", "✓".bright_green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    println!("  {} {}", "✗".bright_red(), message.bright_red());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("      {}: {}", key, value.bright_cyan());
}

fn event_line(event: &VaultEvent) -> String {
    match event {
        VaultEvent::Deposit { sender, amount, .. } => format!("{} from {}", amount, sender),
        VaultEvent::Submission { transaction_id, .. } => transaction_id.to_string(),
        VaultEvent::Confirmation { owner, transaction_id, .. }
        | VaultEvent::Revocation { owner, transaction_id, .. } => {
            format!("{} by {}", transaction_id, owner)
        }
        VaultEvent::Execution { transaction_id, .. } => transaction_id.to_string(),
        VaultEvent::ExecutionFailure { transaction_id, reason, .. } => {
            format!("{}: {}", transaction_id, reason)
        }
    }
}

/// Print a replayed script: steps, events and the closing summary
pub fn script_run(run: &ScriptRun) {
    section("Steps");
    for step in &run.steps {
        let label = format!("#{} {}", step.index, step.op);
        match &step.result {
            StepResult::Ok { detail } => success(&format!("{} - {}", label, detail)),
            StepResult::Rejected { code, message } => {
                error(&format!("{} - {} ({})", label, message, code))
            }
        }
    }

    section("Events");
    for event in &run.events {
        println!(
            "  {} {}",
            format!("{:<16}", event.kind()).bright_blue(),
            event_line(event)
        );
    }

    section("Summary");
    kv("transactions", &run.summary.transactions.to_string());
    kv("pending", &run.summary.pending.to_string());
    kv("executed", &run.summary.executed.to_string());
    kv("transfers", &run.summary.transfers.to_string());
    kv("balance", &run.summary.balance.to_string());
}
