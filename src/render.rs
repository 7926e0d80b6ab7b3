//! Plain-text formatting shared by the console commands.

use colored::Colorize;

use crate::backend::{Grounding, ModelInfo, Turn, TurnRole};

/// Quotes `text` as a markdown block: bullets become `  *` list markers and
/// every line, blank ones included, gets a `> ` prefix.
pub fn quote_block(text: &str) -> String {
    text.replace('•', "  *")
        .split_inclusive('\n')
        .map(|line| format!("> {line}"))
        .collect()
}

pub fn format_history(history: &[Turn]) -> String {
    let mut out = String::new();
    for (index, turn) in history.iter().enumerate() {
        let speaker = match turn.role {
            TurnRole::User => "You",
            TurnRole::Model => "Model",
        };
        out.push_str(&format!("\n[{}]\n{speaker}: {}\n", index + 1, turn.text));
    }
    out
}

/// Search queries and source titles, one line each; empty when the
/// backend returned neither.
pub fn format_grounding(grounding: &Grounding) -> Vec<String> {
    let mut lines = Vec::new();
    if !grounding.queries.is_empty() {
        lines.push(format!("Search queries: {}", grounding.queries.join(", ")));
    }

    let titles: Vec<&str> = grounding
        .sources
        .iter()
        .map(|source| source.title.as_str())
        .filter(|title| !title.is_empty())
        .collect();
    if !titles.is_empty() {
        lines.push(format!("Sources used: {}", titles.join(", ")));
    }
    lines
}

fn is_active_model(model: &ModelInfo, active: &str) -> bool {
    let id = model.id.strip_prefix("models/").unwrap_or(&model.id);
    let active = active.strip_prefix("models/").unwrap_or(active);
    id == active
}

/// One line per model; the active one is marked.
pub fn format_model_list(models: &[ModelInfo], active: &str) -> Vec<String> {
    models
        .iter()
        .map(|model| {
            let name = model
                .display_name
                .as_deref()
                .map(|name| format!(": {name}"))
                .unwrap_or_default();
            let context = model
                .context_length
                .map(|len| format!(" ({len} context)"))
                .unwrap_or_default();
            if is_active_model(model, active) {
                format!("- {}{name}{context} (active)", model.id)
            } else {
                format!("- {}{name}{context}", model.id)
            }
        })
        .collect()
}

pub fn print_header(title: &str) {
    println!("\n{}\n", format!("--- {title} ---").bold().cyan());
}

pub fn print_quoted(text: &str) {
    if text.is_empty() {
        println!("{}", "(empty response)".dimmed());
    } else {
        println!("{}", quote_block(text));
    }
}

pub fn print_warning(message: &str) {
    println!("{} {message}", "⚠️".yellow());
}
