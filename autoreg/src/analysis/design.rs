//! Table design: ask the model to partition regression results into tables,
//! accepting only a validated exact cover.

use anyhow::Result;
use tracing::{info, warn};

use crate::core::describe::indexed_description;
use crate::core::design::{TableDesign, validate_design};
use crate::error::AutoRegError;
use crate::llm::{ChatModel, PromptEngine, complete_parsed};
use crate::regress::RegressionResult;

/// All result descriptions, each under its index header, ready for the
/// design prompt.
pub fn describe_results(results: &[RegressionResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            indexed_description(index, result.results.len(), &result.description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask the model for a table design, retrying up to `max_attempts` times.
///
/// A malformed completion or an invalid partition consumes one attempt; the
/// failure is logged and the prompt is re-issued from scratch. Exhausting the
/// budget is fatal ([`AutoRegError::DesignInvalid`]).
pub async fn design_tables<C: ChatModel>(
    chat: &C,
    engine: &PromptEngine,
    research_topic: &str,
    results: &[RegressionResult],
    max_attempts: u32,
) -> Result<TableDesign> {
    let descriptions = describe_results(results);
    let max_index = results.len().saturating_sub(1);
    let prompt = engine.render_design(research_topic, &descriptions, max_index)?;

    let mut last_failure = String::from("no attempt completed");
    for attempt in 1..=max_attempts {
        let design: TableDesign = match complete_parsed(chat, &prompt).await {
            Ok(design) => design,
            Err(error) => {
                warn!(attempt, %error, "design completion unusable, retrying");
                last_failure = format!("{error:#}");
                continue;
            }
        };
        match validate_design(&design, results.len()) {
            Ok(()) => {
                info!(attempt, tables = design.number_of_tables, "table design accepted");
                return Ok(design);
            }
            Err(violation) => {
                warn!(attempt, %violation, "design rejected, retrying");
                last_failure = violation.to_string();
            }
        }
    }

    Err(AutoRegError::DesignInvalid {
        attempts: max_attempts,
        last: last_failure,
    }
    .into())
}
