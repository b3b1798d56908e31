//! Combine rendered per-result tables into the final per-group tables.

use anyhow::Result;
use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::design::TableDesign;
use crate::core::tables::{EMPTY_ARTIFACT, ResultTables};
use crate::llm::{ChatModel, PromptEngine, complete_parsed};

#[derive(Debug, Deserialize)]
struct CombinedPayload {
    latex_table: String,
}

/// Collapse per-result tables into one table per design group.
///
/// Single-index groups pass their table through byte-for-byte with no model
/// call; two-index groups are merged by the model under the group's title.
/// The returned [`ResultTables`] has exactly `design.number_of_tables` slots,
/// with descriptions taken from the design titles and analyses concatenated
/// from the member results.
pub async fn combine_tables<C: ChatModel>(
    chat: &C,
    engine: &PromptEngine,
    tables: &ResultTables,
    design: &TableDesign,
    max_attempts: u32,
) -> Result<ResultTables> {
    tables.check_consistent()?;

    let merges = design.table_index.iter().enumerate().map(|(group, indices)| {
        let title = group_title(design, group);
        async move {
            if indices.len() < 2 {
                debug!(group, "single-member group passes through unmerged");
                return tables
                    .tables_at(indices)
                    .first()
                    .map_or_else(|| EMPTY_ARTIFACT.to_string(), ToString::to_string);
            }
            combine_one(chat, engine, group, &title, tables, indices, max_attempts).await
        }
    });
    let combined = join_all(merges).await;

    let descriptions = (0..design.table_index.len())
        .map(|group| group_title(design, group))
        .collect();
    let analyses = design
        .table_index
        .iter()
        .map(|indices| tables.joined_analysis(indices))
        .collect();
    Ok(ResultTables::new(combined, descriptions, analyses)?)
}

async fn combine_one<C: ChatModel>(
    chat: &C,
    engine: &PromptEngine,
    group: usize,
    title: &str,
    tables: &ResultTables,
    indices: &[usize],
    max_attempts: u32,
) -> String {
    let members = tables.tables_at(indices).join("\n\n");
    for attempt in 1..=max_attempts {
        let prompt = match engine.render_combine(title, &members) {
            Ok(prompt) => prompt,
            Err(error) => {
                warn!(group, %error, "combine prompt failed to render");
                return EMPTY_ARTIFACT.to_string();
            }
        };
        match complete_parsed::<_, CombinedPayload>(chat, &prompt).await {
            Ok(payload) => return payload.latex_table,
            Err(error) => {
                warn!(group, attempt, %error, "combined table unusable, retrying");
            }
        }
    }
    warn!(group, max_attempts, "combine exhausted retries, using placeholder");
    EMPTY_ARTIFACT.to_string()
}

fn group_title(design: &TableDesign, group: usize) -> String {
    design
        .table_title
        .get(group)
        .cloned()
        .unwrap_or_else(|| format!("Table {}", group + 1))
}
