//! Table rendering and prose analysis fan-out.
//!
//! Both passes issue one model call per regression result, concurrently, and
//! collect outputs back in input order. A slot the design never references,
//! or one whose retries are exhausted, holds [`EMPTY_ARTIFACT`] rather than
//! failing the run.

use anyhow::Result;
use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::design::{TableDesign, used_indices};
use crate::core::tables::{EMPTY_ARTIFACT, ResultTables};
use crate::llm::{ChatModel, PromptEngine, complete_parsed};
use crate::regress::RegressionResult;

#[derive(Debug, Deserialize)]
struct TablePayload {
    latex_table: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    analysis: String,
}

/// Render one LaTeX table per design-referenced regression result.
///
/// The returned [`ResultTables`] has one slot per regression result:
/// rendered LaTeX for referenced indices, [`EMPTY_ARTIFACT`] for the rest.
/// Analyses start as placeholders; [`analyze_tables`] fills them.
pub async fn draw_tables<C: ChatModel>(
    chat: &C,
    engine: &PromptEngine,
    results: &[RegressionResult],
    design: &TableDesign,
    max_attempts: u32,
) -> Result<ResultTables> {
    let used = used_indices(design);

    let renders = results.iter().enumerate().map(|(index, result)| {
        let used = used.contains(&index);
        async move {
            if !used {
                debug!(index, "result unused by the design, skipping render");
                return EMPTY_ARTIFACT.to_string();
            }
            draw_one(chat, engine, index, result, max_attempts).await
        }
    });
    let tables = join_all(renders).await;

    let descriptions = results
        .iter()
        .map(|result| result.description.clone())
        .collect();
    let analyses = vec![EMPTY_ARTIFACT.to_string(); results.len()];
    Ok(ResultTables::new(tables, descriptions, analyses)?)
}

async fn draw_one<C: ChatModel>(
    chat: &C,
    engine: &PromptEngine,
    index: usize,
    result: &RegressionResult,
    max_attempts: u32,
) -> String {
    let fitted = result
        .results
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    for attempt in 1..=max_attempts {
        let prompt = match engine.render_table(
            result.results.len(),
            &result.spec.to_string(),
            &result.description,
            &fitted,
            result.kind,
        ) {
            Ok(prompt) => prompt,
            Err(error) => {
                warn!(index, %error, "table prompt failed to render");
                return EMPTY_ARTIFACT.to_string();
            }
        };
        match complete_parsed::<_, TablePayload>(chat, &prompt).await {
            Ok(payload) => return payload.latex_table,
            Err(error) => {
                warn!(index, attempt, %error, "table render unusable, retrying");
            }
        }
    }
    warn!(index, max_attempts, "table render exhausted retries, using placeholder");
    EMPTY_ARTIFACT.to_string()
}

/// Write a prose analysis for every rendered table.
///
/// Consumes and returns the whole [`ResultTables`] so the analyses vector is
/// replaced in one assignment and the length invariant re-checked. Slots
/// holding [`EMPTY_ARTIFACT`] tables get placeholder analyses without a
/// model call.
pub async fn analyze_tables<C: ChatModel>(
    chat: &C,
    engine: &PromptEngine,
    results: &[RegressionResult],
    mut tables: ResultTables,
    language: &str,
    max_attempts: u32,
) -> Result<ResultTables> {
    tables.check_consistent()?;

    let analyses = results.iter().zip(&tables.tables).enumerate().map(
        |(index, (result, table))| async move {
            if table.is_empty() {
                return EMPTY_ARTIFACT.to_string();
            }
            analyze_one(chat, engine, index, result, table, language, max_attempts).await
        },
    );
    tables.analyses = join_all(analyses).await;

    tables.check_consistent()?;
    Ok(tables)
}

async fn analyze_one<C: ChatModel>(
    chat: &C,
    engine: &PromptEngine,
    index: usize,
    result: &RegressionResult,
    table: &str,
    language: &str,
    max_attempts: u32,
) -> String {
    for attempt in 1..=max_attempts {
        let prompt = match engine.render_analysis(
            &result.spec.to_string(),
            &result.description,
            table,
            language,
        ) {
            Ok(prompt) => prompt,
            Err(error) => {
                warn!(index, %error, "analysis prompt failed to render");
                return EMPTY_ARTIFACT.to_string();
            }
        };
        match complete_parsed::<_, AnalysisPayload>(chat, &prompt).await {
            Ok(payload) => return payload.analysis,
            Err(error) => {
                warn!(index, attempt, %error, "analysis unusable, retrying");
            }
        }
    }
    warn!(index, max_attempts, "analysis exhausted retries, using placeholder");
    EMPTY_ARTIFACT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::design::TableDesign;
    use crate::regress::{RegressionKind, RegressionSpec};
    use crate::test_support::ScriptedChat;

    fn results(n: usize) -> Vec<RegressionResult> {
        (0..n)
            .map(|i| RegressionResult {
                description: format!("regression {i}"),
                results: Vec::new(),
                kind: RegressionKind::Basic,
                spec: RegressionSpec::default(),
            })
            .collect()
    }

    fn full_design(groups: Vec<Vec<usize>>) -> TableDesign {
        TableDesign {
            number_of_tables: groups.len(),
            table_index: groups,
            table_regression_nums: Vec::new(),
            table_title: Vec::new(),
        }
    }

    #[tokio::test]
    async fn unused_indices_get_placeholders_without_model_calls() {
        let chat = ScriptedChat::new(vec![
            r#"{"latex_table": "T"}"#.to_string(),
            r#"{"latex_table": "T"}"#.to_string(),
        ]);
        let design = full_design(vec![vec![0], vec![2]]);
        let tables = draw_tables(&chat, &PromptEngine::new(), &results(3), &design, 2)
            .await
            .expect("draw");

        assert_eq!(tables.len(), 3);
        assert_eq!(tables.tables[1], EMPTY_ARTIFACT);
        assert_ne!(tables.tables[0], EMPTY_ARTIFACT);
        assert_ne!(tables.tables[2], EMPTY_ARTIFACT);
        assert_eq!(chat.calls(), 2);
    }

    #[tokio::test]
    async fn exhausted_render_degrades_to_placeholder() {
        let chat = ScriptedChat::new(vec![
            "garbage".to_string(),
            "still garbage".to_string(),
        ]);
        let design = full_design(vec![vec![0]]);
        let tables = draw_tables(&chat, &PromptEngine::new(), &results(1), &design, 2)
            .await
            .expect("draw");

        assert_eq!(tables.tables[0], EMPTY_ARTIFACT);
        assert_eq!(chat.calls(), 2);
    }

    #[tokio::test]
    async fn descriptions_survive_rendering_unchanged() {
        let chat = ScriptedChat::new(vec![r#"{"latex_table": "T"}"#.to_string()]);
        let design = full_design(vec![vec![0]]);
        let tables = draw_tables(&chat, &PromptEngine::new(), &results(1), &design, 2)
            .await
            .expect("draw");
        assert_eq!(tables.descriptions, vec!["regression 0"]);
    }

    #[tokio::test]
    async fn analyses_fill_only_rendered_slots() {
        let drawn = ResultTables::new(
            vec!["table 0".to_string(), EMPTY_ARTIFACT.to_string()],
            vec!["d0".to_string(), "d1".to_string()],
            vec![EMPTY_ARTIFACT.to_string(); 2],
        )
        .expect("consistent");
        let chat = ScriptedChat::new(vec![r#"{"analysis": "prose"}"#.to_string()]);
        let analyzed = analyze_tables(&chat, &PromptEngine::new(), &results(2), drawn, "English", 2)
            .await
            .expect("analyze");

        assert_eq!(analyzed.analyses, vec!["prose", EMPTY_ARTIFACT]);
        assert_eq!(chat.calls(), 1);
    }
}
