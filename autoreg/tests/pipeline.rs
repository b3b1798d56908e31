//! End-to-end pipeline tests with a scripted chat backend.
//!
//! No network, no converters: the model is scripted and only the LaTeX
//! format is emitted.

use std::fs;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;

use autoreg::analysis::draw_tables;
use autoreg::core::design::TableDesign;
use autoreg::io::document::{FormatOutcome, OutputFormat};
use autoreg::io::settings::Settings;
use autoreg::llm::{ChatModel, PromptEngine};
use autoreg::pipeline::{PipelineOptions, TableSelection, check_inputs, run_pipeline};
use autoreg::regress::{RegressionKind, RegressionResult, RegressionSpec};
use autoreg::test_support::ScriptedChat;

fn write_inputs(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let research = dir.join("research.json");
    fs::write(
        &research,
        json!({
            "research_topic": "temperature and output",
            "dependent_vars": ["y"],
            "independent_vars": ["x"],
            "replacement_x_vars": ["x2"],
            "effects": ["entity"],
            "constant": true
        })
        .to_string(),
    )
    .expect("write research config");

    let dataset = dir.join("panel.csv");
    let mut csv = String::from("entity,time,x,x2,y\n");
    for e in 0..3u32 {
        for t in 0..4u32 {
            let (ef, tf) = (f64::from(e), f64::from(t));
            let x = ef + tf + 0.2 * tf * tf;
            let x2 = 0.5 * ef + 0.3 * tf * tf * tf;
            let y = 1.5 * x + ef;
            csv.push_str(&format!("E{e},{t},{x},{x2},{y}\n"));
        }
    }
    fs::write(&dataset, csv).expect("write dataset");
    (research, dataset)
}

fn options(
    research: std::path::PathBuf,
    dataset: std::path::PathBuf,
    out_dir: std::path::PathBuf,
) -> PipelineOptions {
    PipelineOptions {
        research_path: research,
        dataset_path: dataset,
        entity_col: "entity".to_string(),
        time_col: "time".to_string(),
        out_dir,
        selection: TableSelection::All,
        formats: vec![OutputFormat::Latex],
    }
}

#[tokio::test]
async fn scripted_run_produces_a_latex_report() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (research, dataset) = write_inputs(temp.path());
    let out_dir = temp.path().join("out");

    // One design call, two renders, two analyses, one merge.
    let chat = ScriptedChat::new(vec![
        json!({
            "number_of_tables": 1,
            "table_index": [[0, 1]],
            "table_regression_nums": [2],
            "table_title": ["Main results"]
        })
        .to_string(),
        json!({"latex_table": "TABLE_BASIC"}).to_string(),
        json!({"latex_table": "TABLE_ROBUST"}).to_string(),
        json!({"analysis": "ANALYSIS_BASIC"}).to_string(),
        json!({"analysis": "ANALYSIS_ROBUST"}).to_string(),
        json!({"latex_table": "COMBINED_TABLE"}).to_string(),
    ]);

    let report = run_pipeline(
        &chat,
        &Settings::default(),
        &options(research, dataset, out_dir.clone()),
    )
    .await
    .expect("pipeline");

    assert_eq!(report.regressions, 2);
    assert_eq!(report.designed_tables, 1);
    assert_eq!(report.kept_tables, 1);
    assert_eq!(chat.calls(), 6);

    let tex_path = match &report.outcomes[0] {
        FormatOutcome::Written { path, .. } => path.clone(),
        FormatOutcome::Failed { reason, .. } => panic!("latex failed: {reason}"),
    };
    let tex = fs::read_to_string(tex_path).expect("read report");
    assert!(tex.contains("COMBINED_TABLE"));
    assert!(tex.contains("ANALYSIS_BASIC"));
    assert!(tex.contains("ANALYSIS_ROBUST"));
    assert!(tex.contains("\\section*{Main results}"));
    assert!(!tex.contains("TABLE_BASIC"), "pre-merge tables stay out of the report");
}

#[tokio::test]
async fn design_retry_exhaustion_fails_the_run() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (research, dataset) = write_inputs(temp.path());

    // Every attempt covers only one of the two results.
    let bad = json!({"number_of_tables": 1, "table_index": [[0]]}).to_string();
    let chat = ScriptedChat::new(vec![bad.clone(), bad.clone(), bad]);

    let error = run_pipeline(
        &chat,
        &Settings::default(),
        &options(research, dataset, temp.path().join("out")),
    )
    .await
    .expect_err("design should exhaust");
    assert!(format!("{error:#}").contains("after 3 attempts"));
    assert_eq!(chat.calls(), 3);
}

#[tokio::test]
async fn validate_mode_counts_the_battery_without_model_calls() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (research, dataset) = write_inputs(temp.path());
    let regressions = check_inputs(&options(research, dataset, temp.path().join("out")))
        .expect("validate");
    assert_eq!(regressions, 2);
}

/// Chat backend that answers out of order: earlier prompts take longer.
struct DelayedChat;

impl ChatModel for DelayedChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let index = [0, 1, 2]
            .into_iter()
            .find(|i| prompt.contains(&format!("regression {i}")))
            .expect("prompt should name a regression");
        tokio::time::sleep(Duration::from_millis([30, 5, 15][index])).await;
        Ok(format!("{{\"latex_table\": \"T{index}\"}}"))
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_renders_collect_in_input_order() {
    let results: Vec<RegressionResult> = (0..3)
        .map(|i| RegressionResult {
            description: format!("regression {i}"),
            results: Vec::new(),
            kind: RegressionKind::Basic,
            spec: RegressionSpec::default(),
        })
        .collect();
    let design = TableDesign {
        number_of_tables: 2,
        table_index: vec![vec![0, 1], vec![2]],
        table_regression_nums: vec![2, 1],
        table_title: vec!["A".to_string(), "B".to_string()],
    };

    let tables = draw_tables(&DelayedChat, &PromptEngine::new(), &results, &design, 2)
        .await
        .expect("draw");
    assert_eq!(tables.tables, vec!["T0", "T1", "T2"]);
}
