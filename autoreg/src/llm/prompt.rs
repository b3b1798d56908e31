//! Prompt rendering for the table designer, table writer, and analyst calls.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::regress::RegressionKind;

const DESIGN_TEMPLATE: &str = include_str!("prompts/design.md");
const TABLE_TEMPLATE: &str = include_str!("prompts/table.md");
const COMBINE_TEMPLATE: &str = include_str!("prompts/combine.md");
const ANALYSIS_TEMPLATE: &str = include_str!("prompts/analysis.md");

const TABLE_BASIC_SKELETON: &str = include_str!("prompts/table_basic.tex");
const TABLE_IV_SKELETON: &str = include_str!("prompts/table_iv.tex");
const TABLE_GROUP_SKELETON: &str = include_str!("prompts/table_group.tex");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("design", DESIGN_TEMPLATE)
            .expect("design template should be valid");
        env.add_template("table", TABLE_TEMPLATE)
            .expect("table template should be valid");
        env.add_template("combine", COMBINE_TEMPLATE)
            .expect("combine template should be valid");
        env.add_template("analysis", ANALYSIS_TEMPLATE)
            .expect("analysis template should be valid");
        Self { env }
    }

    /// Prompt asking the model to group the indexed result descriptions
    /// into tables. `max_index` is the largest usable index, inclusive.
    pub fn render_design(
        &self,
        research_topic: &str,
        regression_descriptions: &str,
        max_index: usize,
    ) -> Result<String> {
        let template = self.env.get_template("design")?;
        let rendered = template.render(context! {
            research_topic => research_topic.trim(),
            regression_descriptions => regression_descriptions,
            max_index => max_index,
        })?;
        Ok(rendered)
    }

    /// Prompt asking the model to typeset one regression's results as a
    /// LaTeX table, following the skeleton for its regression kind.
    pub fn render_table(
        &self,
        number_of_results: usize,
        regression_config: &str,
        regression_description: &str,
        regression_results: &str,
        kind: RegressionKind,
    ) -> Result<String> {
        let template = self.env.get_template("table")?;
        let rendered = template.render(context! {
            number_of_results => number_of_results,
            regression_config => regression_config,
            regression_description => regression_description,
            regression_results => regression_results,
            latex_table_template => table_skeleton(kind),
        })?;
        Ok(rendered)
    }

    /// Prompt asking the model to merge two rendered tables into one.
    pub fn render_combine(&self, table_title: &str, regression_tables: &str) -> Result<String> {
        let template = self.env.get_template("combine")?;
        let rendered = template.render(context! {
            table_title => table_title,
            regression_tables => regression_tables,
        })?;
        Ok(rendered)
    }

    /// Prompt asking the model for a prose analysis of one rendered table.
    pub fn render_analysis(
        &self,
        regression_config: &str,
        regression_description: &str,
        regression_table: &str,
        language: &str,
    ) -> Result<String> {
        let template = self.env.get_template("analysis")?;
        let rendered = template.render(context! {
            regression_config => regression_config,
            regression_description => regression_description,
            regression_table => regression_table,
            language => language,
        })?;
        Ok(rendered)
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// LaTeX skeleton handed to the table writer for its regression kind.
pub fn table_skeleton(kind: RegressionKind) -> &'static str {
    match kind {
        RegressionKind::Basic => TABLE_BASIC_SKELETON,
        RegressionKind::TwoStage => TABLE_IV_SKELETON,
        RegressionKind::Grouped => TABLE_GROUP_SKELETON,
    }
}
