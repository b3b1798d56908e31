//! Regression runner: executes the expanded battery against the dataset.
//!
//! Fitting is synchronous and runs to completion before any model call is
//! issued. Each specification yields one [`RegressionResult`] holding one or
//! two ordered sub-results; the ordering is semantically meaningful and is
//! spelled out in the result description.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::regress::fit::{EffectSpec, FitResult, fit_within};
use crate::regress::panel::PanelData;
use crate::regress::spec::RegressionSpec;

/// Which fitting procedure produced a result; selects the table skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionKind {
    Basic,
    TwoStage,
    Grouped,
}

/// One regression specification evaluated against the dataset.
#[derive(Debug, Clone)]
pub struct RegressionResult {
    /// Human-readable label. Never mutated after creation; index headers for
    /// prompts are formatted on the fly by [`crate::core::describe`].
    pub description: String,
    /// Ordered 1-2 fit outputs (without/with controls, stage 1/2, group 0/1).
    pub results: Vec<FitResult>,
    pub kind: RegressionKind,
    pub spec: RegressionSpec,
}

/// Run every specification in order, synchronously.
pub fn run_regressions(
    data: &PanelData,
    specs: &[(String, RegressionSpec)],
) -> Result<Vec<RegressionResult>> {
    let mut regression_results = Vec::with_capacity(specs.len());

    for (description, spec) in specs {
        info!(description, "fitting regression");
        let result = if spec.instrument_var.is_some() {
            RegressionResult {
                description: format!(
                    "{description}\n The first regression result is stage 1 of 2SLS, regressing the endogenous variable on the instrument\n The second regression result is stage 2, using predicted values from the first stage"
                ),
                results: two_stage_regression(data, spec)
                    .with_context(|| format!("two-stage regression '{description}'"))?,
                kind: RegressionKind::TwoStage,
                spec: spec.clone(),
            }
        } else if spec.group_var.is_some() {
            RegressionResult {
                description: format!(
                    "{description}\n The first regression result is the subsample with group variable == 0\n The second regression result is the subsample with group variable == 1"
                ),
                results: grouped_regression(data, spec)
                    .with_context(|| format!("grouped regression '{description}'"))?,
                kind: RegressionKind::Grouped,
                spec: spec.clone(),
            }
        } else {
            let description = if spec.run_without_controls {
                format!(
                    "{description}\n The first regression result is the one without controls\n The second regression result is the one with controls"
                )
            } else {
                description.clone()
            };
            RegressionResult {
                results: basic_regression(data, spec)
                    .with_context(|| format!("basic regression '{description}'"))?,
                description,
                kind: RegressionKind::Basic,
                spec: spec.clone(),
            }
        };
        regression_results.push(result);
    }

    Ok(regression_results)
}

/// Panel OLS of dependent on independent + controls. When the spec asks for
/// it, a controls-free fit is placed first.
fn basic_regression(data: &PanelData, spec: &RegressionSpec) -> Result<Vec<FitResult>> {
    let dependent = first_dependent(spec)?;
    let effects = EffectSpec::from_names(&spec.effects);

    let mut exog = spec.independent_vars.clone();
    exog.extend(spec.control_vars.iter().cloned());
    let with_controls = fit_within(data, dependent, &exog, &effects, spec.constant)?;

    let mut results = Vec::with_capacity(2);
    if spec.run_without_controls {
        let without =
            fit_within(data, dependent, &spec.independent_vars, &effects, spec.constant)?;
        results.push(without);
    }
    results.push(with_controls);
    Ok(results)
}

/// 2SLS: stage 1 regresses the endogenous regressor on the instrument and
/// controls; stage 2 replaces the regressor with stage-1 fitted values.
fn two_stage_regression(data: &PanelData, spec: &RegressionSpec) -> Result<Vec<FitResult>> {
    let dependent = first_dependent(spec)?;
    let endogenous = spec
        .independent_vars
        .first()
        .ok_or_else(|| anyhow::anyhow!("two-stage regression needs an independent variable"))?;
    let instrument = spec
        .instrument_var
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("two-stage regression needs an instrument"))?;
    let effects = EffectSpec::from_names(&spec.effects);

    let mut stage1_exog = vec![instrument.clone()];
    stage1_exog.extend(spec.control_vars.iter().cloned());
    let stage1 = fit_within(data, endogenous, &stage1_exog, &effects, spec.constant)?;

    let predicted_name = format!("{endogenous}_predicted");
    let augmented = data.with_column(&predicted_name, stage1.fitted.clone())?;

    let mut stage2_exog = vec![predicted_name];
    stage2_exog.extend(spec.control_vars.iter().cloned());
    let stage2 = fit_within(&augmented, dependent, &stage2_exog, &effects, spec.constant)?;

    Ok(vec![stage1, stage2])
}

/// Split the sample on the 0/1 group variable and fit each subsample;
/// group 0 first.
fn grouped_regression(data: &PanelData, spec: &RegressionSpec) -> Result<Vec<FitResult>> {
    let dependent = first_dependent(spec)?;
    let group_var = spec
        .group_var
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("grouped regression needs a group variable"))?;
    let effects = EffectSpec::from_names(&spec.effects);

    let mut exog = spec.independent_vars.clone();
    exog.extend(spec.control_vars.iter().cloned());

    let mut results = Vec::with_capacity(2);
    for group_value in [0.0, 1.0] {
        let subsample = data.filter_eq(group_var, group_value)?;
        let fit = fit_within(&subsample, dependent, &exog, &effects, spec.constant)
            .with_context(|| format!("group {group_var} == {group_value}"))?;
        results.push(fit);
    }
    Ok(results)
}

fn first_dependent(spec: &RegressionSpec) -> Result<&str> {
    spec.dependent_vars
        .first()
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("regression spec has no dependent variable"))
}
