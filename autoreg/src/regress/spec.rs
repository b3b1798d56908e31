//! Research configuration and its expansion into a regression battery.
//!
//! The research config is a human-authored JSON document naming the study
//! variables. `generate_specs` expands it into the ordered list of concrete
//! regression specifications the runner executes: the basic regression, the
//! robustness variants, the 2SLS endogeneity tests, the mediating-effect
//! regressions, and the heterogeneity splits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AutoRegError;
use crate::regress::panel::PanelData;

/// One concrete regression specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionSpec {
    pub regression_type: String,
    pub dependent_vars: Vec<String>,
    pub dependent_var_description: Vec<String>,
    pub independent_vars: Vec<String>,
    pub independent_var_description: Vec<String>,
    pub control_vars: Vec<String>,
    pub control_vars_description: Vec<String>,
    pub effects: Vec<String>,
    pub constant: bool,
    pub run_without_controls: bool,
    pub instrument_var: Option<String>,
    pub instrument_var_description: Option<String>,
    pub group_var: Option<String>,
    pub group_var_description: Option<String>,
}

impl fmt::Display for RegressionSpec {
    /// Non-empty fields as `key: value` lines, the form the prompts embed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = Vec::new();
        lines.push(format!("regression_type: {}", self.regression_type));
        let mut push_list = |key: &str, values: &[String]| {
            if !values.is_empty() {
                lines.push(format!("{key}: {}", values.join(", ")));
            }
        };
        push_list("dependent_vars", &self.dependent_vars);
        push_list("dependent_var_description", &self.dependent_var_description);
        push_list("independent_vars", &self.independent_vars);
        push_list(
            "independent_var_description",
            &self.independent_var_description,
        );
        push_list("control_vars", &self.control_vars);
        push_list("control_vars_description", &self.control_vars_description);
        push_list("effects", &self.effects);
        if let Some(instrument) = &self.instrument_var {
            lines.push(format!("instrument_var: {instrument}"));
        }
        if let Some(group) = &self.group_var {
            lines.push(format!("group_var: {group}"));
        }
        lines.push(format!("constant: {}", self.constant));
        write!(f, "{}", lines.join("\n"))
    }
}

/// Declarative research configuration (JSON).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub research_topic: String,

    pub dependent_vars: Vec<String>,
    pub dependent_var_description: Vec<String>,
    pub independent_vars: Vec<String>,
    pub independent_var_description: Vec<String>,

    pub control_vars: Vec<String>,
    pub control_vars_description: Vec<String>,

    pub instrument_vars: Vec<String>,
    pub instrument_vars_description: Vec<String>,

    pub group_vars: Vec<String>,
    pub group_vars_description: Vec<String>,

    pub mediating_vars: Vec<String>,
    pub mediating_vars_description: Vec<String>,

    pub extra_control_vars: Vec<String>,
    pub extra_control_vars_description: Vec<String>,

    pub extra_effects: Vec<String>,

    pub replacement_x_vars: Vec<String>,
    pub replacement_x_vars_description: Vec<String>,
    pub replacement_y_vars: Vec<String>,
    pub replacement_y_vars_description: Vec<String>,

    pub effects: Vec<String>,

    pub constant: bool,
    pub run_another_regression_without_controls: bool,
}

impl ResearchConfig {
    fn all_vars(&self) -> Vec<&String> {
        self.dependent_vars
            .iter()
            .chain(&self.independent_vars)
            .chain(&self.control_vars)
            .chain(&self.instrument_vars)
            .chain(&self.group_vars)
            .chain(&self.mediating_vars)
            .chain(&self.extra_control_vars)
            .chain(&self.replacement_x_vars)
            .chain(&self.replacement_y_vars)
            .collect()
    }

    /// Check the config is complete and every named variable exists in the
    /// dataset. Fatal before any regression runs.
    pub fn validate_columns(&self, data: &PanelData) -> Result<(), AutoRegError> {
        if self.dependent_vars.is_empty() || self.independent_vars.is_empty() {
            return Err(AutoRegError::Configuration(
                "dependent and independent variables are required".to_string(),
            ));
        }
        for var in self.all_vars() {
            if !data.has_column(var) {
                return Err(AutoRegError::Configuration(format!(
                    "variable '{var}' is not a column of the dataset"
                )));
            }
        }
        for effect in self.effects.iter().chain(&self.extra_effects) {
            if effect != "entity" && effect != "time" && !data.has_column(effect) {
                return Err(AutoRegError::Configuration(format!(
                    "effect '{effect}' is neither an index level nor a dataset column"
                )));
            }
        }
        Ok(())
    }

    fn base_spec(&self) -> RegressionSpec {
        RegressionSpec {
            dependent_vars: self.dependent_vars.clone(),
            dependent_var_description: self.dependent_var_description.clone(),
            independent_vars: self.independent_vars.clone(),
            independent_var_description: self.independent_var_description.clone(),
            control_vars: self.control_vars.clone(),
            control_vars_description: self.control_vars_description.clone(),
            effects: self.effects.clone(),
            constant: self.constant,
            ..RegressionSpec::default()
        }
    }

    /// Expand into `(description, spec)` pairs in battery order: basic,
    /// robustness (replacement x, replacement y, alternative effects, extra
    /// controls), 2SLS per instrument, mediating effect per mediator,
    /// heterogeneity per group variable.
    pub fn generate_specs(&self) -> Vec<(String, RegressionSpec)> {
        let mut specs: Vec<(String, RegressionSpec)> = Vec::new();

        let mut basic = self.base_spec();
        basic.regression_type = format!(
            "basic regression, the dependent variable is: {:?}. The independent variable is: {:?}",
            self.dependent_vars, self.independent_vars
        );
        basic.run_without_controls = self.run_another_regression_without_controls;
        let basic_description = if self.run_another_regression_without_controls {
            "Two basic regressions, with and without controls".to_string()
        } else {
            "One basic regression".to_string()
        };
        specs.push((basic_description, basic));

        for (i, x_var) in self.replacement_x_vars.iter().enumerate() {
            let mut spec = self.base_spec();
            spec.regression_type = "robustness".to_string();
            spec.independent_vars = vec![x_var.clone()];
            spec.independent_var_description = self
                .replacement_x_vars_description
                .get(i)
                .cloned()
                .into_iter()
                .collect();
            specs.push((
                format!(
                    "robustness test - alternative independent variable: {x_var} to replace the independent variable {}",
                    self.independent_vars[0]
                ),
                spec,
            ));
        }

        for (i, y_var) in self.replacement_y_vars.iter().enumerate() {
            let mut spec = self.base_spec();
            spec.regression_type = "robustness".to_string();
            spec.dependent_vars = vec![y_var.clone()];
            spec.dependent_var_description = self
                .replacement_y_vars_description
                .get(i)
                .cloned()
                .into_iter()
                .collect();
            specs.push((
                format!(
                    "robustness test - alternative dependent variable: {y_var} to replace the dependent variable {}",
                    self.dependent_vars[0]
                ),
                spec,
            ));
        }

        if !self.extra_effects.is_empty() {
            let mut spec = self.base_spec();
            spec.regression_type = "robustness".to_string();
            spec.effects = self.extra_effects.clone();
            specs.push((
                format!(
                    "robustness test - alternative fixed effects: {:?} to replace the fixed effects {:?}",
                    self.extra_effects, self.effects
                ),
                spec,
            ));
        }

        if !self.extra_control_vars.is_empty() {
            let mut spec = self.base_spec();
            spec.regression_type = "robustness".to_string();
            spec.control_vars.extend(self.extra_control_vars.iter().cloned());
            spec.control_vars_description
                .extend(self.extra_control_vars_description.iter().cloned());
            specs.push((
                format!(
                    "robustness test - adding extra control variables: {:?}",
                    self.extra_control_vars
                ),
                spec,
            ));
        }

        for (i, instrument) in self.instrument_vars.iter().enumerate() {
            let mut spec = self.base_spec();
            spec.regression_type = "endogeneity".to_string();
            spec.instrument_var = Some(instrument.clone());
            spec.instrument_var_description =
                self.instrument_vars_description.get(i).cloned();
            specs.push((
                format!(
                    "2SLS endogeneity test - instrument variable: {instrument}. The explanatory variable is: {}. The explained variable is: {}",
                    self.independent_vars[0], self.dependent_vars[0]
                ),
                spec,
            ));
        }

        for (i, mediator) in self.mediating_vars.iter().enumerate() {
            let mut spec = self.base_spec();
            spec.regression_type = "mediating_effect".to_string();
            spec.dependent_vars = vec![mediator.clone()];
            spec.dependent_var_description = self
                .mediating_vars_description
                .get(i)
                .cloned()
                .into_iter()
                .collect();
            specs.push((
                format!(
                    "mediating effect test between the independent variable {} and the mediating variable {mediator}",
                    self.independent_vars[0]
                ),
                spec,
            ));
        }

        for (i, group_var) in self.group_vars.iter().enumerate() {
            let mut spec = self.base_spec();
            spec.regression_type = "heterogeneity".to_string();
            spec.group_var = Some(group_var.clone());
            spec.group_var_description = self.group_vars_description.get(i).cloned();
            specs.push((
                format!("heterogeneity test by group variable: {group_var}"),
                spec,
            ));
        }

        specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config() -> ResearchConfig {
        ResearchConfig {
            research_topic: "extreme weather and abnormal stock returns".to_string(),
            dependent_vars: vec!["stock_revenue".to_string()],
            independent_vars: vec!["extreme_temperature".to_string()],
            control_vars: vec!["size".to_string()],
            instrument_vars: vec!["latitude".to_string()],
            group_vars: vec!["soe".to_string()],
            mediating_vars: vec!["energy_cost".to_string()],
            replacement_x_vars: vec!["rain_days".to_string()],
            effects: vec!["entity".to_string(), "time".to_string()],
            constant: true,
            run_another_regression_without_controls: true,
            ..ResearchConfig::default()
        }
    }

    fn dataset_with(columns: &[&str]) -> PanelData {
        let cols: BTreeMap<String, Vec<f64>> = columns
            .iter()
            .map(|name| (name.to_string(), vec![0.0, 1.0]))
            .collect();
        PanelData::new(vec![1, 2], vec![1, 1], cols).expect("panel")
    }

    #[test]
    fn expands_the_full_battery_in_order() {
        let specs = config().generate_specs();
        let descriptions: Vec<&str> = specs.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(descriptions.len(), 5);
        assert!(descriptions[0].contains("basic"));
        assert!(descriptions[1].contains("alternative independent variable"));
        assert!(descriptions[2].contains("2SLS"));
        assert!(descriptions[3].contains("mediating effect"));
        assert!(descriptions[4].contains("heterogeneity"));
    }

    #[test]
    fn instrument_spec_carries_the_instrument() {
        let specs = config().generate_specs();
        let (_, spec) = specs
            .iter()
            .find(|(d, _)| d.contains("2SLS"))
            .expect("2SLS spec");
        assert_eq!(spec.instrument_var.as_deref(), Some("latitude"));
        assert!(spec.group_var.is_none());
    }

    #[test]
    fn mediating_spec_replaces_the_dependent() {
        let specs = config().generate_specs();
        let (_, spec) = specs
            .iter()
            .find(|(d, _)| d.contains("mediating"))
            .expect("mediating spec");
        assert_eq!(spec.dependent_vars, vec!["energy_cost"]);
    }

    #[test]
    fn validate_accepts_complete_dataset() {
        let data = dataset_with(&[
            "stock_revenue",
            "extreme_temperature",
            "size",
            "latitude",
            "soe",
            "energy_cost",
            "rain_days",
        ]);
        config().validate_columns(&data).expect("valid");
    }

    #[test]
    fn validate_names_the_missing_variable() {
        let data = dataset_with(&["stock_revenue", "extreme_temperature"]);
        let err = config().validate_columns(&data).expect_err("missing");
        assert!(err.to_string().contains("'size'"));
    }

    #[test]
    fn validate_rejects_missing_core_variables() {
        let data = dataset_with(&["y"]);
        let err = ResearchConfig::default()
            .validate_columns(&data)
            .expect_err("incomplete");
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn display_skips_empty_fields() {
        let spec = RegressionSpec {
            regression_type: "robustness".to_string(),
            dependent_vars: vec!["y".to_string()],
            independent_vars: vec!["x".to_string()],
            constant: true,
            ..RegressionSpec::default()
        };
        let text = spec.to_string();
        assert!(text.contains("dependent_vars: y"));
        assert!(!text.contains("control_vars"));
        assert!(!text.contains("group_var"));
    }

    #[test]
    fn display_leads_with_the_regression_type() {
        let spec = RegressionSpec {
            regression_type: "endogeneity".to_string(),
            dependent_vars: vec!["y".to_string()],
            independent_vars: vec!["x".to_string()],
            instrument_var: Some("z".to_string()),
            constant: true,
            ..RegressionSpec::default()
        };
        let text = spec.to_string();
        assert!(text.starts_with("regression_type: endogeneity\n"));
        assert!(text.contains("instrument_var: z"));
        assert!(text.ends_with("constant: true"));
    }
}
