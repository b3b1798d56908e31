//! Within-estimator panel OLS with cluster-robust standard errors.
//!
//! Fixed effects are absorbed by demeaning rather than dummy expansion: one
//! exact pass for a single effect dimension, alternating projection sweeps
//! for two or more. Standard errors are Liang-Zeger cluster-robust with
//! entity clusters.

use std::collections::HashMap;
use std::fmt;

use anyhow::{Context, Result, anyhow};
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::regress::panel::PanelData;

/// Convergence tolerance for multi-way demeaning sweeps.
const DEMEAN_TOL: f64 = 1e-10;
/// Safety bound on demeaning sweeps.
const DEMEAN_MAX_SWEEPS: usize = 1000;

/// Which fixed effects to absorb.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectSpec {
    pub entity: bool,
    pub time: bool,
    /// Categorical column absorbed as an additional effect dimension.
    pub other: Option<String>,
}

impl EffectSpec {
    /// Interpret an effects list the way the research config writes it:
    /// the literals `"entity"` / `"time"` name the index levels, anything
    /// else names a categorical column.
    pub fn from_names(effects: &[String]) -> Self {
        let mut spec = Self::default();
        for effect in effects {
            match effect.as_str() {
                "entity" => spec.entity = true,
                "time" => spec.time = true,
                other => spec.other = Some(other.to_string()),
            }
        }
        spec
    }

    fn is_empty(&self) -> bool {
        !self.entity && !self.time && self.other.is_none()
    }
}

/// Output of one fitted regression.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Regressor names, aligned with the coefficient vectors.
    pub var_names: Vec<String>,
    pub coefficients: Vec<f64>,
    /// Entity-clustered standard errors.
    pub std_errors: Vec<f64>,
    pub t_stats: Vec<f64>,
    pub p_values: Vec<f64>,
    /// Within R-squared.
    pub r_squared: f64,
    /// Fitted values on the original scale (y minus within residual).
    pub fitted: Vec<f64>,
    pub n_obs: usize,
    pub n_entities: usize,
}

impl fmt::Display for FitResult {
    /// Deterministic text summary fed to rendering prompts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Observations: {}", self.n_obs)?;
        writeln!(f, "Entities: {}", self.n_entities)?;
        writeln!(f, "R-squared (within): {:.4}", self.r_squared)?;
        writeln!(f, "{:<24} {:>10} {:>10} {:>8} {:>8}", "Variable", "Coef", "StdErr", "t", "p")?;
        for (i, name) in self.var_names.iter().enumerate() {
            writeln!(
                f,
                "{:<24} {:>10.4} {:>10.4} {:>8.3} {:>8.3}",
                name, self.coefficients[i], self.std_errors[i], self.t_stats[i], self.p_values[i]
            )?;
        }
        Ok(())
    }
}

/// Fit dependent on `exog` columns with the requested fixed effects and
/// entity-clustered standard errors.
///
/// With any fixed effect the constant is absorbed by demeaning; without
/// effects and with `constant`, an intercept column is appended.
pub fn fit_within(
    data: &PanelData,
    dependent: &str,
    exog: &[String],
    effects: &EffectSpec,
    constant: bool,
) -> Result<FitResult> {
    let n = data.n_rows();
    if n == 0 {
        return Err(anyhow!("cannot fit on an empty dataset"));
    }
    if exog.is_empty() {
        return Err(anyhow!("no exogenous variables for dependent '{dependent}'"));
    }

    let y_raw = data
        .column(dependent)
        .with_context(|| format!("dependent variable '{dependent}'"))?;

    let mut var_names: Vec<String> = exog.to_vec();
    let add_intercept = constant && effects.is_empty();
    if add_intercept {
        var_names.push("const".to_string());
    }
    let p = var_names.len();

    let mut x_raw = vec![0.0_f64; n * p];
    for (j, name) in exog.iter().enumerate() {
        let column = data
            .column(name)
            .with_context(|| format!("exogenous variable '{name}'"))?;
        for i in 0..n {
            x_raw[i * p + j] = column[i];
        }
    }
    if add_intercept {
        for i in 0..n {
            x_raw[i * p + (p - 1)] = 1.0;
        }
    }

    let groups = effect_groups(data, effects)?;
    let mut y_dm = y_raw.to_vec();
    let mut x_dm = x_raw.clone();
    demean(&mut y_dm, &mut x_dm, p, &groups);

    let x_mat = DMatrix::from_row_slice(n, p, &x_dm);
    let y_vec = DVector::from_column_slice(&y_dm);

    let xtx = x_mat.transpose() * &x_mat;
    let xty = x_mat.transpose() * &y_vec;
    let xtx_inv = xtx
        .try_inverse()
        .ok_or_else(|| anyhow!("design matrix is rank deficient after demeaning"))?;

    let beta = &xtx_inv * &xty;
    let coefficients: Vec<f64> = beta.iter().copied().collect();

    let resid = &y_vec - &x_mat * &beta;
    let rss: f64 = resid.iter().map(|r| r * r).sum();
    let tss: f64 = y_dm.iter().map(|v| v * v).sum();
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };

    let fitted: Vec<f64> = (0..n).map(|i| y_raw[i] - resid[i]).collect();

    let std_errors = cluster_robust_se(&x_mat, &resid, &xtx_inv, data.entity_ids())?;
    let t_stats: Vec<f64> = coefficients
        .iter()
        .zip(&std_errors)
        .map(|(&b, &se)| if se > 0.0 { b / se } else { f64::NAN })
        .collect();

    let absorbed = absorbed_levels(&groups);
    let dof = n as f64 - p as f64 - absorbed as f64;
    let p_values = p_values_from_t(&t_stats, dof)?;

    Ok(FitResult {
        var_names,
        coefficients,
        std_errors,
        t_stats,
        p_values,
        r_squared,
        fitted,
        n_obs: n,
        n_entities: data.n_entities(),
    })
}

/// Group index vectors for every active effect dimension.
fn effect_groups(data: &PanelData, effects: &EffectSpec) -> Result<Vec<Vec<usize>>> {
    let mut groups = Vec::new();
    if effects.entity {
        groups.push(intern(data.entity_ids().iter().copied()));
    }
    if effects.time {
        groups.push(intern(data.time_ids().iter().copied()));
    }
    if let Some(name) = &effects.other {
        let column = data
            .column(name)
            .with_context(|| format!("effect variable '{name}'"))?;
        groups.push(intern(column.iter().map(|v| v.to_bits())));
    }
    Ok(groups)
}

fn intern<I: Iterator<Item = u64>>(keys: I) -> Vec<usize> {
    let mut mapping: HashMap<u64, usize> = HashMap::new();
    keys.map(|key| {
        let next = mapping.len();
        *mapping.entry(key).or_insert(next)
    })
    .collect()
}

/// Demean y and X in place over the given group dimensions.
///
/// One dimension needs a single exact pass; for two or more the sweeps
/// alternate until the largest absolute group mean falls below tolerance.
fn demean(y: &mut [f64], x: &mut [f64], p: usize, groups: &[Vec<usize>]) {
    if groups.is_empty() {
        return;
    }
    let sweeps = if groups.len() == 1 { 1 } else { DEMEAN_MAX_SWEEPS };
    for _ in 0..sweeps {
        let mut max_mean = 0.0_f64;
        for group_of in groups {
            max_mean = max_mean.max(demean_one(y, 1, group_of));
            max_mean = max_mean.max(demean_one(x, p, group_of));
        }
        if max_mean < DEMEAN_TOL {
            break;
        }
    }
}

/// Subtract group means from a row-major (n, width) buffer; returns the
/// largest absolute mean subtracted.
fn demean_one(values: &mut [f64], width: usize, group_of: &[usize]) -> f64 {
    let n_groups = group_of.iter().copied().max().map_or(0, |g| g + 1);
    let mut sums = vec![0.0_f64; n_groups * width];
    let mut counts = vec![0usize; n_groups];
    for (i, &g) in group_of.iter().enumerate() {
        counts[g] += 1;
        for j in 0..width {
            sums[g * width + j] += values[i * width + j];
        }
    }
    let mut max_mean = 0.0_f64;
    for g in 0..n_groups {
        if counts[g] == 0 {
            continue;
        }
        for j in 0..width {
            let mean = sums[g * width + j] / counts[g] as f64;
            sums[g * width + j] = mean;
            max_mean = max_mean.max(mean.abs());
        }
    }
    for (i, &g) in group_of.iter().enumerate() {
        for j in 0..width {
            values[i * width + j] -= sums[g * width + j];
        }
    }
    max_mean
}

/// Total absorbed parameters across effect dimensions. Each extra dimension
/// shares the grand mean, hence the `dims - 1` discount.
fn absorbed_levels(groups: &[Vec<usize>]) -> usize {
    if groups.is_empty() {
        return 0;
    }
    let levels: usize = groups
        .iter()
        .map(|g| g.iter().copied().max().map_or(0, |m| m + 1))
        .sum();
    levels - (groups.len() - 1)
}

/// Liang-Zeger cluster-robust (sandwich) standard errors.
///
/// `V = (X'X)^-1 B (X'X)^-1` with `B = sum_g X_g' e_g e_g' X_g`, scaled by
/// the usual small-sample correction `G/(G-1) * (N-1)/(N-K)`.
fn cluster_robust_se(
    x: &DMatrix<f64>,
    residuals: &DVector<f64>,
    xtx_inv: &DMatrix<f64>,
    cluster_ids: &[u64],
) -> Result<Vec<f64>> {
    let n = x.nrows();
    let p = x.ncols();
    if cluster_ids.len() != n {
        return Err(anyhow!(
            "cluster index length {} != observation count {}",
            cluster_ids.len(),
            n
        ));
    }

    let mut cluster_map: HashMap<u64, Vec<usize>> = HashMap::new();
    for (i, &cid) in cluster_ids.iter().enumerate() {
        cluster_map.entry(cid).or_default().push(i);
    }
    let g = cluster_map.len() as f64;

    let mut meat = DMatrix::zeros(p, p);
    for indices in cluster_map.values() {
        let mut score = vec![0.0_f64; p];
        for &i in indices {
            let e_i = residuals[i];
            for j in 0..p {
                score[j] += x[(i, j)] * e_i;
            }
        }
        for a in 0..p {
            for b in 0..p {
                meat[(a, b)] += score[a] * score[b];
            }
        }
    }

    let n_f = n as f64;
    let p_f = p as f64;
    let correction = if g > 1.0 && n_f > p_f {
        (g / (g - 1.0)) * ((n_f - 1.0) / (n_f - p_f))
    } else {
        1.0
    };

    let vcr = (xtx_inv * &meat) * xtx_inv * correction;
    Ok((0..p).map(|j| vcr[(j, j)].max(0.0).sqrt()).collect())
}

fn p_values_from_t(t_stats: &[f64], dof: f64) -> Result<Vec<f64>> {
    if dof <= 0.0 {
        // Too few residual degrees of freedom for inference.
        return Ok(vec![f64::NAN; t_stats.len()]);
    }
    let dist = StudentsT::new(0.0, 1.0, dof)
        .map_err(|e| anyhow!("student-t with {dof} degrees of freedom: {e}"))?;
    Ok(t_stats
        .iter()
        .map(|&t| {
            if t.is_finite() {
                2.0 * (1.0 - dist.cdf(t.abs()))
            } else {
                f64::NAN
            }
        })
        .collect())
}
