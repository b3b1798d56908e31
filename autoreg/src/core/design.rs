//! Table design validation and selection.
//!
//! A [`TableDesign`] is the model-proposed partition of regression result
//! indices into output tables. It is only trusted after [`validate_design`]
//! certifies it is an exact cover: every result index used exactly once,
//! at most two indices per table, declared table count matching the
//! partition length.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Model-proposed grouping of regression results into output tables.
///
/// The three trailing vectors are parallel: entry `g` of each describes
/// table `g`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDesign {
    /// Declared number of output tables.
    pub number_of_tables: usize,
    /// Result indices grouped per table, at most two per group.
    pub table_index: Vec<Vec<usize>>,
    /// Regression column count the model expects per table.
    #[serde(default)]
    pub table_regression_nums: Vec<u32>,
    /// Title per table.
    #[serde(default)]
    pub table_title: Vec<String>,
}

/// Reason a proposed design was rejected.
///
/// Any single violation invalidates the whole design; there is no partial
/// acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DesignViolation {
    #[error("table {group} groups {size} results; at most 2 are allowed")]
    GroupTooLarge { group: usize, size: usize },
    #[error("index {index} outside range 0..{limit}")]
    IndexOutOfRange { index: usize, limit: usize },
    #[error("index {index} appears in more than one table")]
    DuplicateIndex { index: usize },
    #[error("only {used} of {expected} regression results are used")]
    IncompleteCover { used: usize, expected: usize },
    #[error("declared {declared} tables but table_index has {actual} groups")]
    TableCountMismatch { declared: usize, actual: usize },
}

/// Position error from [`select_first`] / [`select_positions`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("selection position {position} outside range 0..{len}")]
pub struct SelectionError {
    pub position: usize,
    pub len: usize,
}

/// Check that `design` is a valid exact cover of `0..number_of_results`.
///
/// Walks groups in order, failing on the first violation. Grouping order and
/// within-group order are preserved verbatim; nothing is reordered or
/// deduplicated on the caller's behalf.
pub fn validate_design(
    design: &TableDesign,
    number_of_results: usize,
) -> Result<(), DesignViolation> {
    let mut seen: BTreeSet<usize> = BTreeSet::new();

    for (group, indices) in design.table_index.iter().enumerate() {
        if indices.len() > 2 {
            return Err(DesignViolation::GroupTooLarge {
                group,
                size: indices.len(),
            });
        }
        for &index in indices {
            if index >= number_of_results {
                return Err(DesignViolation::IndexOutOfRange {
                    index,
                    limit: number_of_results,
                });
            }
            if !seen.insert(index) {
                return Err(DesignViolation::DuplicateIndex { index });
            }
        }
    }

    if seen.len() != number_of_results {
        return Err(DesignViolation::IncompleteCover {
            used: seen.len(),
            expected: number_of_results,
        });
    }
    if design.number_of_tables != design.table_index.len() {
        return Err(DesignViolation::TableCountMismatch {
            declared: design.number_of_tables,
            actual: design.table_index.len(),
        });
    }
    Ok(())
}

/// Set of result indices the design references.
///
/// Selection may legitimately drop groups, so a design can reference fewer
/// indices than exist; absent indices get empty placeholder artifacts
/// downstream, never errors.
pub fn used_indices(design: &TableDesign) -> BTreeSet<usize> {
    design
        .table_index
        .iter()
        .flat_map(|group| group.iter().copied())
        .collect()
}

/// Keep the first `k` table groups, dropping the rest.
///
/// `table_regression_nums` and `table_title` may arrive shorter than
/// `table_index` (the model is free to omit them), so they are clipped to
/// whatever they hold; callers index them with `get`, not by group.
pub fn select_first(design: &TableDesign, k: usize) -> Result<TableDesign, SelectionError> {
    if k > design.table_index.len() {
        return Err(SelectionError {
            position: k,
            len: design.table_index.len(),
        });
    }
    Ok(TableDesign {
        number_of_tables: k,
        table_index: design.table_index[..k].to_vec(),
        table_regression_nums: clip(&design.table_regression_nums, k),
        table_title: clip(&design.table_title, k),
    })
}

/// Keep the table groups at `positions`, in the given order.
///
/// Positions are checked against `table_index` only; entries missing from
/// the shorter trailing vectors are dropped rather than invented.
pub fn select_positions(
    design: &TableDesign,
    positions: &[usize],
) -> Result<TableDesign, SelectionError> {
    let len = design.table_index.len();
    for &position in positions {
        if position >= len {
            return Err(SelectionError { position, len });
        }
    }
    Ok(TableDesign {
        number_of_tables: positions.len(),
        table_index: positions
            .iter()
            .map(|&p| design.table_index[p].clone())
            .collect(),
        table_regression_nums: gather(&design.table_regression_nums, positions),
        table_title: gather(&design.table_title, positions),
    })
}

fn clip<T: Clone>(items: &[T], k: usize) -> Vec<T> {
    items.iter().take(k).cloned().collect()
}

fn gather<T: Clone>(items: &[T], positions: &[usize]) -> Vec<T> {
    positions
        .iter()
        .filter_map(|&p| items.get(p).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design(number_of_tables: usize, table_index: Vec<Vec<usize>>) -> TableDesign {
        let titles = (0..table_index.len())
            .map(|g| format!("Table {g}"))
            .collect();
        let nums = table_index.iter().map(|g| g.len() as u32).collect();
        TableDesign {
            number_of_tables,
            table_index,
            table_regression_nums: nums,
            table_title: titles,
        }
    }

    #[test]
    fn accepts_exact_cover_of_pairs() {
        let d = design(2, vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(validate_design(&d, 4), Ok(()));
    }

    #[test]
    fn accepts_empty_design_for_zero_results() {
        let d = design(0, vec![]);
        assert_eq!(validate_design(&d, 0), Ok(()));
    }

    #[test]
    fn rejects_index_out_of_range() {
        let d = design(3, vec![vec![0, 1], vec![2, 3], vec![4, 5]]);
        assert_eq!(
            validate_design(&d, 4),
            Err(DesignViolation::IndexOutOfRange { index: 4, limit: 4 })
        );
    }

    #[test]
    fn accepts_when_range_covers_all_indices() {
        let d = design(3, vec![vec![0, 1], vec![2, 3], vec![4, 5]]);
        assert_eq!(validate_design(&d, 6), Ok(()));
    }

    #[test]
    fn rejects_duplicate_index() {
        let d = design(4, vec![vec![0, 1], vec![2, 1], vec![4, 5], vec![3]]);
        assert_eq!(
            validate_design(&d, 6),
            Err(DesignViolation::DuplicateIndex { index: 1 })
        );
    }

    #[test]
    fn rejects_group_larger_than_two() {
        let d = design(5, vec![vec![0], vec![5], vec![7], vec![8], vec![1, 2, 3, 4, 6]]);
        assert_eq!(
            validate_design(&d, 9),
            Err(DesignViolation::GroupTooLarge { group: 4, size: 5 })
        );
    }

    #[test]
    fn rejects_incomplete_cover() {
        let d = design(2, vec![vec![0, 1], vec![2]]);
        assert_eq!(
            validate_design(&d, 4),
            Err(DesignViolation::IncompleteCover { used: 3, expected: 4 })
        );
    }

    #[test]
    fn rejects_table_count_mismatch() {
        let d = design(
            5,
            vec![vec![0], vec![1, 2], vec![3, 4], vec![5], vec![6], vec![7, 8]],
        );
        assert_eq!(
            validate_design(&d, 9),
            Err(DesignViolation::TableCountMismatch {
                declared: 5,
                actual: 6
            })
        );
    }

    #[test]
    fn accepts_mixed_group_sizes() {
        let d = design(
            6,
            vec![vec![0], vec![1, 2], vec![3, 4], vec![5], vec![6], vec![7, 8]],
        );
        assert_eq!(validate_design(&d, 9), Ok(()));
    }

    #[test]
    fn used_indices_flattens_all_groups() {
        let d = design(2, vec![vec![2, 0], vec![3]]);
        let used = used_indices(&d);
        assert_eq!(used.into_iter().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn select_first_takes_prefix_of_all_parallel_vectors() {
        let d = design(3, vec![vec![0, 1], vec![2], vec![3]]);
        let kept = select_first(&d, 2).expect("select");
        assert_eq!(kept.number_of_tables, 2);
        assert_eq!(kept.table_index, vec![vec![0, 1], vec![2]]);
        assert_eq!(kept.table_regression_nums, vec![2, 1]);
        assert_eq!(kept.table_title.len(), 2);
    }

    #[test]
    fn select_first_rejects_k_beyond_design() {
        let d = design(2, vec![vec![0], vec![1]]);
        assert_eq!(
            select_first(&d, 3),
            Err(SelectionError { position: 3, len: 2 })
        );
    }

    #[test]
    fn select_positions_gathers_in_given_order() {
        let d = design(3, vec![vec![0, 1], vec![2], vec![3]]);
        let kept = select_positions(&d, &[2, 0]).expect("select");
        assert_eq!(kept.number_of_tables, 2);
        assert_eq!(kept.table_index, vec![vec![3], vec![0, 1]]);
        assert_eq!(kept.table_title, vec!["Table 2", "Table 0"]);
    }

    #[test]
    fn select_tolerates_omitted_trailing_vectors() {
        // The model may leave table_regression_nums/table_title empty; the
        // selected design keeps them empty instead of panicking or padding.
        let d = TableDesign {
            number_of_tables: 3,
            table_index: vec![vec![0], vec![1], vec![2]],
            table_regression_nums: Vec::new(),
            table_title: Vec::new(),
        };
        let first = select_first(&d, 2).expect("select");
        assert_eq!(first.table_index.len(), 2);
        assert!(first.table_regression_nums.is_empty());
        assert!(first.table_title.is_empty());

        let picked = select_positions(&d, &[2, 0]).expect("select");
        assert_eq!(picked.table_index, vec![vec![2], vec![0]]);
        assert!(picked.table_title.is_empty());
    }

    #[test]
    fn select_positions_rejects_out_of_range_position() {
        let d = design(2, vec![vec![0], vec![1]]);
        assert_eq!(
            select_positions(&d, &[0, 2]),
            Err(SelectionError { position: 2, len: 2 })
        );
    }
}
