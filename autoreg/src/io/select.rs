//! Table selection: which designed tables make it into the report.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};

use crate::core::design::TableDesign;

/// Parse a 1-based comma-separated selection such as `"1,3,4"` into
/// zero-based positions. Whitespace around entries is tolerated; duplicates
/// and zero are not.
pub fn parse_selection(input: &str) -> Result<Vec<usize>> {
    let mut positions = Vec::new();
    for entry in input.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let number: usize = entry
            .parse()
            .with_context(|| format!("'{entry}' is not a table number"))?;
        if number == 0 {
            bail!("table numbers start at 1");
        }
        let position = number - 1;
        if positions.contains(&position) {
            bail!("table {number} selected twice");
        }
        positions.push(position);
    }
    if positions.is_empty() {
        bail!("no tables selected");
    }
    Ok(positions)
}

/// Print the designed tables and read a selection from `input`.
///
/// An empty line keeps every table.
pub fn prompt_selection<R: BufRead, W: Write>(
    design: &TableDesign,
    mut input: R,
    mut output: W,
) -> Result<Vec<usize>> {
    writeln!(output, "Designed tables:")?;
    for (position, indices) in design.table_index.iter().enumerate() {
        let title = design
            .table_title
            .get(position)
            .map_or("(untitled)", String::as_str);
        writeln!(
            output,
            "  {}. {title} (results {indices:?})",
            position + 1
        )?;
    }
    write!(output, "Tables to keep (e.g. 1,3), empty for all: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line).context("read selection")?;
    if line.trim().is_empty() {
        return Ok((0..design.table_index.len()).collect());
    }
    parse_selection(&line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design(n: usize) -> TableDesign {
        TableDesign {
            number_of_tables: n,
            table_index: (0..n).map(|i| vec![i]).collect(),
            table_regression_nums: vec![1; n],
            table_title: (0..n).map(|i| format!("Table {i}")).collect(),
        }
    }

    #[test]
    fn parses_one_based_numbers_to_zero_based_positions() {
        assert_eq!(parse_selection("1, 3,4").expect("parse"), vec![0, 2, 3]);
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!(parse_selection("0").is_err());
        assert!(parse_selection("one").is_err());
        assert!(parse_selection("").is_err());
    }

    #[test]
    fn rejects_duplicates() {
        let err = parse_selection("2,2").expect_err("duplicate");
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn empty_prompt_line_keeps_everything() {
        let mut shown = Vec::new();
        let picked = prompt_selection(&design(3), "\n".as_bytes(), &mut shown)
            .expect("prompt");
        assert_eq!(picked, vec![0, 1, 2]);
        let text = String::from_utf8(shown).expect("utf8");
        assert!(text.contains("1. Table 0"));
    }

    #[test]
    fn prompt_line_is_parsed() {
        let picked = prompt_selection(&design(3), "2,1\n".as_bytes(), &mut Vec::new())
            .expect("prompt");
        assert_eq!(picked, vec![1, 0]);
    }
}
