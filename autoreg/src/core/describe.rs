//! Index headers for regression descriptions shown to the model.
//!
//! The design prompt identifies regressions by integer index, so each
//! description is prefixed with a header naming its index and sub-result
//! count. The header is produced at prompt-build time and never written back
//! into [`RegressionResult::description`](crate::regress::RegressionResult);
//! [`strip_index_header`] recovers the original text from any header-carrying
//! string (e.g. when a description is echoed back by the model).

/// Reserved line prefixes that mark header lines.
const RESERVED_PREFIXES: [&str; 2] = ["Index:", "Under Index"];

/// Prefix `description` with the index header the design prompt expects.
///
/// Not idempotent: applying it twice stacks two headers. Callers format from
/// the original description each time.
pub fn indexed_description(index: usize, regression_count: usize, description: &str) -> String {
    format!(
        "Index: {index}\n Under Index {index}, the number of regressions is: {regression_count}\n{description}\n "
    )
}

/// Drop the index header, returning the trimmed original description.
///
/// Scans for the first line that does not start with a reserved prefix and
/// keeps everything from there on. For any `description` whose own text does
/// not start with a reserved prefix,
/// `strip_index_header(&indexed_description(i, k, description)) == description.trim()`.
pub fn strip_index_header(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let start = lines
        .iter()
        .position(|line| {
            let trimmed = line.trim_start();
            !RESERVED_PREFIXES
                .iter()
                .any(|prefix| trimmed.starts_with(prefix))
        })
        .unwrap_or(lines.len());
    lines[start..].join("\n").trim().to_string()
}
