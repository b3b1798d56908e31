//! Report document assembly and emission.
//!
//! The LaTeX source is always written; PDF and Word conversion shell out to
//! `xelatex` and `pandoc` and degrade to a per-format failure outcome when
//! the converter is missing, fails, or times out. One broken converter never
//! takes down the run or the other formats.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::tables::ResultTables;
use crate::io::process::run_command_with_timeout;

/// Document formats the pipeline can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Latex,
    Word,
    Pdf,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Latex => "latex",
            Self::Word => "word",
            Self::Pdf => "pdf",
        };
        f.write_str(name)
    }
}

/// Result of emitting one format.
#[derive(Debug)]
pub enum FormatOutcome {
    Written { format: OutputFormat, path: PathBuf },
    Failed { format: OutputFormat, reason: String },
}

impl FormatOutcome {
    pub fn format(&self) -> OutputFormat {
        match self {
            Self::Written { format, .. } | Self::Failed { format, .. } => *format,
        }
    }
}

/// Assemble the standalone LaTeX report.
///
/// Tables and analyses are model-produced LaTeX and are embedded as-is apart
/// from bare-`%` escaping; section headings are plain text and get full
/// special-character escaping. Empty placeholder slots are skipped.
pub fn assemble_document(title: &str, tables: &ResultTables) -> String {
    let mut doc = String::new();
    doc.push_str("\\documentclass[12pt]{article}\n");
    doc.push_str("\\usepackage{booktabs}\n");
    doc.push_str("\\usepackage[margin=2.5cm]{geometry}\n");
    doc.push_str("\\usepackage{xeCJK}\n");
    doc.push_str(&format!("\\title{{{}}}\n", latex_escape(title)));
    doc.push_str("\\date{}\n");
    doc.push_str("\\begin{document}\n\\maketitle\n");

    for (table, description, analysis) in tables.iter_triples() {
        if table.is_empty() && analysis.is_empty() {
            continue;
        }
        doc.push_str(&format!("\n\\section*{{{}}}\n", latex_escape(description)));
        if !table.is_empty() {
            doc.push_str(&escape_bare_percent(table));
            doc.push('\n');
        }
        if !analysis.is_empty() {
            doc.push_str(&escape_bare_percent(analysis));
            doc.push('\n');
        }
    }

    doc.push_str("\n\\end{document}\n");
    doc
}

/// Escape LaTeX special characters in plain text.
pub fn latex_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\textbackslash{}"),
            '%' => escaped.push_str("\\%"),
            '&' => escaped.push_str("\\&"),
            '#' => escaped.push_str("\\#"),
            '_' => escaped.push_str("\\_"),
            '$' => escaped.push_str("\\$"),
            '{' => escaped.push_str("\\{"),
            '}' => escaped.push_str("\\}"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape `%` signs that are not already escaped, leaving the rest of the
/// LaTeX untouched. Model output says "5%" often enough that an unescaped
/// percent would silently comment out the rest of the line.
pub fn escape_bare_percent(latex: &str) -> String {
    let mut escaped = String::with_capacity(latex.len());
    let mut prev_backslash = false;
    for c in latex.chars() {
        if c == '%' && !prev_backslash {
            escaped.push_str("\\%");
        } else {
            escaped.push(c);
        }
        prev_backslash = c == '\\' && !prev_backslash;
    }
    escaped
}

/// Write the LaTeX source and convert it into each requested format.
///
/// The `.tex` file is always written (the converters need it); failure to
/// write it is fatal. Everything after that is per-format best effort.
pub fn emit_documents(
    out_dir: &Path,
    stem: &str,
    latex: &str,
    formats: &[OutputFormat],
    convert_timeout: Duration,
) -> Result<Vec<FormatOutcome>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("create output directory {}", out_dir.display()))?;
    let tex_path = out_dir.join(format!("{stem}.tex"));
    fs::write(&tex_path, latex).with_context(|| format!("write {}", tex_path.display()))?;
    info!(path = %tex_path.display(), "wrote LaTeX source");

    let mut outcomes = Vec::with_capacity(formats.len());
    for &format in formats {
        let outcome = match format {
            OutputFormat::Latex => FormatOutcome::Written {
                format,
                path: tex_path.clone(),
            },
            OutputFormat::Pdf => {
                // xelatex derives the output name from the .tex stem itself.
                convert(format, out_dir, stem, "pdf", convert_timeout, |_out| {
                    let mut cmd = Command::new("xelatex");
                    cmd.arg("-interaction=nonstopmode")
                        .arg("-halt-on-error")
                        .arg("-output-directory")
                        .arg(out_dir)
                        .arg(&tex_path);
                    cmd
                })
            }
            OutputFormat::Word => {
                convert(format, out_dir, stem, "docx", convert_timeout, |out| {
                    let mut cmd = Command::new("pandoc");
                    cmd.arg(&tex_path).arg("-o").arg(out);
                    cmd
                })
            }
        };
        if let FormatOutcome::Failed { format, reason } = &outcome {
            warn!(%format, reason, "format emission failed");
        }
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

fn convert(
    format: OutputFormat,
    out_dir: &Path,
    stem: &str,
    extension: &str,
    timeout: Duration,
    build: impl FnOnce(&Path) -> Command,
) -> FormatOutcome {
    let out_path = out_dir.join(format!("{stem}.{extension}"));
    let cmd = build(&out_path);
    match run_command_with_timeout(cmd, timeout) {
        Ok(output) if output.success() && out_path.exists() => FormatOutcome::Written {
            format,
            path: out_path,
        },
        Ok(output) if output.timed_out => FormatOutcome::Failed {
            format,
            reason: format!("converter timed out after {}s", timeout.as_secs()),
        },
        Ok(output) => FormatOutcome::Failed {
            format,
            reason: format!(
                "converter exited with {:?}: {}",
                output.status.code(),
                output.stderr_tail(500)
            ),
        },
        Err(error) => FormatOutcome::Failed {
            format,
            reason: format!("{error:#}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> ResultTables {
        ResultTables::new(
            vec!["\\begin{tabular}{lc}x & 1\\\\\\end{tabular}".to_string(), String::new()],
            vec!["Baseline results".to_string(), "Unused_group".to_string()],
            vec!["Significant at the 5% level.".to_string(), String::new()],
        )
        .expect("consistent")
    }

    #[test]
    fn document_wraps_sections_and_skips_empty_slots() {
        let doc = assemble_document("Weather and returns", &tables());
        assert!(doc.starts_with("\\documentclass"));
        assert!(doc.contains("\\section*{Baseline results}"));
        assert!(!doc.contains("Unused"));
        assert!(doc.contains("\\end{document}"));
    }

    #[test]
    fn analyses_get_bare_percent_escaped() {
        let doc = assemble_document("t", &tables());
        assert!(doc.contains("5\\% level"));
    }

    #[test]
    fn latex_escape_covers_specials() {
        assert_eq!(latex_escape("a_b & 10%"), "a\\_b \\& 10\\%");
    }

    #[test]
    fn escape_bare_percent_leaves_escaped_ones_alone() {
        assert_eq!(escape_bare_percent("5\\% and 10%"), "5\\% and 10\\%");
        assert_eq!(escape_bare_percent("line\\\\%comment"), "line\\\\\\%comment");
    }

    #[test]
    fn emit_always_writes_the_tex_source() {
        let temp = tempfile::tempdir().expect("tempdir");
        let outcomes = emit_documents(
            temp.path(),
            "report",
            "\\documentclass{article}\\begin{document}x\\end{document}",
            &[OutputFormat::Latex],
            Duration::from_secs(5),
        )
        .expect("emit");
        assert!(temp.path().join("report.tex").exists());
        assert!(matches!(outcomes[0], FormatOutcome::Written { .. }));
    }

    #[test]
    fn failing_converter_degrades_to_failed_outcome() {
        let temp = tempfile::tempdir().expect("tempdir");
        let outcome = convert(
            OutputFormat::Word,
            temp.path(),
            "report",
            "docx",
            Duration::from_secs(5),
            |_out| {
                let mut cmd = Command::new("sh");
                cmd.args(["-c", "echo broken >&2; exit 1"]);
                cmd
            },
        );
        match outcome {
            FormatOutcome::Failed { format, reason } => {
                assert_eq!(format, OutputFormat::Word);
                assert!(reason.contains("broken"));
            }
            FormatOutcome::Written { .. } => panic!("conversion should fail"),
        }
    }

    #[test]
    fn missing_converter_binary_degrades_to_failed_outcome() {
        let temp = tempfile::tempdir().expect("tempdir");
        let outcome = convert(
            OutputFormat::Pdf,
            temp.path(),
            "report",
            "pdf",
            Duration::from_secs(1),
            |_out| Command::new("definitely-not-a-real-converter"),
        );
        assert!(matches!(outcome, FormatOutcome::Failed { .. }));
    }
}
