//! Plain-text tables for command output.

use crate::orchestrator::{InstallReport, Outcome};

/// Render rows under a header as left-aligned columns.
pub fn format_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    push_row(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let last = widths.len().saturating_sub(1);
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        if i == last {
            out.push_str(cell);
        } else {
            let pad = w - cell.chars().count().min(*w);
            out.push_str(cell);
            out.push_str(&" ".repeat(pad + 2));
        }
    }
    out.push('\n');
}

/// Format an install report: one row per module, then the failure details.
pub fn format_report(report: &InstallReport) -> String {
    let rows: Vec<Vec<String>> = report
        .modules
        .iter()
        .map(|m| {
            let status = match &m.outcome {
                Outcome::Installed => "Installed".to_string(),
                Outcome::Locked => "Locked".to_string(),
                Outcome::Failed { stage, .. } => format!("Failed ({stage})"),
            };
            vec![
                m.module.clone(),
                m.declared.clone(),
                m.resolved.clone().unwrap_or_else(|| "-".to_string()),
                status,
            ]
        })
        .collect();
    let mut out = format_table(&["Module", "Version", "Resolved", "Status"], &rows);

    let failures: Vec<_> = report
        .modules
        .iter()
        .filter_map(|m| match &m.outcome {
            Outcome::Failed { detail, .. } => Some((m.module.as_str(), detail.as_str())),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        out.push('\n');
        for (module, detail) in failures {
            out.push_str(&format!("  {module}: {detail}\n"));
        }
    }
    out.push_str(&format!(
        "\n{} installed, {} failed ({} scope)\n",
        report.modules.len() - report.failures(),
        report.failures(),
        report.scope
    ));
    out
}
