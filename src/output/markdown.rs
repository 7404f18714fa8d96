//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of crawl results,
//! including statistics, retry outcomes and the final error report.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::crawler::CrawlReport;
use crate::output::stats::CrawlStatistics;
use crate::output::OutputResult;
use crate::state::PageStatus;

/// Rows shown in the unresolved error table
const MAX_ERROR_ROWS: usize = 100;

/// Generates a markdown summary of a crawl and writes it to a file
///
/// # Arguments
///
/// * `report` - The finished crawl
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Escapes text for use inside a markdown table cell
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Formats a crawl report as markdown
pub fn format_markdown_summary(report: &CrawlReport) -> String {
    let stats = CrawlStatistics::from_report(report);
    let mut md = String::new();

    md.push_str("# Sitewalk Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Root**: {}\n", report.base_url));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = &report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = stats.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Outcome**: {}\n\n", report.phase));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Pages**: {}\n", stats.total_pages));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n",
        stats.success_rate()
    ));
    md.push_str(&format!("- **Pages Retried**: {}\n", stats.retried_pages));
    md.push_str(&format!(
        "- **Pages Recovered**: {}\n",
        stats.recovered_pages
    ));
    md.push_str(&format!(
        "- **Unresolved Errors**: {}\n\n",
        stats.unresolved_errors
    ));

    md.push_str("## Page Status Breakdown\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!(
        "| Success | {} |\n",
        stats.count(PageStatus::Success)
    ));
    md.push_str(&format!(
        "| Non-HTML | {} |\n",
        stats.count(PageStatus::NonHtml)
    ));
    md.push_str(&format!("| Error | {} |\n\n", stats.count(PageStatus::Error)));

    if !stats.error_reasons.is_empty() {
        md.push_str("## Error Reasons\n\n");
        md.push_str("| Reason | Count |\n");
        md.push_str("|--------|-------|\n");
        for (reason, count) in &stats.error_reasons {
            md.push_str(&format!("| {} | {} |\n", cell(reason), count));
        }
        md.push('\n');
    }

    if !report.error_summary.is_empty() {
        md.push_str("## Unresolved Errors\n\n");
        md.push_str("| URL | Error | Retries |\n");
        md.push_str("|-----|-------|---------|\n");
        for entry in report.error_summary.iter().take(MAX_ERROR_ROWS) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                cell(&entry.url),
                cell(&entry.error),
                entry.retry_count
            ));
        }
        if report.error_summary.len() > MAX_ERROR_ROWS {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.error_summary.len() - MAX_ERROR_ROWS
            ));
        }
        md.push('\n');
    }

    md
}
