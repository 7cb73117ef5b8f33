//! Census report generation.
//!
//! This module renders aggregation results and citizen listings as plain
//! text tables, Markdown documents or JSON.

use crate::cli::OutputFormat;
use crate::config::ReportConfig;
use crate::models::{AggregationResult, CensusReport, Citizen, CountCard, Level, NodeFailure};
use crate::selection::CitizenScope;
use anyhow::Result;
use serde::Serialize;

/// Which parts of the result to render.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Only this level; all levels when `None`.
    pub level: Option<Level>,
    /// Maximum rows per level.
    pub top: Option<usize>,
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            level: config.level,
            top: config.top,
        }
    }
}

impl ReportOptions {
    fn levels(&self) -> Vec<Level> {
        match self.level {
            Some(level) => vec![level],
            None => Level::ALL.to_vec(),
        }
    }

    fn rows<'a>(&self, cards: &'a [CountCard]) -> &'a [CountCard] {
        match self.top {
            Some(n) if n < cards.len() => &cards[..n],
            _ => cards,
        }
    }
}

/// Render a census report in the requested format.
pub fn render_report(
    report: &CensusReport,
    format: OutputFormat,
    options: &ReportOptions,
) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(generate_table_report(report, options)),
        OutputFormat::Markdown => Ok(generate_markdown_report(report, options)),
        OutputFormat::Json => generate_json_report(report, options),
    }
}

/// Generate a plain-text report for the terminal.
pub fn generate_table_report(report: &CensusReport, options: &ReportOptions) -> String {
    let result = &report.result;
    let mut output = String::new();

    output.push_str(&format!("Total citizens: {}\n", result.total_citizens));
    output.push_str(&format!(
        "Countries: {} | Territories: {} | Districts: {} | Seats: {}\n\n",
        result.country_counts.len(),
        result.territory_counts.len(),
        result.district_counts.len(),
        result.seat_counts.len()
    ));

    for level in options.levels() {
        output.push_str(&format!("{}\n", level.plural()));
        output.push_str(&text_table(level, options.rows(result.level(level))));
        output.push('\n');
    }

    if !result.is_complete() {
        output.push_str(&format!(
            "WARNING: data may be incomplete ({} failed fetches)\n",
            result.failures.len()
        ));
        for failure in &result.failures {
            output.push_str(&format!("  - {}\n", describe_failure(failure)));
        }
    }

    output
}

fn text_table(level: Level, cards: &[CountCard]) -> String {
    if cards.is_empty() {
        return "  (none)\n".to_string();
    }

    let name_header = format!("{} Name", level);
    let name_width = cards
        .iter()
        .map(|c| c.name.chars().count())
        .chain(std::iter::once(name_header.len()))
        .max()
        .unwrap_or(0);
    let count_width = cards
        .iter()
        .map(|c| c.count.to_string().len())
        .chain(std::iter::once("Citizens".len()))
        .max()
        .unwrap_or(0);

    let mut table = String::new();
    table.push_str(&format!(
        "  {:<name_width$}  {:>count_width$}  Location\n",
        name_header, "Citizens"
    ));
    table.push_str(&format!(
        "  {}  {}  {}\n",
        "-".repeat(name_width),
        "-".repeat(count_width),
        "-".repeat(8)
    ));
    for card in cards {
        table.push_str(&format!(
            "  {:<name_width$}  {:>count_width$}  {}\n",
            card.name, card.count, card.parent_label
        ));
    }

    table
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &CensusReport, options: &ReportOptions) -> String {
    let mut output = String::new();

    output.push_str("# Citizen Count Report\n\n");
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_summary_section(&report.result));
    output.push_str(&generate_incomplete_notice(&report.result.failures));

    for level in options.levels() {
        output.push_str(&generate_level_section(
            level,
            options.rows(report.result.level(level)),
            report.result.level(level).len(),
        ));
    }

    output.push_str("---\n\n*Report generated by registry-census*\n");

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &CensusReport) -> String {
    let metadata = &report.metadata;
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(country) = metadata.country_filter {
        section.push_str(&format!("- **Country Filter:** {}\n", country));
    }
    section.push_str(&format!("- **Run:** #{}\n", metadata.run_sequence));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

/// Generate the summary section.
fn generate_summary_section(result: &AggregationResult) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Total Citizens | Countries | Territories | Districts | Seats |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| **{}** | {} | {} | {} | {} |\n\n",
        result.total_citizens,
        result.country_counts.len(),
        result.territory_counts.len(),
        result.district_counts.len(),
        result.seat_counts.len()
    ));

    section
}

fn generate_incomplete_notice(failures: &[NodeFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str(&format!(
        "> **Data may be incomplete:** {} fetches failed and were counted as zero.\n>\n",
        failures.len()
    ));
    for failure in failures {
        section.push_str(&format!("> - {}\n", describe_failure(failure)));
    }
    section.push('\n');

    section
}

/// Generate the table for one level.
fn generate_level_section(level: Level, cards: &[CountCard], total_rows: usize) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {} ({})\n\n", level.plural(), total_rows));

    if cards.is_empty() {
        section.push_str(&format!("No {} found.\n\n", level.plural().to_lowercase()));
        return section;
    }

    section.push_str(&format!("| {} Name | Citizens | Location |\n", level));
    section.push_str("|:---|:---:|:---|\n");
    for card in cards {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            escape_cell(&card.name),
            card.count,
            escape_cell(&card.parent_label)
        ));
    }
    if cards.len() < total_rows {
        section.push_str(&format!(
            "\n*Showing top {} of {}.*\n",
            cards.len(),
            total_rows
        ));
    }
    section.push('\n');

    section
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

fn describe_failure(failure: &NodeFailure) -> String {
    format!(
        "could not {} for {} {} ({}): {}",
        failure.operation, failure.level, failure.node_id, failure.node_name, failure.message
    )
}

/// Generate a JSON report honoring the level and row limits.
pub fn generate_json_report(report: &CensusReport, options: &ReportOptions) -> Result<String> {
    let mut trimmed = report.clone();
    let result = &mut trimmed.result;

    for level in Level::ALL {
        let keep = options.level.map_or(true, |only| only == level);
        let cards = match level {
            Level::Country => &mut result.country_counts,
            Level::Territory => &mut result.territory_counts,
            Level::District => &mut result.district_counts,
            Level::Seat => &mut result.seat_counts,
        };
        if !keep {
            cards.clear();
        } else if let Some(n) = options.top {
            cards.truncate(n);
        }
    }

    serde_json::to_string_pretty(&trimmed).map_err(Into::into)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CitizenListing<'a> {
    scope: Level,
    id: u64,
    citizens: &'a [Citizen],
}

/// Render the citizens of a district or seat.
pub fn render_citizen_listing(
    scope: CitizenScope,
    citizens: &[Citizen],
    format: OutputFormat,
) -> Result<String> {
    if format == OutputFormat::Json {
        let listing = CitizenListing {
            scope: scope.level(),
            id: scope.id(),
            citizens,
        };
        return serde_json::to_string_pretty(&listing).map_err(Into::into);
    }

    let place = scope.level().to_string().to_lowercase();
    let mut output = String::new();

    if format == OutputFormat::Markdown {
        output.push_str(&format!("# {} Citizens List\n\n", scope.level()));
    }

    if citizens.is_empty() {
        output.push_str(&format!("No citizens found in this {}.\n", place));
        return Ok(output);
    }

    let headers = [
        "Citizen Name",
        "NIC",
        "DOB",
        "City",
        "Job",
        "Salary",
        "Marital Status",
    ];
    let rows: Vec<[String; 7]> = citizens.iter().map(citizen_row).collect();

    if format == OutputFormat::Markdown {
        output.push_str(&format!("| {} |\n", headers.join(" | ")));
        output.push_str(&format!("|{}\n", ":---|".repeat(headers.len())));
        for row in &rows {
            let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
            output.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        output.push_str(&format!("\n*{} citizens*\n", rows.len()));
        return Ok(output);
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&padded_line(&headers, &widths));
    output.push_str(&padded_line(
        &dashes.iter().map(String::as_str).collect::<Vec<_>>(),
        &widths,
    ));
    for row in &rows {
        output.push_str(&padded_line(
            &row.iter().map(String::as_str).collect::<Vec<_>>(),
            &widths,
        ));
    }
    output.push_str(&format!("\n{} citizens in {} {}\n", rows.len(), place, scope.id()));

    Ok(output)
}

fn padded_line(cells: &[&str], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    format!("{}\n", padded.join("  ").trim_end())
}

fn citizen_row(citizen: &Citizen) -> [String; 7] {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    [
        citizen.name.clone(),
        citizen.national_id.clone(),
        citizen
            .birth_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        text(&citizen.city),
        text(&citizen.job),
        citizen
            .salary
            .map(|s| format!("{:.2}", s))
            .unwrap_or_default(),
        text(&citizen.marital_status),
    ]
}
