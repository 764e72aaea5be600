//! Course report file rendering (`txt` and `csv`).

use crate::cli::ExportFormat;
use crate::output::{format_date, score_percent, weight_percent};
use anyhow::Context;
use gradebook_core::{Course, CourseReport};
use std::fmt::Write;
use std::path::Path;

const RULE_WIDTH: usize = 64;

pub fn render(report: &CourseReport, format: ExportFormat) -> Result<String, std::fmt::Error> {
    match format {
        ExportFormat::Txt => render_txt(report),
        ExportFormat::Csv => render_csv(report),
    }
}

/// Renders and writes a report, creating the parent directory.
pub fn write_report(report: &CourseReport, format: ExportFormat, path: &Path) -> anyhow::Result<()> {
    let body = render(report, format)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    std::fs::write(path, body).with_context(|| format!("failed to write `{}`", path.display()))
}

fn render_txt(report: &CourseReport) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{}: {}", report.course.code, report.course.title)?;
    writeln!(out, "Term: {}", report.course.term)?;
    writeln!(out, "Overall Grade: {}", score_percent(report.grade))?;
    if !report.weights_valid {
        writeln!(
            out,
            "Warning: category weights sum to {}",
            weight_percent(report.allocated_weight)
        )?;
    }

    for category in &report.categories {
        writeln!(out)?;
        writeln!(
            out,
            "{} ({})",
            category.category.name,
            weight_percent(category.category.weight)
        )?;
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
        for scored in &category.assignments {
            let assignment = &scored.assignment;
            writeln!(
                out,
                "{:<30} {:>5.1}/{:<5.1} ({:>5.1}%) [{}]",
                assignment.title,
                assignment.earned_points,
                assignment.max_points,
                scored.percentage,
                format_date(assignment.created_at)
            )?;
        }
        if let Some(average) = category.average {
            writeln!(out, "Category Average: {}", score_percent(average))?;
        }
    }
    Ok(out)
}

fn render_csv(report: &CourseReport) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "Course,{}", csv_field(&report.course.code))?;
    writeln!(out, "Title,{}", csv_field(&report.course.title))?;
    writeln!(out, "Term,{}", csv_field(&report.course.term))?;
    writeln!(out, "Overall Grade,{:.2}%", report.grade)?;
    writeln!(out)?;
    writeln!(
        out,
        "Category,Weight,Assignment,Max Points,Earned Points,Percentage,Date"
    )?;

    for category in &report.categories {
        let name = csv_field(&category.category.name);
        let weight = category.category.weight;
        if category.assignments.is_empty() {
            writeln!(out, "{name},{weight:.2},,,,,")?;
            continue;
        }
        for scored in &category.assignments {
            let assignment = &scored.assignment;
            writeln!(
                out,
                "{name},{weight:.2},{},{},{},{:.1},{}",
                csv_field(&assignment.title),
                assignment.max_points,
                assignment.earned_points,
                scored.percentage,
                format_date(assignment.created_at)
            )?;
        }
    }
    Ok(out)
}

/// `<code>_<term>.<ext>` with anything outside `[A-Za-z0-9._-]` as `_`.
pub fn course_file_name(course: &Course, format: ExportFormat) -> String {
    let stem: String = format!("{}_{}", course.code, course.term)
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}.{}", format.extension())
}

/// Always quotes; embedded quotes are doubled.
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
