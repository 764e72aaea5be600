use super::category::describe_outcome;
use super::Session;
use crate::cli::{CourseRef, ExportFormat};
use crate::export::{course_file_name, write_report};
use crate::output::{print_list, print_one, score_percent, weight_percent};
use anyhow::bail;
use gradebook_core::{
    grade_distribution, score_summary, term_summaries, CourseSummary, GradeDistribution,
    LetterBand, NormalizeOutcome, ScoreSummary, TermSummary,
};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct GradeSummary {
    code: String,
    term: String,
    grade: f64,
    weights_valid: bool,
    assignments: usize,
}

#[derive(Serialize)]
struct NormalizedCourse {
    code: String,
    term: String,
    outcome: NormalizeOutcome,
}

#[derive(Serialize)]
struct Exported {
    code: String,
    path: PathBuf,
}

pub fn grade(session: &Session, course: &CourseRef) -> anyhow::Result<()> {
    let course = session.resolve_course(course)?;
    let report = session.calculator()?.course_report(&course)?;
    let summary = GradeSummary {
        assignments: report.assignment_count(),
        code: course.code,
        term: course.term,
        grade: report.grade,
        weights_valid: report.weights_valid,
    };
    print_one(session.json, summary, |summary| {
        let mut line = format!(
            "{} ({}): {}",
            summary.code,
            summary.term,
            score_percent(summary.grade)
        );
        if summary.assignments == 0 {
            line.push_str(" (no graded assignments)");
        }
        if !summary.weights_valid {
            line.push_str(" [weights do not sum to 100%]");
        }
        line
    })
}

#[derive(Serialize)]
struct CourseStats {
    code: String,
    summary: Option<ScoreSummary>,
    distribution: GradeDistribution,
}

pub fn stats(session: &Session, course: &CourseRef) -> anyhow::Result<()> {
    let course = session.resolve_course(course)?;
    let assignments = session.assignments()?.list_assignments(course.uuid)?;
    let stats = CourseStats {
        summary: score_summary(&assignments)?,
        distribution: grade_distribution(&assignments)?,
        code: course.code,
    };
    print_one(session.json, stats, render_stats)
}

fn render_stats(stats: &CourseStats) -> String {
    let Some(summary) = &stats.summary else {
        return format!("{}: no assignments recorded.", stats.code);
    };
    let mut lines = vec![
        format!("{} statistics", stats.code),
        format!("Assignments:   {}", summary.count),
        format!("Latest Grade:  {}", score_percent(summary.latest)),
        format!("Average Grade: {}", score_percent(summary.mean)),
        format!("Highest Grade: {}", score_percent(summary.max)),
        format!("Lowest Grade:  {}", score_percent(summary.min)),
        String::new(),
    ];
    for band in LetterBand::ALL {
        let count = stats.distribution.count(band);
        let share = stats.distribution.share(band);
        lines.push(format!(
            "{:<11} {:>3} {:>7} {}",
            band.range_label(),
            count,
            format!("{share:.1}%"),
            "#".repeat((share / 5.0).round() as usize)
        ));
    }
    lines.join("\n")
}

#[derive(Serialize)]
struct SummaryView {
    courses: Vec<CourseSummary>,
    terms: Vec<TermSummary>,
}

pub fn summary(session: &Session, term: Option<&str>) -> anyhow::Result<()> {
    let courses = session.courses()?.list_courses()?;
    let courses = session.calculator()?.course_summaries(&courses, term)?;
    let terms = term_summaries(&courses);
    print_one(session.json, SummaryView { courses, terms }, render_summary)
}

fn render_summary(view: &SummaryView) -> String {
    if view.courses.is_empty() {
        return "No courses found.".to_string();
    }
    let mut lines = vec![format!(
        "{:<10} {:<28} {:<14} {:>11} {:>8}  {}",
        "Course", "Title", "Term", "Assignments", "Average", "Range"
    )];
    for entry in &view.courses {
        let course = &entry.course;
        let (count, average, range) = match &entry.summary {
            Some(summary) => (
                summary.count,
                format!("{:.1}%", summary.mean),
                format!("{:.1}% - {:.1}%", summary.min, summary.max),
            ),
            None => (0, "N/A".to_string(), "N/A".to_string()),
        };
        lines.push(format!(
            "{:<10} {:<28} {:<14} {:>11} {:>8}  {}",
            course.code, course.title, course.term, count, average, range
        ));
    }

    // Term rollup only says something when there is more than one term.
    if view.terms.len() > 1 {
        lines.push(String::new());
        lines.push(format!("{:<14} {:>7} {:>8}", "Term", "Courses", "Average"));
        for term in &view.terms {
            lines.push(format!(
                "{:<14} {:>7} {:>8}",
                term.term,
                term.course_count,
                term.average
                    .map_or_else(|| "N/A".to_string(), |average| format!("{average:.1}%"))
            ));
        }
    }
    lines.join("\n")
}

pub fn normalize_all(session: &Session) -> anyhow::Result<()> {
    let courses: HashMap<_, _> = session
        .courses()?
        .list_courses()?
        .into_iter()
        .map(|course| (course.uuid, course))
        .collect();
    let outcomes = session.allocator()?.normalize_all()?;

    let normalized: Vec<NormalizedCourse> = outcomes
        .into_iter()
        .filter_map(|(id, outcome)| {
            courses.get(&id).map(|course| NormalizedCourse {
                code: course.code.clone(),
                term: course.term.clone(),
                outcome,
            })
        })
        .collect();
    print_list(session.json, &normalized, "No courses found.", |entry| {
        format!(
            "{:<10} {:<14} {}",
            entry.code,
            entry.term,
            describe_outcome(entry.outcome)
        )
    })
}

pub fn audit(session: &Session) -> anyhow::Result<()> {
    let courses = session.courses()?.list_courses()?;
    let findings = session.calculator()?.audit_weights(&courses)?;
    print_list(
        session.json,
        &findings,
        "All course weights sum to 100%.",
        |finding| {
            format!(
                "{:<10} {:<14} weights sum to {} across {} categories{}",
                finding.course.code,
                finding.course.term,
                weight_percent(finding.total_weight),
                finding.category_count,
                if finding.has_unallocated {
                    " (including Unallocated)"
                } else {
                    ""
                }
            )
        },
    )
}

pub fn export(
    session: &Session,
    course: &CourseRef,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let course = session.resolve_course(course)?;
    let report = session.calculator()?.course_report(&course)?;
    let path = output
        .unwrap_or_else(|| PathBuf::from(format!("{}.{}", course.code, format.extension())));
    write_report(&report, format, &path)?;
    info!(
        "event=course_export module=cli status=ok course_id={} format={}",
        course.uuid,
        format.extension()
    );

    print_one(
        session.json,
        Exported {
            code: course.code,
            path,
        },
        |exported| format!("Exported {} to {}", exported.code, exported.path.display()),
    )
}

#[derive(Serialize)]
struct BatchExport {
    code: String,
    term: String,
    path: PathBuf,
    error: Option<String>,
}

/// Exports every course into `dir`, continuing past individual failures.
pub fn export_all(session: &Session, format: ExportFormat, dir: &Path) -> anyhow::Result<()> {
    let courses = session.courses()?.list_courses()?;
    let calculator = session.calculator()?;

    let mut results = Vec::with_capacity(courses.len());
    for course in courses {
        let path = dir.join(course_file_name(&course, format));
        let outcome = calculator
            .course_report(&course)
            .map_err(anyhow::Error::from)
            .and_then(|report| write_report(&report, format, &path));
        if let Err(err) = &outcome {
            warn!(
                "event=course_export module=cli status=error course_id={} error={err:#}",
                course.uuid
            );
        }
        results.push(BatchExport {
            code: course.code,
            term: course.term,
            path,
            error: outcome.err().map(|err| format!("{err:#}")),
        });
    }

    let failed = results.iter().filter(|result| result.error.is_some()).count();
    info!(
        "event=course_export_all module=cli status=ok format={} courses={} failed={failed}",
        format.extension(),
        results.len()
    );
    print_list(session.json, &results, "No courses found to export.", |result| {
        match &result.error {
            None => format!("Exported {} ({}) to {}", result.code, result.term, result.path.display()),
            Some(error) => format!("Failed {} ({}): {error}", result.code, result.term),
        }
    })?;
    if failed > 0 {
        bail!("{failed} of {} course exports failed", results.len());
    }
    Ok(())
}
