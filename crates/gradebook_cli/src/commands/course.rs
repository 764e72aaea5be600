use super::Session;
use crate::cli::CourseCommands;
use crate::output::{print_list, print_one, score_percent, weight_percent};
use gradebook_core::CourseReport;

pub fn handle(session: &Session, command: CourseCommands) -> anyhow::Result<()> {
    match command {
        CourseCommands::Add {
            code,
            title,
            term,
            credits,
        } => {
            let course = session.courses()?.add_course(&code, &title, &term, credits)?;
            print_one(session.json, course, |course| {
                format!(
                    "Added course {} ({}) for {}",
                    course.code, course.title, course.term
                )
            })
        }
        CourseCommands::List => {
            let courses = session.courses()?.list_courses()?;
            print_list(session.json, &courses, "No courses found.", |course| {
                format!(
                    "{:<10} {:<14} {:<32} {} cr",
                    course.code, course.term, course.title, course.credit_hours
                )
            })
        }
        CourseCommands::Show { course } => {
            let course = session.resolve_course(&course)?;
            let report = session.calculator()?.course_report(&course)?;
            print_one(session.json, report, render_report)
        }
        CourseCommands::Remove { course } => {
            let course = session.resolve_course(&course)?;
            session.courses()?.remove_course(course.uuid)?;
            print_one(session.json, course, |course| {
                format!("Removed course {} ({})", course.code, course.term)
            })
        }
    }
}

fn render_report(report: &CourseReport) -> String {
    let course = &report.course;
    let mut lines = vec![
        format!(
            "{} - {} ({}, {} credits)",
            course.code, course.title, course.term, course.credit_hours
        ),
        format!(
            "{:<24} {:>9} {:>9} {:>13}",
            "Category", "Weight", "Average", "Contribution"
        ),
    ];

    for category in &report.categories {
        lines.push(format!(
            "{:<24} {:>9} {:>9} {:>13}",
            category.category.name,
            weight_percent(category.category.weight),
            category.average.map_or_else(|| "-".to_string(), score_percent),
            category
                .contribution
                .map_or_else(|| "-".to_string(), weight_percent),
        ));
        for scored in &category.assignments {
            lines.push(format!(
                "  {:<22} {:>9} {:>9}",
                scored.assignment.title,
                format!(
                    "{}/{}",
                    scored.assignment.earned_points, scored.assignment.max_points
                ),
                score_percent(scored.percentage),
            ));
        }
    }

    if report.categories.is_empty() {
        lines.push("No categories defined.".to_string());
    }
    lines.push(format!("Overall Grade: {}", score_percent(report.grade)));
    if !report.weights_valid && !report.categories.is_empty() {
        lines.push(format!(
            "Warning: weights sum to {}; run `gradebook category normalize {}`",
            weight_percent(report.allocated_weight),
            course.code
        ));
    }
    lines.join("\n")
}
