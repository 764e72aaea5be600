use super::Session;
use crate::cli::CategoryCommands;
use crate::output::{print_list, print_one, weight_percent};
use anyhow::bail;
use gradebook_core::{Category, CourseId, NormalizeOutcome};
use serde::Serialize;

#[derive(Serialize)]
struct NormalizedCourse {
    course_uuid: CourseId,
    outcome: NormalizeOutcome,
}

pub fn handle(session: &Session, command: CategoryCommands) -> anyhow::Result<()> {
    match command {
        CategoryCommands::Set {
            course,
            categories,
            preserve_assignments,
        } => {
            let course = session.resolve_course(&course)?;
            let created = session.allocator()?.replace_categories(
                course.uuid,
                &categories,
                preserve_assignments,
            )?;
            print_categories(session, &created)
        }
        CategoryCommands::Add {
            course,
            name,
            weight,
        } => {
            let course = session.resolve_course(&course)?;
            let allocator = session.allocator()?;
            allocator.add_category(course.uuid, &name, weight)?;
            print_categories(session, &allocator.list_categories(course.uuid)?)
        }
        CategoryCommands::Edit {
            course,
            name,
            weight,
            new_name,
        } => {
            if weight.is_none() && new_name.is_none() {
                bail!("nothing to change; pass --weight and/or --new-name");
            }
            let course = session.resolve_course(&course)?;
            let allocator = session.allocator()?;
            let category = allocator.find_category(course.uuid, &name)?;
            if let Some(weight) = weight {
                allocator.update_category_weight(category.uuid, weight)?;
            }
            if let Some(new_name) = new_name {
                allocator.rename_category(category.uuid, &new_name)?;
            }
            print_categories(session, &allocator.list_categories(course.uuid)?)
        }
        CategoryCommands::Remove {
            course,
            name,
            delete_assignments,
        } => {
            let course = session.resolve_course(&course)?;
            let allocator = session.allocator()?;
            let category = allocator.find_category(course.uuid, &name)?;
            let removed = allocator.remove_category(category.uuid, !delete_assignments)?;
            print_one(session.json, removed, |removed| {
                let fate = if delete_assignments {
                    "deleted"
                } else {
                    "moved to Unassigned"
                };
                format!(
                    "Removed category {}; {} assignment(s) {fate}; {} returned to Unallocated",
                    removed.name,
                    removed.affected_assignments,
                    weight_percent(removed.returned_weight)
                )
            })
        }
        CategoryCommands::Normalize { course } => {
            let course = session.resolve_course(&course)?;
            let outcome = session.allocator()?.normalize(course.uuid)?;
            print_one(
                session.json,
                NormalizedCourse {
                    course_uuid: course.uuid,
                    outcome,
                },
                |normalized| format!("{}: {}", course.code, describe_outcome(normalized.outcome)),
            )
        }
        CategoryCommands::List { course } => {
            let course = session.resolve_course(&course)?;
            print_categories(session, &session.allocator()?.list_categories(course.uuid)?)
        }
    }
}

fn print_categories(session: &Session, categories: &[Category]) -> anyhow::Result<()> {
    print_list(session.json, categories, "No categories defined.", |category| {
        format!("{:<24} {:>9}", category.name, weight_percent(category.weight))
    })
}

pub fn describe_outcome(outcome: NormalizeOutcome) -> String {
    match outcome {
        NormalizeOutcome::Unchanged => "already normalized".to_string(),
        NormalizeOutcome::SlackSet { weight } => {
            format!("Unallocated set to {}", weight_percent(weight))
        }
        NormalizeOutcome::SlackRemoved => "removed empty Unallocated".to_string(),
        NormalizeOutcome::Rescaled { factor } => format!("weights rescaled by {factor:.4}"),
    }
}
