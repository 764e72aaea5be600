use super::Session;
use crate::cli::AssignmentCommands;
use crate::output::{print_one, score_percent};
use gradebook_core::{Assignment, AssignmentPatch};

pub fn handle(session: &Session, command: AssignmentCommands) -> anyhow::Result<()> {
    match command {
        AssignmentCommands::Add {
            course,
            category,
            title,
            max_points,
            earned_points,
        } => {
            let course = session.resolve_course(&course)?;
            let category = session.allocator()?.find_category(course.uuid, &category)?;
            let created = session.assignments()?.add_assignment(
                course.uuid,
                category.uuid,
                &title,
                max_points,
                earned_points,
            )?;
            print_assignment(session, "Added", created)
        }
        AssignmentCommands::Edit {
            course,
            title,
            new_title,
            earned,
            max,
            category,
        } => {
            let course = session.resolve_course(&course)?;
            let service = session.assignments()?;
            let assignment = service.find_assignment(course.uuid, &title)?;
            let category = match category {
                Some(name) => Some(session.allocator()?.find_category(course.uuid, &name)?),
                None => None,
            };
            let updated = service.update_assignment(
                assignment.uuid,
                AssignmentPatch {
                    title: new_title,
                    max_points: max,
                    earned_points: earned,
                    category: category.map(|category| category.uuid),
                },
            )?;
            print_assignment(session, "Updated", updated)
        }
        AssignmentCommands::Move {
            course,
            title,
            category,
        } => {
            let course = session.resolve_course(&course)?;
            let service = session.assignments()?;
            let assignment = service.find_assignment(course.uuid, &title)?;
            let category = session.allocator()?.find_category(course.uuid, &category)?;
            let moved = service.move_assignment(assignment.uuid, category.uuid)?;
            print_assignment(session, "Moved", moved)
        }
        AssignmentCommands::Remove { course, title } => {
            let course = session.resolve_course(&course)?;
            let service = session.assignments()?;
            let assignment = service.find_assignment(course.uuid, &title)?;
            service.delete_assignment(assignment.uuid)?;
            print_assignment(session, "Removed", assignment)
        }
    }
}

fn print_assignment(session: &Session, verb: &str, assignment: Assignment) -> anyhow::Result<()> {
    let percentage = session.calculator()?.assignment_percentage(&assignment)?;
    print_one(session.json, assignment, |assignment| {
        format!(
            "{verb} {}: {}/{} ({})",
            assignment.title,
            assignment.earned_points,
            assignment.max_points,
            score_percent(percentage)
        )
    })
}
