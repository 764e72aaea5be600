use gradebook_core::db::open_db_in_memory;
use gradebook_core::{
    Assignment, AssignmentRepository, Category, CategoryKind, CategoryRepository, Course,
    CourseId, CourseRepository, FreedWeightPolicy, GradeCalculator, GradebookError,
    NormalizeOutcome, SqliteAssignmentRepository, SqliteCategoryRepository,
    SqliteCourseRepository, SyntheticKind, ValidationError, WeightAllocator,
};
use rusqlite::{params, Connection};

const TOLERANCE: f64 = 1e-4;

fn create_course(conn: &Connection, code: &str) -> CourseId {
    let repo = SqliteCourseRepository::try_new(conn).unwrap();
    let course = Course::new(code, "General Chemistry", "Fall 2024", 3).unwrap();
    repo.create_course(&course).unwrap().uuid
}

fn allocator(conn: &Connection) -> WeightAllocator<SqliteCategoryRepository<'_>> {
    WeightAllocator::new(SqliteCategoryRepository::try_new(conn).unwrap())
}

fn dropping_allocator(conn: &Connection) -> WeightAllocator<SqliteCategoryRepository<'_>> {
    WeightAllocator::with_policy(
        SqliteCategoryRepository::try_new(conn).unwrap(),
        FreedWeightPolicy::Drop,
    )
}

fn calculator(conn: &Connection) -> GradeCalculator<SqliteCategoryRepository<'_>> {
    GradeCalculator::new(SqliteCategoryRepository::try_new(conn).unwrap())
}

fn category<'a>(categories: &'a [Category], name: &str) -> &'a Category {
    categories
        .iter()
        .find(|category| category.name == name)
        .unwrap_or_else(|| panic!("category {name} missing"))
}

fn weight_of(categories: &[Category], kind: CategoryKind) -> Option<f64> {
    categories
        .iter()
        .find(|category| category.kind == kind)
        .map(|category| category.weight)
}

fn regular_total(categories: &[Category]) -> f64 {
    categories
        .iter()
        .filter(|category| category.kind == CategoryKind::Regular)
        .map(|category| category.weight)
        .sum()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

/// Weight-bearing rows sum to 1.0, with Unallocated covering any remainder.
fn assert_invariant(categories: &[Category]) {
    if categories.is_empty() {
        return;
    }
    let total: f64 = categories
        .iter()
        .filter(|category| category.kind.counts_toward_weight())
        .map(|category| category.weight)
        .sum();
    assert_close(total, 1.0);
    for category in categories {
        if category.kind.counts_toward_weight() {
            assert!(category.weight > TOLERANCE, "{} is effectively zero", category.name);
        }
    }
}

fn add_assignment(conn: &Connection, course: CourseId, category: &Category, title: &str) {
    let repo = SqliteAssignmentRepository::try_new(conn).unwrap();
    let assignment = Assignment::new(course, category.uuid, title, 100.0, 80.0).unwrap();
    repo.create_assignment(&assignment).unwrap();
}

#[test]
fn replace_rejects_weights_not_summing_to_one_then_accepts_valid_set() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);

    let err = allocator
        .replace_categories(course, &[("Cat1", 0.5), ("Cat2", 0.2)], false)
        .unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::WeightsDoNotSum { .. })
    ));
    assert!(err.to_string().contains("weights must sum to 100%"));
    assert!(allocator.list_categories(course).unwrap().is_empty());

    let created = allocator
        .replace_categories(course, &[("Cat1", 0.6), ("Cat2", 0.4)], false)
        .unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].name, "Cat1");
    assert!(calculator(&conn).validate_category_weights(course).unwrap());
}

#[test]
fn failed_replace_leaves_existing_categories_untouched() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();

    allocator
        .replace_categories(course, &[("Labs", 0.9)], false)
        .unwrap_err();
    allocator
        .replace_categories(course, &[("Labs", 0.5), ("LABS", 0.5)], false)
        .unwrap_err();

    let categories = allocator.list_categories(course).unwrap();
    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Exams", "Homework"]);
}

#[test]
fn replace_drops_old_unallocated_and_sink_rows() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    let categories = allocator.list_categories(course).unwrap();
    add_assignment(&conn, course, category(&categories, "Homework"), "HW1");
    allocator
        .remove_category(category(&categories, "Homework").uuid, true)
        .unwrap();

    let replaced = allocator
        .replace_categories(course, &[("Final", 1.0)], false)
        .unwrap();
    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced[0].kind, CategoryKind::Regular);
}

#[test]
fn replace_with_preserve_moves_assignments_to_first_new_category() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    add_assignment(&conn, course, category(&categories, "Exams"), "Midterm");
    add_assignment(&conn, course, category(&categories, "Homework"), "HW1");
    add_assignment(&conn, course, category(&categories, "Homework"), "HW2");

    let replaced = allocator
        .replace_categories(
            course,
            &[("Tests", 0.5), ("Labs", 0.25), ("Quizzes", 0.25)],
            true,
        )
        .unwrap();
    assert_eq!(replaced.len(), 3);
    assert!(replaced.iter().all(|c| c.kind == CategoryKind::Regular));

    let repo = SqliteCategoryRepository::try_new(&conn).unwrap();
    let tests = category(&replaced, "Tests");
    assert_eq!(repo.fetch_assignments(tests.uuid).unwrap().len(), 3);
    assert!(repo
        .find_synthetic(course, CategoryKind::Holding)
        .unwrap()
        .is_none());
}

#[test]
fn replace_without_preserve_deletes_assignments() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 1.0)], false)
        .unwrap();
    add_assignment(&conn, course, &categories[0], "Midterm");

    allocator
        .replace_categories(course, &[("Tests", 1.0)], false)
        .unwrap();

    let assignments = SqliteAssignmentRepository::try_new(&conn)
        .unwrap()
        .list_course_assignments(course)
        .unwrap();
    assert!(assignments.is_empty());
}

#[test]
fn replace_on_missing_course_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let err = allocator(&conn)
        .replace_categories(uuid::Uuid::new_v4(), &[("Exams", 1.0)], false)
        .unwrap_err();
    assert!(matches!(err, GradebookError::NotFound(_)));
}

#[test]
fn add_category_rejects_weight_outside_unit_range() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);

    let err = allocator.add_category(course, "Invalid", 50.0).unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::WeightOutOfRange(weight)) if weight == 50.0
    ));
    let err = allocator.add_category(course, "Invalid", 0.0).unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::WeightOutOfRange(_))
    ));
    assert!(allocator.list_categories(course).unwrap().is_empty());
}

#[test]
fn add_category_on_fresh_course_creates_slack_then_consumes_it() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);

    allocator.add_category(course, "Exams", 0.7).unwrap();
    let categories = allocator.list_categories(course).unwrap();
    assert_close(weight_of(&categories, CategoryKind::Unallocated).unwrap(), 0.3);
    assert_invariant(&categories);

    allocator.add_category(course, "Homework", 0.3).unwrap();
    let categories = allocator.list_categories(course).unwrap();
    assert!(weight_of(&categories, CategoryKind::Unallocated).is_none());
    assert_eq!(categories.len(), 2);
    assert_invariant(&categories);
}

#[test]
fn add_category_without_slack_fails_with_insufficient_slack() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    allocator
        .replace_categories(course, &[("Exams", 1.0)], false)
        .unwrap();

    let err = allocator.add_category(course, "Quiz", 0.1).unwrap_err();
    assert!(matches!(
        err,
        GradebookError::InsufficientSlack { available, .. } if available == 0.0
    ));
    assert!(err.to_string().contains("no Unallocated weight available"));
}

#[test]
fn add_category_larger_than_slack_reports_both_amounts() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    allocator.add_category(course, "Exams", 0.9).unwrap();

    let err = allocator.add_category(course, "Labs", 0.2).unwrap_err();
    match err {
        GradebookError::InsufficientSlack {
            requested,
            available,
        } => {
            assert_close(requested, 0.2);
            assert_close(available, 0.1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(allocator.list_categories(course).unwrap().len(), 2);
}

#[test]
fn add_category_rejects_duplicate_and_reserved_names() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    allocator.add_category(course, "Exams", 0.5).unwrap();

    let err = allocator.add_category(course, "EXAMS", 0.1).unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::DuplicateCategoryName(_))
    ));
    let err = allocator.add_category(course, "unallocated", 0.1).unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::ReservedCategoryName(_))
    ));
    let err = allocator.add_category(course, "Unassigned", 0.1).unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::ReservedCategoryName(_))
    ));
}

#[test]
fn decreasing_weight_credits_unallocated() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();

    let updated = allocator
        .update_category_weight(category(&categories, "Exams").uuid, 0.6)
        .unwrap();
    assert_close(updated.weight, 0.6);

    let categories = allocator.list_categories(course).unwrap();
    assert_close(category(&categories, "Exams").weight, 0.6);
    assert_close(category(&categories, "Homework").weight, 0.3);
    assert_close(category(&categories, "Unallocated").weight, 0.1);
    assert_invariant(&categories);
}

#[test]
fn increasing_weight_draws_slack_until_exhausted() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    let exams = category(&categories, "Exams").uuid;
    let homework = category(&categories, "Homework").uuid;

    allocator.update_category_weight(exams, 0.6).unwrap();
    allocator.update_category_weight(homework, 0.35).unwrap();
    let categories = allocator.list_categories(course).unwrap();
    assert_close(weight_of(&categories, CategoryKind::Unallocated).unwrap(), 0.05);

    allocator.update_category_weight(homework, 0.4).unwrap();
    let categories = allocator.list_categories(course).unwrap();
    assert!(weight_of(&categories, CategoryKind::Unallocated).is_none());
    assert_invariant(&categories);

    let err = allocator.update_category_weight(exams, 0.7).unwrap_err();
    assert!(matches!(err, GradebookError::InsufficientSlack { .. }));
    let categories = allocator.list_categories(course).unwrap();
    assert_close(category(&categories, "Exams").weight, 0.6);
    assert_invariant(&categories);
}

#[test]
fn repeated_tiny_increases_never_create_weight() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    let exams = category(&categories, "Exams").uuid;

    let mut weight = 0.7;
    for _ in 0..100 {
        weight += 0.00009;
        if let Ok(updated) = allocator.update_category_weight(exams, weight) {
            weight = updated.weight;
        }
    }

    let categories = allocator.list_categories(course).unwrap();
    assert_close(category(&categories, "Exams").weight, 0.7);
    assert!(weight_of(&categories, CategoryKind::Unallocated).is_none());
    assert_invariant(&categories);
    assert!(calculator(&conn).validate_category_weights(course).unwrap());
}

#[test]
fn repeated_tiny_decreases_never_drain_weight() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    let exams = category(&categories, "Exams").uuid;

    let mut weight = 0.7;
    for _ in 0..100 {
        weight -= 0.00009;
        let updated = allocator.update_category_weight(exams, weight).unwrap();
        weight = updated.weight;
    }

    let categories = allocator.list_categories(course).unwrap();
    assert_invariant(&categories);
    assert!(calculator(&conn).validate_category_weights(course).unwrap());
}

#[test]
fn increase_within_tolerance_of_slack_takes_all_of_it() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    let exams = category(&categories, "Exams").uuid;
    allocator.update_category_weight(exams, 0.6).unwrap();

    let updated = allocator.update_category_weight(exams, 0.70005).unwrap();
    assert_close(updated.weight, 0.7);

    let categories = allocator.list_categories(course).unwrap();
    assert!(weight_of(&categories, CategoryKind::Unallocated).is_none());
    let total: f64 = categories.iter().map(|category| category.weight).sum();
    assert!((total - 1.0).abs() < 1e-9, "total drifted to {total}");
}

#[test]
fn add_within_tolerance_of_slack_takes_all_of_it() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    allocator.add_category(course, "Exams", 0.7).unwrap();

    let labs = allocator.add_category(course, "Labs", 0.29995).unwrap();
    assert_close(labs.weight, 0.3);

    let categories = allocator.list_categories(course).unwrap();
    assert!(weight_of(&categories, CategoryKind::Unallocated).is_none());
    let total: f64 = categories.iter().map(|category| category.weight).sum();
    assert!((total - 1.0).abs() < 1e-9, "total drifted to {total}");
}

#[test]
fn fully_allocated_course_rejects_any_increase_or_addition() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    let exams = category(&categories, "Exams").uuid;

    let err = allocator.update_category_weight(exams, 0.7002).unwrap_err();
    assert!(matches!(
        err,
        GradebookError::InsufficientSlack { available, .. } if available == 0.0
    ));
    let err = allocator.add_category(course, "Quiz", 0.0002).unwrap_err();
    assert!(matches!(err, GradebookError::InsufficientSlack { .. }));
    let err = allocator.add_category(course, "Tiny", 0.00005).unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::WeightOutOfRange(_))
    ));

    let categories = allocator.list_categories(course).unwrap();
    assert_eq!(categories.len(), 2);
    assert_close(category(&categories, "Exams").weight, 0.7);
    assert_invariant(&categories);
}

#[test]
fn unallocated_weight_cannot_be_edited_directly() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    allocator.add_category(course, "Exams", 0.5).unwrap();
    let categories = allocator.list_categories(course).unwrap();
    let unallocated = category(&categories, "Unallocated").uuid;

    let err = allocator.update_category_weight(unallocated, 0.4).unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::SyntheticCategory(CategoryKind::Unallocated))
    ));
    let err = allocator.remove_category(unallocated, false).unwrap_err();
    assert!(matches!(err, GradebookError::Validation(_)));
    let err = allocator.rename_category(unallocated, "Bonus").unwrap_err();
    assert!(matches!(err, GradebookError::Validation(_)));
}

#[test]
fn rename_allows_case_change_and_rejects_collisions() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    let exams = category(&categories, "exams").uuid;

    let renamed = allocator.rename_category(exams, "Exams").unwrap();
    assert_eq!(renamed.name, "Exams");
    assert_close(renamed.weight, 0.7);

    let err = allocator.rename_category(exams, "homework").unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::DuplicateCategoryName(_))
    ));
    let err = allocator.rename_category(exams, "(holding)").unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::ReservedCategoryName(_))
    ));
}

#[test]
fn find_category_matches_names_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();

    let found = allocator.find_category(course, "  homework ").unwrap();
    assert_eq!(found.name, "Homework");
    assert_close(found.weight, 0.3);

    let err = allocator.find_category(course, "Quizzes").unwrap_err();
    assert!(matches!(
        err,
        GradebookError::NotFound(gradebook_core::NotFoundError::CategoryName { ref name, .. })
            if name == "Quizzes"
    ));
}

#[test]
fn removing_category_returns_weight_to_unallocated_by_default() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    let before = regular_total(&allocator.list_categories(course).unwrap());

    let exams = allocator.list_categories(course).unwrap()[0].uuid;
    allocator.update_category_weight(exams, 0.5).unwrap();
    let quiz = allocator.add_category(course, "Quiz", 0.2).unwrap();
    let removed = allocator.remove_category(quiz.uuid, false).unwrap();
    assert_eq!(removed.name, "Quiz");
    assert_close(removed.returned_weight, 0.2);

    let categories = allocator.list_categories(course).unwrap();
    assert_close(regular_total(&categories), before - 0.2);
    assert_close(weight_of(&categories, CategoryKind::Unallocated).unwrap(), 0.2);
    assert_invariant(&categories);
    assert!(calculator(&conn).validate_category_weights(course).unwrap());
}

#[test]
fn removing_category_under_drop_policy_discards_weight_until_normalized() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = dropping_allocator(&conn);
    allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    let exams = allocator.list_categories(course).unwrap()[0].uuid;
    allocator.update_category_weight(exams, 0.5).unwrap();
    let quiz = allocator.add_category(course, "Quiz", 0.2).unwrap();

    let removed = allocator.remove_category(quiz.uuid, false).unwrap();
    assert_eq!(removed.returned_weight, 0.0);

    let categories = allocator.list_categories(course).unwrap();
    assert_close(regular_total(&categories), 0.8);
    assert!(weight_of(&categories, CategoryKind::Unallocated).is_none());
    assert!(!calculator(&conn).validate_category_weights(course).unwrap());

    let outcome = allocator.normalize(course).unwrap();
    assert!(matches!(outcome, NormalizeOutcome::SlackSet { weight } if (weight - 0.2).abs() < TOLERANCE));
    assert_invariant(&allocator.list_categories(course).unwrap());
}

#[test]
fn removing_with_preserve_parks_assignments_in_zero_weight_sink() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    let homework = category(&categories, "Homework");
    add_assignment(&conn, course, homework, "HW1");
    add_assignment(&conn, course, homework, "HW2");

    let removed = allocator.remove_category(homework.uuid, true).unwrap();
    assert_eq!(removed.affected_assignments, 2);

    let repo = SqliteCategoryRepository::try_new(&conn).unwrap();
    let sink = repo
        .find_synthetic(course, CategoryKind::Unassigned)
        .unwrap()
        .unwrap();
    assert_eq!(sink.name, "Unassigned");
    assert_eq!(sink.weight, 0.0);
    assert_eq!(repo.fetch_assignments(sink.uuid).unwrap().len(), 2);

    let categories = allocator.list_categories(course).unwrap();
    assert_invariant(&categories);
    assert!(calculator(&conn).validate_category_weights(course).unwrap());
    // Sink data does not count toward the grade.
    assert_eq!(calculator(&conn).course_grade(course).unwrap(), 0.0);

    // A second preserved removal reuses the same sink.
    let exams = category(&categories, "Exams");
    add_assignment(&conn, course, exams, "Midterm");
    allocator.remove_category(exams.uuid, true).unwrap();
    let sink_again = repo
        .find_synthetic(course, CategoryKind::Unassigned)
        .unwrap()
        .unwrap();
    assert_eq!(sink_again.uuid, sink.uuid);
    assert_eq!(repo.fetch_assignments(sink.uuid).unwrap().len(), 3);
}

#[test]
fn removing_without_preserve_deletes_assignments() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    let homework = category(&categories, "Homework");
    add_assignment(&conn, course, homework, "HW1");

    let removed = allocator.remove_category(homework.uuid, false).unwrap();
    assert_eq!(removed.affected_assignments, 1);
    let remaining = SqliteAssignmentRepository::try_new(&conn)
        .unwrap()
        .list_course_assignments(course)
        .unwrap();
    assert!(remaining.is_empty());
}

#[test]
fn unassigned_sink_can_only_be_removed_with_its_assignments() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    add_assignment(&conn, course, category(&categories, "Homework"), "HW1");
    allocator
        .remove_category(category(&categories, "Homework").uuid, true)
        .unwrap();
    let sink = allocator
        .list_categories(course)
        .unwrap()
        .into_iter()
        .find(|c| c.kind == CategoryKind::Unassigned)
        .unwrap();

    allocator.remove_category(sink.uuid, true).unwrap_err();
    let removed = allocator.remove_category(sink.uuid, false).unwrap();
    assert_eq!(removed.affected_assignments, 1);
    assert_eq!(removed.returned_weight, 0.0);
    assert_invariant(&allocator.list_categories(course).unwrap());
}

#[test]
fn normalize_is_idempotent_for_under_allocated_course() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = dropping_allocator(&conn);
    let categories = allocator
        .replace_categories(course, &[("Exams", 0.5), ("Labs", 0.25), ("Quiz", 0.25)], false)
        .unwrap();
    allocator
        .remove_category(category(&categories, "Quiz").uuid, false)
        .unwrap();

    let first = allocator.normalize(course).unwrap();
    let after_first = allocator.list_categories(course).unwrap();
    let second = allocator.normalize(course).unwrap();
    let after_second = allocator.list_categories(course).unwrap();

    assert!(matches!(first, NormalizeOutcome::SlackSet { .. }));
    assert_eq!(second, NormalizeOutcome::Unchanged);
    assert_eq!(after_first, after_second);
    assert_invariant(&after_second);
}

#[test]
fn normalize_rescales_over_allocated_weights() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    for (name, weight) in [("Exams", 0.6), ("Homework", 0.6)] {
        conn.execute(
            "INSERT INTO categories (uuid, course_uuid, name, kind, weight)
             VALUES (?1, ?2, ?3, 'regular', ?4);",
            params![uuid::Uuid::new_v4().to_string(), course.to_string(), name, weight],
        )
        .unwrap();
    }
    let allocator = allocator(&conn);
    assert!(!calculator(&conn).validate_category_weights(course).unwrap());

    let outcome = allocator.normalize(course).unwrap();
    assert!(matches!(outcome, NormalizeOutcome::Rescaled { factor } if (factor - 1.0 / 1.2).abs() < 1e-9));
    let categories = allocator.list_categories(course).unwrap();
    assert_close(category(&categories, "Exams").weight, 0.5);
    assert_close(category(&categories, "Homework").weight, 0.5);
    assert_invariant(&categories);

    assert_eq!(allocator.normalize(course).unwrap(), NormalizeOutcome::Unchanged);
    assert_eq!(allocator.list_categories(course).unwrap(), categories);
}

#[test]
fn normalize_drops_stray_unallocated_row() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);
    allocator
        .replace_categories(course, &[("Exams", 1.0)], false)
        .unwrap();
    conn.execute(
        "INSERT INTO categories (uuid, course_uuid, name, kind, weight)
         VALUES (?1, ?2, 'Unallocated', 'unallocated', 0.2);",
        params![uuid::Uuid::new_v4().to_string(), course.to_string()],
    )
    .unwrap();

    assert_eq!(allocator.normalize(course).unwrap(), NormalizeOutcome::SlackRemoved);
    let categories = allocator.list_categories(course).unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(allocator.normalize(course).unwrap(), NormalizeOutcome::Unchanged);
}

#[test]
fn normalize_all_repairs_every_course() {
    let conn = open_db_in_memory().unwrap();
    let first = create_course(&conn, "CHM343");
    let second = create_course(&conn, "PHY101");
    let allocator = dropping_allocator(&conn);
    let categories = allocator
        .replace_categories(first, &[("Exams", 0.7), ("Homework", 0.3)], false)
        .unwrap();
    allocator
        .remove_category(category(&categories, "Homework").uuid, false)
        .unwrap();
    allocator
        .replace_categories(second, &[("Labs", 1.0)], false)
        .unwrap();

    let outcomes = allocator.normalize_all().unwrap();
    assert_eq!(outcomes.len(), 2);
    let first_outcome = outcomes.iter().find(|(id, _)| *id == first).unwrap().1;
    let second_outcome = outcomes.iter().find(|(id, _)| *id == second).unwrap().1;
    assert!(matches!(first_outcome, NormalizeOutcome::SlackSet { .. }));
    assert_eq!(second_outcome, NormalizeOutcome::Unchanged);
    assert_invariant(&allocator.list_categories(first).unwrap());
}

#[test]
fn failed_transaction_rolls_back_every_statement() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let repo = SqliteCategoryRepository::try_new(&conn).unwrap();

    let result: Result<(), GradebookError> = repo.with_transaction(|repo| {
        repo.upsert_category(&Category::regular(course, "Exams", 0.6, 0)?)?;
        repo.upsert_category(&Category::synthetic(course, SyntheticKind::Unallocated, 0.4))?;
        Err(GradebookError::InsufficientSlack {
            requested: 1.0,
            available: 0.4,
        })
    });

    assert!(result.is_err());
    assert!(repo.fetch_categories(course).unwrap().is_empty());
}

#[test]
fn invariant_holds_across_mixed_operation_sequence() {
    let conn = open_db_in_memory().unwrap();
    let course = create_course(&conn, "CHM343");
    let allocator = allocator(&conn);

    allocator.add_category(course, "Exams", 0.4).unwrap();
    assert_invariant(&allocator.list_categories(course).unwrap());
    let homework = allocator.add_category(course, "Homework", 0.3).unwrap();
    assert_invariant(&allocator.list_categories(course).unwrap());
    let labs = allocator.add_category(course, "Labs", 0.2).unwrap();
    assert_invariant(&allocator.list_categories(course).unwrap());
    allocator.update_category_weight(homework.uuid, 0.35).unwrap();
    assert_invariant(&allocator.list_categories(course).unwrap());
    allocator.update_category_weight(labs.uuid, 0.1).unwrap();
    assert_invariant(&allocator.list_categories(course).unwrap());
    allocator.remove_category(homework.uuid, true).unwrap();
    assert_invariant(&allocator.list_categories(course).unwrap());
    allocator.add_category(course, "Project", 0.3).unwrap();
    let categories = allocator.list_categories(course).unwrap();
    assert_invariant(&categories);
    assert_close(weight_of(&categories, CategoryKind::Unallocated).unwrap(), 0.2);
    let _ = allocator.normalize(course).unwrap();
    assert_invariant(&allocator.list_categories(course).unwrap());
}
