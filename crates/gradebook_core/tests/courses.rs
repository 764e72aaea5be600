use gradebook_core::db::open_db_in_memory;
use gradebook_core::{
    Assignment, AssignmentRepository, CourseService, GradebookError, NotFoundError,
    SqliteAssignmentRepository, SqliteCategoryRepository, SqliteCourseRepository,
    ValidationError, WeightAllocator,
};
use rusqlite::Connection;

fn service(conn: &Connection) -> CourseService<SqliteCourseRepository<'_>> {
    CourseService::new(SqliteCourseRepository::try_new(conn).unwrap())
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn add_course_trims_and_persists() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let course = service
        .add_course(" CHM343 ", "Organic Chemistry", "Fall 2024", 4)
        .unwrap();
    assert_eq!(course.code, "CHM343");
    assert_eq!(course.credit_hours, 4);
    assert_eq!(service.get_course(course.uuid).unwrap(), course);
}

#[test]
fn duplicate_code_and_term_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service
        .add_course("CHM343", "Organic Chemistry", "Fall 2024", 3)
        .unwrap();

    let err = service
        .add_course("CHM343", "Organic Chemistry II", "Fall 2024", 3)
        .unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::DuplicateCourse { .. })
    ));
    service
        .add_course("CHM343", "Organic Chemistry", "Spring 2025", 3)
        .unwrap();
    assert_eq!(service.list_courses().unwrap().len(), 2);
}

#[test]
fn blank_fields_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let err = service(&conn).add_course("  ", "Title", "Fall", 3).unwrap_err();
    assert!(matches!(
        err,
        GradebookError::Validation(ValidationError::BlankField(_))
    ));
}

#[test]
fn find_course_requires_term_when_code_is_ambiguous() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service.add_course("CHM343", "Chem", "Fall 2024", 3).unwrap();
    let spring = service.add_course("CHM343", "Chem", "Spring 2025", 3).unwrap();
    let physics = service.add_course("PHY101", "Physics", "Fall 2024", 3).unwrap();

    assert_eq!(service.find_course("PHY101", None).unwrap().uuid, physics.uuid);
    assert_eq!(
        service.find_course("CHM343", Some("Spring 2025")).unwrap().uuid,
        spring.uuid
    );

    match service.find_course("CHM343", None).unwrap_err() {
        GradebookError::Validation(ValidationError::AmbiguousCourse { code, terms }) => {
            assert_eq!(code, "CHM343");
            assert_eq!(terms.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = service.find_course("CHM343", Some("Summer 2025")).unwrap_err();
    assert!(matches!(
        err,
        GradebookError::NotFound(NotFoundError::CourseCode { term: Some(_), .. })
    ));
    let err = service.find_course("BIO200", None).unwrap_err();
    assert_eq!(err.to_string(), "course 'BIO200' not found");
}

#[test]
fn remove_course_cascades_to_categories_and_assignments() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let course = service.add_course("CHM343", "Chem", "Fall 2024", 3).unwrap();
    let categories = WeightAllocator::new(SqliteCategoryRepository::try_new(&conn).unwrap())
        .replace_categories(course.uuid, &[("Exams", 1.0)], false)
        .unwrap();
    SqliteAssignmentRepository::try_new(&conn)
        .unwrap()
        .create_assignment(
            &Assignment::new(course.uuid, categories[0].uuid, "Midterm", 100.0, 90.0).unwrap(),
        )
        .unwrap();

    service.remove_course(course.uuid).unwrap();

    assert_eq!(count_rows(&conn, "courses"), 0);
    assert_eq!(count_rows(&conn, "categories"), 0);
    assert_eq!(count_rows(&conn, "assignments"), 0);
    let err = service.remove_course(course.uuid).unwrap_err();
    assert!(matches!(err, GradebookError::NotFound(NotFoundError::Course(_))));
}
