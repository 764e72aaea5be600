//! Cross-course score summaries, grouped by term.

use super::distribution::ScoreSummary;
use crate::model::course::Course;
use serde::Serialize;
use std::cmp::Ordering;

/// Score statistics of one course; `summary` is `None` without assignments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
    pub course: Course,
    pub summary: Option<ScoreSummary>,
}

/// Assignment-weighted average of every course in one term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermSummary {
    pub term: String,
    pub course_count: usize,
    pub assignment_count: usize,
    /// Mean of all assignment percentages in the term.
    pub average: Option<f64>,
}

/// Term descending, then title, then code.
pub fn summary_order(left: &CourseSummary, right: &CourseSummary) -> Ordering {
    right
        .course
        .term
        .cmp(&left.course.term)
        .then_with(|| left.course.title.cmp(&right.course.title))
        .then_with(|| left.course.code.cmp(&right.course.code))
}

/// Folds course summaries into one row per term, term descending.
pub fn term_summaries(courses: &[CourseSummary]) -> Vec<TermSummary> {
    let mut terms: Vec<(TermSummary, f64)> = Vec::new();
    for entry in courses {
        let index = match terms
            .iter()
            .position(|(term, _)| term.term == entry.course.term)
        {
            Some(index) => index,
            None => {
                terms.push((
                    TermSummary {
                        term: entry.course.term.clone(),
                        course_count: 0,
                        assignment_count: 0,
                        average: None,
                    },
                    0.0,
                ));
                terms.len() - 1
            }
        };
        let (term, percent_sum) = &mut terms[index];
        term.course_count += 1;
        if let Some(summary) = &entry.summary {
            term.assignment_count += summary.count;
            *percent_sum += summary.mean * summary.count as f64;
        }
    }

    let mut terms: Vec<TermSummary> = terms
        .into_iter()
        .map(|(mut term, percent_sum)| {
            if term.assignment_count > 0 {
                term.average = Some(percent_sum / term.assignment_count as f64);
            }
            term
        })
        .collect();
    terms.sort_by(|left, right| right.term.cmp(&left.term));
    terms
}
