//! Category weight allocator.
//!
//! # Responsibility
//! - Perform every mutation of category weights.
//! - Keep each course's weight-bearing categories summing to 1.0, using the
//!   Unallocated row as the slack buffer.
//!
//! # Invariants
//! - Every operation validates input before opening a transaction and runs
//!   all of its writes inside one transaction.
//! - Unallocated exists only while slack is above `WEIGHT_EPSILON`.
//! - Assignments are never left pointing at a deleted category.
//! - A course with no weight-bearing category is "fresh": all 100% of its
//!   weight counts as slack.

use crate::error::{GradebookError, GradebookResult};
use crate::model::category::{
    validate_category_name, validate_weight, Category, CategoryId, CategoryKind,
    SyntheticKind,
};
use crate::model::course::CourseId;
use crate::model::validation::ValidationError;
use crate::model::weight::{
    approx_eq, is_full_allocation, total_weight, FULL_WEIGHT, WEIGHT_EPSILON,
};
use crate::repo::category_repo::CategoryRepository;
use crate::repo::NotFoundError;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// What `remove_category` does with the removed category's weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreedWeightPolicy {
    /// Credit the weight back to Unallocated; the course stays at 100%.
    #[default]
    ReturnToUnallocated,
    /// Discard the weight; run `normalize` later to repair the course.
    Drop,
}

impl FromStr for FreedWeightPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "return" | "return_to_unallocated" => Ok(Self::ReturnToUnallocated),
            "drop" => Ok(Self::Drop),
            other => Err(format!(
                "unsupported freed-weight policy `{other}`; expected return|drop"
            )),
        }
    }
}

impl Display for FreedWeightPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReturnToUnallocated => write!(f, "return"),
            Self::Drop => write!(f, "drop"),
        }
    }
}

/// Result of removing one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemovedCategory {
    pub name: String,
    /// Assignments moved to Unassigned, or deleted.
    pub affected_assignments: usize,
    /// Weight credited to Unallocated (0 under `FreedWeightPolicy::Drop`).
    pub returned_weight: f64,
}

/// What `normalize` changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NormalizeOutcome {
    Unchanged,
    /// Unallocated set (or created) to absorb the remainder.
    SlackSet { weight: f64 },
    /// Weights already summed to 1.0; a stray Unallocated row was removed.
    SlackRemoved,
    /// Over-allocated weights were scaled by `factor`.
    Rescaled { factor: f64 },
}

/// Invariant-preserving mutator of category weights.
pub struct WeightAllocator<R: CategoryRepository> {
    repo: R,
    freed_weight: FreedWeightPolicy,
}

impl<R: CategoryRepository> WeightAllocator<R> {
    /// Creates an allocator with the default freed-weight policy.
    pub fn new(repo: R) -> Self {
        Self::with_policy(repo, FreedWeightPolicy::default())
    }

    pub fn with_policy(repo: R, freed_weight: FreedWeightPolicy) -> Self {
        Self { repo, freed_weight }
    }

    pub fn freed_weight_policy(&self) -> FreedWeightPolicy {
        self.freed_weight
    }

    /// Lists a course's categories in display order.
    pub fn list_categories(&self, course: CourseId) -> GradebookResult<Vec<Category>> {
        ensure_course(&self.repo, course)?;
        Ok(self.repo.fetch_categories(course)?)
    }

    /// Case-insensitive name lookup; synthetic rows match their fixed names.
    pub fn find_category(&self, course: CourseId, name: &str) -> GradebookResult<Category> {
        ensure_course(&self.repo, course)?;
        self.repo
            .find_category_by_name(course, name)?
            .ok_or_else(|| {
                NotFoundError::CategoryName {
                    course,
                    name: name.trim().to_string(),
                }
                .into()
            })
    }

    /// Replaces every category of a course with `categories`.
    ///
    /// Weights must each be in `(0, 1]` and sum to 1.0. With
    /// `preserve_assignments`, existing assignments are parked in a holding
    /// row and then moved to the first new category (in the given order);
    /// otherwise they are deleted.
    pub fn replace_categories<S: AsRef<str>>(
        &self,
        course: CourseId,
        categories: &[(S, f64)],
        preserve_assignments: bool,
    ) -> GradebookResult<Vec<Category>> {
        let planned = plan_replacement(categories)?;

        let moved = self.repo.with_transaction(|repo| -> GradebookResult<usize> {
            ensure_course(repo, course)?;
            let existing = repo.fetch_categories(course)?;

            let mut holding: Option<Category> = None;
            let mut moved = 0;
            for category in &existing {
                if preserve_assignments {
                    if repo.fetch_assignments(category.uuid)?.is_empty() {
                        continue;
                    }
                    let target = match holding.take() {
                        Some(target) => target,
                        None => {
                            let row = Category::synthetic(course, SyntheticKind::Holding, 0.0);
                            repo.upsert_category(&row)?;
                            row
                        }
                    };
                    moved += repo.reassign_assignments(category.uuid, target.uuid)?;
                    holding = Some(target);
                } else {
                    repo.delete_assignments_in(category.uuid)?;
                }
            }

            for category in &existing {
                repo.delete_category(category.uuid)?;
            }

            let mut created = Vec::with_capacity(planned.len());
            for (index, (name, weight)) in planned.iter().enumerate() {
                let category = Category::regular(course, name, *weight, index as i64)?;
                repo.upsert_category(&category)?;
                created.push(category);
            }

            if let (Some(holding), Some(first)) = (holding, created.first()) {
                repo.reassign_assignments(holding.uuid, first.uuid)?;
                repo.delete_category(holding.uuid)?;
            }
            Ok(moved)
        })?;

        info!(
            "event=categories_replace module=allocator status=ok course_id={course} count={} preserved_assignments={moved}",
            planned.len()
        );
        Ok(self.repo.fetch_categories(course)?)
    }

    /// Adds one category, drawing its weight from Unallocated.
    ///
    /// A weight within `WEIGHT_EPSILON` of the available slack takes all of
    /// it, so the stored weight may differ from `weight` by that much.
    ///
    /// # Errors
    /// - `Validation` for reserved/duplicate names or weight outside
    ///   `(WEIGHT_EPSILON, 1]`.
    /// - `InsufficientSlack` when Unallocated holds less than `weight`,
    ///   including a fully allocated course with no Unallocated row.
    pub fn add_category(
        &self,
        course: CourseId,
        name: &str,
        weight: f64,
    ) -> GradebookResult<Category> {
        let name = validate_category_name(name)?;
        validate_weight(weight)?;

        let category = self.repo.with_transaction(|repo| -> GradebookResult<Category> {
            ensure_course(repo, course)?;
            if repo.find_category_by_name(course, &name)?.is_some() {
                return Err(ValidationError::DuplicateCategoryName(name.clone()).into());
            }

            let existing = repo.fetch_categories(course)?;
            let unallocated = find_kind(&existing, CategoryKind::Unallocated);
            let available = match unallocated {
                Some(slack) => slack.weight,
                None if is_fresh(&existing) => FULL_WEIGHT,
                None => 0.0,
            };
            if weight > available + WEIGHT_EPSILON {
                return Err(GradebookError::InsufficientSlack {
                    requested: weight,
                    available,
                });
            }
            let weight = if approx_eq(weight, available) {
                available
            } else {
                weight
            };

            settle_unallocated(repo, course, unallocated.cloned(), available - weight)?;
            let category = Category::regular(course, &name, weight, repo.next_sort_order(course)?)?;
            repo.upsert_category(&category)?;
            Ok(category)
        })?;

        info!(
            "event=category_add module=allocator status=ok course_id={course} category_id={} weight={}",
            category.uuid, category.weight
        );
        Ok(category)
    }

    /// Changes a regular category's weight, balancing through Unallocated.
    ///
    /// Decreases credit the difference to Unallocated (creating it if
    /// needed); increases debit Unallocated and fail when it cannot cover
    /// the difference. An increase within `WEIGHT_EPSILON` of the slack
    /// takes all of it. A change within `WEIGHT_EPSILON` of the current
    /// weight leaves the category untouched.
    pub fn update_category_weight(
        &self,
        category: CategoryId,
        new_weight: f64,
    ) -> GradebookResult<Category> {
        validate_weight(new_weight)?;

        let (updated, old_weight) = self.repo.with_transaction(|repo| -> GradebookResult<_> {
            let mut target = load_regular(repo, category)?;
            let old_weight = target.weight;
            if approx_eq(new_weight, old_weight) {
                return Ok((target, old_weight));
            }

            let unallocated = repo.find_synthetic(target.course_uuid, CategoryKind::Unallocated)?;
            let available = unallocated.as_ref().map_or(0.0, |slack| slack.weight);
            let increase = new_weight - old_weight;
            let new_weight = if increase <= 0.0 {
                new_weight
            } else if increase > available + WEIGHT_EPSILON {
                return Err(GradebookError::InsufficientSlack {
                    requested: increase,
                    available,
                });
            } else if approx_eq(increase, available) {
                old_weight + available
            } else {
                new_weight
            };

            settle_unallocated(
                repo,
                target.course_uuid,
                unallocated,
                available - (new_weight - old_weight),
            )?;
            target.weight = new_weight;
            repo.upsert_category(&target)?;
            Ok((target, old_weight))
        })?;

        info!(
            "event=category_weight_update module=allocator status=ok category_id={category} old_weight={old_weight} new_weight={}",
            updated.weight
        );
        Ok(updated)
    }

    /// Renames a regular category.
    pub fn rename_category(
        &self,
        category: CategoryId,
        new_name: &str,
    ) -> GradebookResult<Category> {
        let new_name = validate_category_name(new_name)?;

        let renamed = self.repo.with_transaction(|repo| -> GradebookResult<Category> {
            let mut target = load_regular(repo, category)?;
            if let Some(existing) = repo.find_category_by_name(target.course_uuid, &new_name)? {
                if existing.uuid != target.uuid {
                    return Err(ValidationError::DuplicateCategoryName(new_name.clone()).into());
                }
            }
            target.name = new_name.clone();
            repo.upsert_category(&target)?;
            Ok(target)
        })?;

        info!("event=category_rename module=allocator status=ok category_id={category}");
        Ok(renamed)
    }

    /// Removes a category.
    ///
    /// With `preserve_assignments`, its assignments move to the zero-weight
    /// Unassigned sink (created on demand); otherwise they are deleted. The
    /// freed weight follows this allocator's `FreedWeightPolicy`.
    ///
    /// The Unallocated row cannot be removed here; use `normalize`.
    pub fn remove_category(
        &self,
        category: CategoryId,
        preserve_assignments: bool,
    ) -> GradebookResult<RemovedCategory> {
        let policy = self.freed_weight;
        let removed = self.repo.with_transaction(|repo| -> GradebookResult<RemovedCategory> {
            let target = repo
                .get_category(category)?
                .ok_or(NotFoundError::Category(category))?;
            let removable = match target.kind {
                CategoryKind::Regular => true,
                CategoryKind::Unassigned => !preserve_assignments,
                CategoryKind::Unallocated | CategoryKind::Holding => false,
            };
            if !removable {
                return Err(ValidationError::SyntheticCategory(target.kind).into());
            }
            let course = target.course_uuid;

            let affected_assignments = if preserve_assignments {
                let count = repo.fetch_assignments(target.uuid)?.len();
                if count > 0 {
                    let sink = match repo.find_synthetic(course, CategoryKind::Unassigned)? {
                        Some(sink) => sink,
                        None => {
                            let sink = Category::synthetic(course, SyntheticKind::Unassigned, 0.0);
                            repo.upsert_category(&sink)?;
                            sink
                        }
                    };
                    repo.reassign_assignments(target.uuid, sink.uuid)?;
                }
                count
            } else {
                repo.delete_assignments_in(target.uuid)?
            };

            repo.delete_category(target.uuid)?;

            let returned_weight = match (target.kind, policy) {
                (CategoryKind::Regular, FreedWeightPolicy::ReturnToUnallocated) => {
                    let unallocated = repo.find_synthetic(course, CategoryKind::Unallocated)?;
                    let available = unallocated.as_ref().map_or(0.0, |slack| slack.weight);
                    settle_unallocated(repo, course, unallocated, available + target.weight)?;
                    target.weight
                }
                _ => 0.0,
            };

            Ok(RemovedCategory {
                name: target.name,
                affected_assignments,
                returned_weight,
            })
        })?;

        info!(
            "event=category_remove module=allocator status=ok category_id={category} preserve_assignments={preserve_assignments} affected={} freed_weight={policy}",
            removed.affected_assignments
        );
        Ok(removed)
    }

    /// Repairs a course's weights. Idempotent.
    ///
    /// - Regular weights sum to 1.0: drop any Unallocated row.
    /// - Sum below 1.0: set/create Unallocated to the remainder.
    /// - Sum above 1.0: scale every regular weight by `1/sum`, drop
    ///   Unallocated.
    /// - No regular categories: drop Unallocated (fresh course).
    pub fn normalize(&self, course: CourseId) -> GradebookResult<NormalizeOutcome> {
        let outcome = self.repo.with_transaction(|repo| -> GradebookResult<NormalizeOutcome> {
            ensure_course(repo, course)?;
            let categories = repo.fetch_categories(course)?;
            let unallocated = find_kind(&categories, CategoryKind::Unallocated).cloned();
            let regular: Vec<&Category> = categories
                .iter()
                .filter(|category| category.kind.is_regular())
                .collect();
            let total = total_weight(regular.iter().map(|category| category.weight));

            let outcome = if regular.is_empty() || is_full_allocation(total) {
                match unallocated {
                    Some(slack) => {
                        repo.delete_category(slack.uuid)?;
                        NormalizeOutcome::SlackRemoved
                    }
                    None => NormalizeOutcome::Unchanged,
                }
            } else if total < FULL_WEIGHT {
                let remainder = FULL_WEIGHT - total;
                match unallocated {
                    Some(slack) if approx_eq(slack.weight, remainder) => {
                        NormalizeOutcome::Unchanged
                    }
                    existing => {
                        settle_unallocated(repo, course, existing, remainder)?;
                        NormalizeOutcome::SlackSet { weight: remainder }
                    }
                }
            } else {
                let factor = FULL_WEIGHT / total;
                for category in regular {
                    let mut scaled = category.clone();
                    scaled.weight = category.weight * factor;
                    repo.upsert_category(&scaled)?;
                }
                if let Some(slack) = unallocated {
                    repo.delete_category(slack.uuid)?;
                }
                NormalizeOutcome::Rescaled { factor }
            };
            Ok(outcome)
        })?;

        info!("event=course_normalize module=allocator status=ok course_id={course} outcome={outcome:?}");
        Ok(outcome)
    }

    /// Runs `normalize` on every course, one transaction per course.
    ///
    /// Stops at the first failing course; earlier courses stay repaired.
    pub fn normalize_all(&self) -> GradebookResult<Vec<(CourseId, NormalizeOutcome)>> {
        let courses = self.repo.list_course_ids()?;
        let mut outcomes = Vec::with_capacity(courses.len());
        for course in courses {
            outcomes.push((course, self.normalize(course)?));
        }
        info!(
            "event=normalize_all module=allocator status=ok courses={}",
            outcomes.len()
        );
        Ok(outcomes)
    }
}

/// Validates a bulk replacement list; returns trimmed names with weights.
fn plan_replacement<S: AsRef<str>>(
    categories: &[(S, f64)],
) -> Result<Vec<(String, f64)>, ValidationError> {
    if categories.is_empty() {
        return Err(ValidationError::NoCategories);
    }

    let mut seen = HashSet::new();
    let mut planned = Vec::with_capacity(categories.len());
    for (name, weight) in categories {
        let name = validate_category_name(name.as_ref())?;
        validate_weight(*weight)?;
        if !seen.insert(name.to_lowercase()) {
            return Err(ValidationError::DuplicateCategoryName(name));
        }
        planned.push((name, *weight));
    }

    let total = total_weight(planned.iter().map(|(_, weight)| *weight));
    if !is_full_allocation(total) {
        return Err(ValidationError::WeightsDoNotSum { total });
    }
    Ok(planned)
}

/// Makes Unallocated hold exactly `slack`, deleting it when slack is
/// effectively zero (or negative within tolerance).
fn settle_unallocated<R: CategoryRepository>(
    repo: &R,
    course: CourseId,
    existing: Option<Category>,
    slack: f64,
) -> GradebookResult<()> {
    if slack <= WEIGHT_EPSILON {
        if let Some(row) = existing {
            repo.delete_category(row.uuid)?;
        }
        return Ok(());
    }

    let mut row =
        existing.unwrap_or_else(|| Category::synthetic(course, SyntheticKind::Unallocated, slack));
    row.weight = slack.min(FULL_WEIGHT);
    repo.upsert_category(&row)?;
    Ok(())
}

fn ensure_course<R: CategoryRepository>(repo: &R, course: CourseId) -> GradebookResult<()> {
    if !repo.course_exists(course)? {
        return Err(NotFoundError::Course(course).into());
    }
    Ok(())
}

fn load_regular<R: CategoryRepository>(repo: &R, id: CategoryId) -> GradebookResult<Category> {
    let category = repo
        .get_category(id)?
        .ok_or(NotFoundError::Category(id))?;
    if !category.kind.is_regular() {
        return Err(ValidationError::SyntheticCategory(category.kind).into());
    }
    Ok(category)
}

fn find_kind(categories: &[Category], kind: CategoryKind) -> Option<&Category> {
    categories.iter().find(|category| category.kind == kind)
}

fn is_fresh(categories: &[Category]) -> bool {
    !categories
        .iter()
        .any(|category| category.kind.counts_toward_weight())
}
