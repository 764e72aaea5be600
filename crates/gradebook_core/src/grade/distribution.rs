//! Letter-band distribution and score statistics over assignments.

use super::scoring::assignment_percentage;
use crate::error::GradebookResult;
use crate::model::assignment::Assignment;
use serde::Serialize;

/// Letter band an assignment percentage falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LetterBand {
    A,
    B,
    C,
    D,
    F,
}

impl LetterBand {
    /// All bands from best to worst.
    pub const ALL: [LetterBand; 5] = [Self::A, Self::B, Self::C, Self::D, Self::F];

    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Self::A
        } else if percentage >= 80.0 {
            Self::B
        } else if percentage >= 70.0 {
            Self::C
        } else if percentage >= 60.0 {
            Self::D
        } else {
            Self::F
        }
    }

    pub fn range_label(self) -> &'static str {
        match self {
            Self::A => "A (90-100)",
            Self::B => "B (80-89)",
            Self::C => "C (70-79)",
            Self::D => "D (60-69)",
            Self::F => "F (0-59)",
        }
    }
}

/// Count of assignments per letter band, best band first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeDistribution {
    pub bands: Vec<(LetterBand, usize)>,
    pub total: usize,
}

impl GradeDistribution {
    pub fn count(&self, band: LetterBand) -> usize {
        self.bands
            .iter()
            .find(|(current, _)| *current == band)
            .map_or(0, |(_, count)| *count)
    }

    /// Share of assignments in `band`, in percent; 0 when empty.
    pub fn share(&self, band: LetterBand) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(band) as f64 / self.total as f64 * 100.0
    }
}

/// Buckets assignment percentages into letter bands.
pub fn grade_distribution(assignments: &[Assignment]) -> GradebookResult<GradeDistribution> {
    let mut counts = [0usize; 5];
    for assignment in assignments {
        let band = LetterBand::for_percentage(assignment_percentage(assignment)?);
        if let Some(index) = LetterBand::ALL.iter().position(|current| *current == band) {
            counts[index] += 1;
        }
    }

    Ok(GradeDistribution {
        bands: LetterBand::ALL.into_iter().zip(counts).collect(),
        total: assignments.len(),
    })
}

/// Summary statistics of assignment percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Percentage of the most recently created assignment.
    pub latest: f64,
}

/// Returns `None` for an empty slice.
pub fn score_summary(assignments: &[Assignment]) -> GradebookResult<Option<ScoreSummary>> {
    let mut latest: Option<(i64, f64)> = None;
    let mut percentages = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let percentage = assignment_percentage(assignment)?;
        if latest.map_or(true, |(created_at, _)| assignment.created_at >= created_at) {
            latest = Some((assignment.created_at, percentage));
        }
        percentages.push(percentage);
    }

    let Some((_, latest)) = latest else {
        return Ok(None);
    };
    let count = percentages.len();
    let mean = percentages.iter().sum::<f64>() / count as f64;
    let min = percentages.iter().copied().fold(f64::INFINITY, f64::min);
    let max = percentages.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(Some(ScoreSummary {
        count,
        mean,
        min,
        max,
        latest,
    }))
}
