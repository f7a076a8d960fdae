use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::catalog::Catalog;
use crate::models::{Breakdown, BreakdownLine, GradeCell, Submission};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Every catalog course was left blank, so there is nothing to average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoCoursesIncluded;

impl std::fmt::Display for NoCoursesIncluded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no course data provided, enter a grade for at least one course"
        )
    }
}

impl std::error::Error for NoCoursesIncluded {}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone)]
pub struct Computed {
    pub submission: Submission,
    pub breakdown: Breakdown,
}

/// Credit-weighted average over the entered courses. Grade range checking
/// happens at the input boundary, not here.
pub fn compute(
    catalog: &Catalog,
    entries: &HashMap<String, f64>,
    registration_number: &str,
    name: &str,
    submitted_at: NaiveDateTime,
) -> Result<Computed, NoCoursesIncluded> {
    let mut grades = Vec::with_capacity(catalog.len());
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    let mut weighted_sum = 0.0;
    let mut total_credits = 0.0;

    // Accumulate in catalog order so the result does not depend on the
    // order courses were entered.
    for course in catalog.courses() {
        match entries.get(&course.key) {
            Some(&points) => {
                let weighted = points * course.credit;
                weighted_sum += weighted;
                total_credits += course.credit;
                grades.push(GradeCell::from_points(points));
                included.push(BreakdownLine {
                    course: course.name.clone(),
                    credit: course.credit,
                    points,
                    weighted,
                });
            }
            None => {
                grades.push(GradeCell::Dropped);
                excluded.push(course.name.clone());
            }
        }
    }

    if total_credits <= 0.0 {
        return Err(NoCoursesIncluded);
    }

    let cgpa_unrounded = weighted_sum / total_credits;
    let submission = Submission {
        registration_number: registration_number.to_string(),
        name: name.to_string(),
        timestamp: submitted_at.format(TIMESTAMP_FORMAT).to_string(),
        grades,
        cgpa: Some(round2(cgpa_unrounded)),
        total_credits,
        courses_taken: included.len(),
        courses_dropped: excluded.len(),
    };

    Ok(Computed {
        submission,
        breakdown: Breakdown {
            included,
            excluded,
            weighted_sum,
            total_credits,
            cgpa_unrounded,
        },
    })
}
