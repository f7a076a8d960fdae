use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Stable column identifier, decoupled from the display name.
    pub key: String,
    pub name: String,
    pub credit: f64,
}

/// One per-course cell as stored in the data file. Numeric cells keep
/// their source text so rewriting the table never reformats a value that
/// came from an imported file.
#[derive(Debug, Clone, PartialEq)]
pub enum GradeCell {
    Points { value: f64, text: String },
    Dropped,
    /// Unparseable cell read from an imported file; excluded from averages.
    Raw(String),
}

impl GradeCell {
    pub fn from_points(value: f64) -> Self {
        GradeCell::Points {
            value,
            text: format!("{value:.2}"),
        }
    }

    pub fn points(&self) -> Option<f64> {
        match self {
            GradeCell::Points { value, .. } => Some(*value),
            _ => None,
        }
    }
}

impl std::fmt::Display for GradeCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeCell::Points { text, .. } => write!(f, "{text}"),
            GradeCell::Dropped => write!(f, "Dropped"),
            GradeCell::Raw(text) => write!(f, "{text}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub registration_number: String,
    pub name: String,
    /// Kept as text so a bad value only degrades the time analysis.
    pub timestamp: String,
    /// One cell per catalog course, in catalog order.
    pub grades: Vec<GradeCell>,
    pub cgpa: Option<f64>,
    pub total_credits: f64,
    pub courses_taken: usize,
    pub courses_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct BreakdownLine {
    pub course: String,
    pub credit: f64,
    pub points: f64,
    pub weighted: f64,
}

/// Per-course contributions backing the displayed CGPA formula.
#[derive(Debug, Clone)]
pub struct Breakdown {
    pub included: Vec<BreakdownLine>,
    pub excluded: Vec<String>,
    pub weighted_sum: f64,
    pub total_credits: f64,
    pub cgpa_unrounded: f64,
}

#[derive(Debug, Clone)]
pub struct CgpaSummary {
    pub count: usize,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone)]
pub struct HistogramBin {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct TierCount {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct CourseStat {
    pub course: String,
    pub average: f64,
    pub enrolled: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone)]
pub struct TimeBuckets {
    pub daily: Vec<(chrono::NaiveDate, usize)>,
    /// Month key is `YYYY-MM`.
    pub monthly: Vec<(String, usize)>,
}
