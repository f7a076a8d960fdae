use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{NaiveDateTime, Datelike};

use crate::calc::TIMESTAMP_FORMAT;
use crate::catalog::Catalog;
use crate::models::{CgpaSummary, CourseStat, HistogramBin, Submission, TierCount, TimeBuckets};

pub const CGPA_BINS: [f64; 7] = [0.0, 2.0, 2.5, 3.0, 3.5, 3.75, 4.0];
pub const BIN_LABELS: [&str; 6] = ["0-2.0", "2.0-2.5", "2.5-3.0", "3.0-3.5", "3.5-3.75", "3.75-4.0"];

const TIERS: [(&str, f64); 5] = [
    ("Outstanding (3.75-4.0)", 3.75),
    ("Excellent (3.5-3.75)", 3.5),
    ("Very Good (3.0-3.5)", 3.0),
    ("Good (2.5-3.0)", 2.5),
    ("Satisfactory (2.0-2.5)", 2.0),
];
const POOR_TIER: &str = "Poor (<2.0)";

fn numeric_cgpas(rows: &[Submission]) -> Vec<f64> {
    rows.iter().filter_map(|row| row.cgpa).collect()
}

pub fn cgpa_summary(rows: &[Submission]) -> Option<CgpaSummary> {
    let values = numeric_cgpas(rows);
    if values.is_empty() {
        return None;
    }

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    let std_dev = if count > 1 {
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };

    Some(CgpaSummary {
        count,
        mean,
        max,
        min,
        std_dev,
    })
}

/// Fixed-bin distribution over the CGPA scale. Bins are `(lo, hi]` with the
/// overall lowest bound inclusive, so 2.0 falls in `0-2.0` and 2.5 falls in
/// `2.0-2.5`. Values outside the scale are not counted.
pub fn histogram(rows: &[Submission]) -> Vec<HistogramBin> {
    let mut counts = [0usize; BIN_LABELS.len()];
    for value in numeric_cgpas(rows) {
        for i in 0..BIN_LABELS.len() {
            let lo = CGPA_BINS[i];
            let hi = CGPA_BINS[i + 1];
            let above_lo = if i == 0 { value >= lo } else { value > lo };
            if above_lo && value <= hi {
                counts[i] += 1;
                break;
            }
        }
    }

    BIN_LABELS
        .iter()
        .zip(counts)
        .map(|(label, count)| HistogramBin { label, count })
        .collect()
}

/// Named performance tiers, lower-bound inclusive (Outstanding >= 3.75 down
/// to Poor < 2.0).
pub fn tier_counts(rows: &[Submission]) -> Vec<TierCount> {
    let values = numeric_cgpas(rows);
    let mut result = Vec::with_capacity(TIERS.len() + 1);
    let mut ceiling = f64::INFINITY;

    for (label, floor) in TIERS {
        let count = values.iter().filter(|&&v| v >= floor && v < ceiling).count();
        result.push(TierCount { label, count });
        ceiling = floor;
    }

    result.push(TierCount {
        label: POOR_TIER,
        count: values.iter().filter(|&&v| v < ceiling).count(),
    });
    result
}

/// Per-course average over numeric cells only; dropped and unparseable
/// cells count toward the dropped column. Courses nobody has a grade for
/// are left out, matching the dashboard's course table.
pub fn course_breakdown(catalog: &Catalog, rows: &[Submission]) -> Vec<CourseStat> {
    let mut stats = Vec::new();
    for (idx, course) in catalog.courses().iter().enumerate() {
        let points: Vec<f64> = rows
            .iter()
            .filter_map(|row| row.grades.get(idx).and_then(|cell| cell.points()))
            .collect();
        if points.is_empty() {
            continue;
        }
        stats.push(CourseStat {
            course: course.name.clone(),
            average: points.iter().sum::<f64>() / points.len() as f64,
            enrolled: points.len(),
            dropped: rows.len() - points.len(),
        });
    }
    stats
}

/// Submission counts by calendar day and by calendar month. Rows whose
/// timestamp does not parse are skipped; if none parse the whole breakdown
/// is unavailable.
pub fn time_buckets(rows: &[Submission]) -> Option<TimeBuckets> {
    let mut daily: BTreeMap<chrono::NaiveDate, usize> = BTreeMap::new();
    let mut monthly: BTreeMap<String, usize> = BTreeMap::new();

    for row in rows {
        let Ok(stamp) = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT) else {
            continue;
        };
        let date = stamp.date();
        *daily.entry(date).or_insert(0) += 1;
        *monthly
            .entry(format!("{:04}-{:02}", date.year(), date.month()))
            .or_insert(0) += 1;
    }

    if daily.is_empty() {
        return None;
    }

    Some(TimeBuckets {
        daily: daily.into_iter().collect(),
        monthly: monthly.into_iter().collect(),
    })
}

/// Plain-text statistics report for download; mirrors the dashboard's
/// summary block.
pub fn build_report(
    catalog: &Catalog,
    rows: &[Submission],
    generated_at: NaiveDateTime,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "CGPA DATABASE REPORT");
    let _ = writeln!(
        output,
        "Generated on: {}",
        generated_at.format(TIMESTAMP_FORMAT)
    );
    let _ = writeln!(output);

    let Some(summary) = cgpa_summary(rows) else {
        let _ = writeln!(output, "No student data available.");
        return output;
    };

    let _ = writeln!(output, "SUMMARY STATISTICS:");
    let _ = writeln!(output, "- Total Students: {}", rows.len());
    let _ = writeln!(output, "- Average CGPA: {:.2}", summary.mean);
    let _ = writeln!(output, "- Highest CGPA: {:.2}", summary.max);
    let _ = writeln!(output, "- Lowest CGPA: {:.2}", summary.min);
    let _ = writeln!(output, "- Standard Deviation: {:.2}", summary.std_dev);

    let _ = writeln!(output);
    let _ = writeln!(output, "PERFORMANCE DISTRIBUTION:");
    for tier in tier_counts(rows) {
        let _ = writeln!(output, "- {}: {} students", tier.label, tier.count);
    }

    let courses = course_breakdown(catalog, rows);
    if !courses.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "COURSE AVERAGES:");
        for stat in &courses {
            let _ = writeln!(
                output,
                "- {}: average GPA {:.2} ({} enrolled, {} dropped)",
                stat.course, stat.average, stat.enrolled, stat.dropped
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "SUBMISSIONS BY MONTH:");
    match time_buckets(rows) {
        Some(buckets) => {
            for (month, count) in &buckets.monthly {
                let _ = writeln!(output, "- {month}: {count}");
            }
        }
        None => {
            let _ = writeln!(output, "Unable to process time data.");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GradeCell;

    fn row_with_cgpa(cgpa: Option<f64>) -> Submission {
        Submission {
            registration_number: "2020338027".to_string(),
            name: "Avery Lee".to_string(),
            timestamp: "2026-08-24 09:30:00".to_string(),
            grades: vec![GradeCell::Dropped],
            cgpa,
            total_credits: 0.0,
            courses_taken: 0,
            courses_dropped: 1,
        }
    }

    fn rows_with_cgpas(values: &[f64]) -> Vec<Submission> {
        values.iter().map(|&v| row_with_cgpa(Some(v))).collect()
    }

    #[test]
    fn summary_reports_no_data_for_empty_table() {
        assert!(cgpa_summary(&[]).is_none());
        assert!(cgpa_summary(&[row_with_cgpa(None)]).is_none());
    }

    #[test]
    fn summary_statistics_over_numeric_cgpas_only() {
        let mut rows = rows_with_cgpas(&[2.0, 4.0, 3.0]);
        rows.push(row_with_cgpa(None));

        let summary = cgpa_summary(&rows).unwrap();
        assert_eq!(summary.count, 3);
        assert!((summary.mean - 3.0).abs() < 1e-9);
        assert_eq!(summary.max, 4.0);
        assert_eq!(summary.min, 2.0);
        // sample standard deviation of {2, 3, 4}
        assert!((summary.std_dev - 1.0).abs() < 1e-9);
    }

    #[test]
    fn histogram_assigns_every_bin_boundary() {
        let expected = [
            (0.0, "0-2.0"),
            (2.0, "0-2.0"),
            (2.5, "2.0-2.5"),
            (3.0, "2.5-3.0"),
            (3.5, "3.0-3.5"),
            (3.75, "3.5-3.75"),
            (4.0, "3.75-4.0"),
        ];
        for (value, label) in expected {
            let bins = histogram(&rows_with_cgpas(&[value]));
            let hit: Vec<&str> = bins
                .iter()
                .filter(|b| b.count == 1)
                .map(|b| b.label)
                .collect();
            assert_eq!(hit, vec![label], "CGPA {value} landed in the wrong bin");
        }
    }

    #[test]
    fn histogram_counts_interior_values() {
        let rows = rows_with_cgpas(&[1.0, 2.3, 2.3, 3.8]);
        let bins = histogram(&rows);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[1].count, 2);
        assert_eq!(bins[5].count, 1);
        let total: usize = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn tiers_are_lower_bound_inclusive() {
        let rows = rows_with_cgpas(&[3.75, 3.5, 3.0, 2.5, 2.0, 1.99]);
        let tiers = tier_counts(&rows);
        let counts: Vec<(&str, usize)> = tiers.iter().map(|t| (t.label, t.count)).collect();
        assert_eq!(
            counts,
            vec![
                ("Outstanding (3.75-4.0)", 1),
                ("Excellent (3.5-3.75)", 1),
                ("Very Good (3.0-3.5)", 1),
                ("Good (2.5-3.0)", 1),
                ("Satisfactory (2.0-2.5)", 1),
                ("Poor (<2.0)", 1),
            ]
        );
    }

    #[test]
    fn course_breakdown_skips_non_numeric_cells() {
        let catalog = Catalog::new(vec![crate::models::Course {
            key: "A".to_string(),
            name: "Course A".to_string(),
            credit: 3.0,
        }])
        .unwrap();

        let cell = |g: GradeCell| Submission {
            grades: vec![g],
            ..row_with_cgpa(Some(3.0))
        };
        let rows = vec![
            cell(GradeCell::from_points(4.0)),
            cell(GradeCell::from_points(3.0)),
            cell(GradeCell::Dropped),
            cell(GradeCell::Raw("garbage".to_string())),
        ];

        let stats = course_breakdown(&catalog, &rows);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].enrolled, 2);
        assert_eq!(stats[0].dropped, 2);
        assert!((stats[0].average - 3.5).abs() < 1e-9);
    }

    #[test]
    fn course_with_no_grades_is_left_out() {
        let catalog = Catalog::new(vec![crate::models::Course {
            key: "A".to_string(),
            name: "Course A".to_string(),
            credit: 3.0,
        }])
        .unwrap();
        let rows = vec![row_with_cgpa(Some(3.0))];
        assert!(course_breakdown(&catalog, &rows).is_empty());
    }

    #[test]
    fn time_buckets_group_by_day_and_month() {
        let stamped = |ts: &str| Submission {
            timestamp: ts.to_string(),
            ..row_with_cgpa(Some(3.0))
        };
        let rows = vec![
            stamped("2026-08-24 09:30:00"),
            stamped("2026-08-24 17:00:00"),
            stamped("2026-07-01 08:00:00"),
            stamped("not a timestamp"),
        ];

        let buckets = time_buckets(&rows).unwrap();
        assert_eq!(buckets.daily.len(), 2);
        assert_eq!(buckets.daily[1].1, 2);
        assert_eq!(
            buckets.monthly,
            vec![("2026-07".to_string(), 1), ("2026-08".to_string(), 2)]
        );
    }

    #[test]
    fn time_buckets_degrade_to_unavailable() {
        let bad = Submission {
            timestamp: "yesterday".to_string(),
            ..row_with_cgpa(Some(3.0))
        };
        assert!(time_buckets(&[bad]).is_none());
        assert!(time_buckets(&[]).is_none());
    }

    #[test]
    fn report_renders_even_with_bad_timestamps() {
        let catalog = Catalog::default_term();
        let mut row = row_with_cgpa(Some(3.2));
        row.timestamp = "garbage".to_string();
        row.grades = vec![GradeCell::Dropped; catalog.len()];

        let generated_at = chrono::NaiveDate::from_ymd_opt(2026, 8, 24)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let report = build_report(&catalog, &[row], generated_at);

        assert!(report.contains("SUMMARY STATISTICS:"));
        assert!(report.contains("- Total Students: 1"));
        assert!(report.contains("Unable to process time data."));
    }

    #[test]
    fn report_for_empty_table_says_no_data() {
        let catalog = Catalog::default_term();
        let generated_at = chrono::NaiveDate::from_ymd_opt(2026, 8, 24)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let report = build_report(&catalog, &[], generated_at);
        assert!(report.contains("No student data available."));
    }
}
