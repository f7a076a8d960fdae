use anyhow::bail;

use crate::catalog::Catalog;
use crate::models::Submission;
use crate::store;

/// Admin-view filter criteria. Unset fields impose no restriction; set
/// fields combine with logical AND.
#[derive(Debug, Default, Clone)]
pub struct Filter {
    /// Case-sensitive containment on the registration number.
    pub registration: Option<String>,
    /// Case-insensitive containment on the student name.
    pub name: Option<String>,
    pub cgpa_min: Option<f64>,
    pub cgpa_max: Option<f64>,
}

impl Filter {
    pub fn matches(&self, row: &Submission) -> bool {
        if let Some(needle) = &self.registration {
            if !row.registration_number.contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(needle) = &self.name {
            if !row
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if self.cgpa_min.is_some() || self.cgpa_max.is_some() {
            // rows without a CGPA never satisfy a range bound
            let Some(cgpa) = row.cgpa else {
                return false;
            };
            if let Some(min) = self.cgpa_min {
                if cgpa < min {
                    return false;
                }
            }
            if let Some(max) = self.cgpa_max {
                if cgpa > max {
                    return false;
                }
            }
        }
        true
    }

    /// Returns matching rows in their original order.
    pub fn apply(&self, rows: &[Submission]) -> Vec<Submission> {
        rows.iter().filter(|row| self.matches(row)).cloned().collect()
    }
}

/// Column projection for display; independent of row matching. Columns
/// are named by their CSV header.
pub fn project(
    catalog: &Catalog,
    rows: &[Submission],
    columns: &[String],
) -> anyhow::Result<(Vec<String>, Vec<Vec<String>>)> {
    let full_header = store::header(catalog);
    let mut indices = Vec::with_capacity(columns.len());
    for column in columns {
        match full_header.iter().position(|h| h == column) {
            Some(idx) => indices.push(idx),
            None => bail!("unknown column {column:?}"),
        }
    }

    let projected = rows
        .iter()
        .map(|row| {
            let values = store::row_values(catalog, row);
            indices.iter().map(|&i| values[i].clone()).collect()
        })
        .collect();

    Ok((columns.to_vec(), projected))
}
