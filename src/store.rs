use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::catalog::Catalog;
use crate::models::{GradeCell, Submission};

pub const DROPPED_SENTINEL: &str = "Dropped";

const REG_COLUMN: &str = "Registration_Number";
const NAME_COLUMN: &str = "Name";
const TIMESTAMP_COLUMN: &str = "Timestamp";
const CGPA_COLUMN: &str = "CGPA";
const TOTAL_CREDITS_COLUMN: &str = "Total_Credits";
const TAKEN_COLUMN: &str = "Courses_Taken";
const DROPPED_COLUMN: &str = "Courses_Dropped";

pub fn header(catalog: &Catalog) -> Vec<String> {
    let mut columns = vec![
        REG_COLUMN.to_string(),
        NAME_COLUMN.to_string(),
        TIMESTAMP_COLUMN.to_string(),
    ];
    for course in catalog.courses() {
        columns.push(format!("{}_GPA", course.key));
        columns.push(format!("{}_Credit", course.key));
    }
    columns.push(CGPA_COLUMN.to_string());
    columns.push(TOTAL_CREDITS_COLUMN.to_string());
    columns.push(TAKEN_COLUMN.to_string());
    columns.push(DROPPED_COLUMN.to_string());
    columns
}

pub fn row_values(catalog: &Catalog, row: &Submission) -> Vec<String> {
    let mut values = vec![
        row.registration_number.clone(),
        row.name.clone(),
        row.timestamp.clone(),
    ];
    for (course, cell) in catalog.courses().iter().zip(&row.grades) {
        values.push(cell.to_string());
        let credit = match cell {
            GradeCell::Points { .. } => course.credit,
            _ => 0.0,
        };
        values.push(credit.to_string());
    }
    values.push(row.cgpa.map(|c| format!("{c:.2}")).unwrap_or_default());
    values.push(row.total_credits.to_string());
    values.push(row.courses_taken.to_string());
    values.push(row.courses_dropped.to_string());
    values
}

/// Serializes the full table, header included, to CSV bytes.
pub fn csv_bytes(catalog: &Catalog, rows: &[Submission]) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut bytes);
        writer.write_record(header(catalog))?;
        for row in rows {
            writer.write_record(row_values(catalog, row))?;
        }
        writer.flush()?;
    }
    Ok(bytes)
}

/// Flat CSV table of submissions plus a mirror copy. Every mutation
/// rewrites both files through a temp-then-rename step, so the mirror
/// never goes stale and a failed write leaves the old table intact.
pub struct RecordStore<'a> {
    catalog: &'a Catalog,
    data_path: PathBuf,
    backup_path: PathBuf,
}

impl<'a> RecordStore<'a> {
    pub fn new(catalog: &'a Catalog, data_path: PathBuf, backup_path: PathBuf) -> Self {
        RecordStore {
            catalog,
            data_path,
            backup_path,
        }
    }

    pub fn load_all(&self) -> anyhow::Result<Vec<Submission>> {
        self.read_rows(&self.data_path)
    }

    /// Parses a submission table from any CSV file following the store's
    /// column convention (also the import path). A missing file is an
    /// empty table; a malformed one is an error for the caller to handle.
    pub fn read_rows(&self, path: &Path) -> anyhow::Result<Vec<Submission>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open data file {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("failed to read header row of {}", path.display()))?
            .clone();

        let column = |name: &str| headers.iter().position(|h| h == name);
        let reg_idx = column(REG_COLUMN)
            .with_context(|| format!("{} is missing the {REG_COLUMN} column", path.display()))?;
        let name_idx = column(NAME_COLUMN)
            .with_context(|| format!("{} is missing the {NAME_COLUMN} column", path.display()))?;
        let ts_idx = column(TIMESTAMP_COLUMN);
        let cgpa_idx = column(CGPA_COLUMN);
        let credits_idx = column(TOTAL_CREDITS_COLUMN);
        let taken_idx = column(TAKEN_COLUMN);
        let dropped_idx = column(DROPPED_COLUMN);
        let gpa_columns: Vec<Option<usize>> = self
            .catalog
            .courses()
            .iter()
            .map(|course| column(&format!("{}_GPA", course.key)))
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result
                .with_context(|| format!("malformed row in data file {}", path.display()))?;
            let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

            let grades = gpa_columns
                .iter()
                .map(|idx| parse_grade_cell(field(*idx)))
                .collect();

            rows.push(Submission {
                registration_number: field(Some(reg_idx)).to_string(),
                name: field(Some(name_idx)).to_string(),
                timestamp: field(ts_idx).to_string(),
                grades,
                cgpa: field(cgpa_idx).parse::<f64>().ok(),
                total_credits: field(credits_idx).parse::<f64>().unwrap_or(0.0),
                courses_taken: field(taken_idx).parse::<usize>().unwrap_or(0),
                courses_dropped: field(dropped_idx).parse::<usize>().unwrap_or(0),
            });
        }

        debug!(path = %path.display(), rows = rows.len(), "loaded submission table");
        Ok(rows)
    }

    pub fn append(&self, submission: &Submission) -> anyhow::Result<()> {
        let mut rows = self
            .load_all()
            .context("cannot append, the existing data file is unreadable")?;
        rows.push(submission.clone());
        self.persist(&rows)
    }

    pub fn replace_all(&self, rows: &[Submission]) -> anyhow::Result<()> {
        self.persist(rows)
    }

    /// Removes every row carrying this registration number (duplicates
    /// from re-submission go together) and returns how many went away.
    pub fn delete(&self, registration_number: &str) -> anyhow::Result<usize> {
        let rows = self.load_all()?;
        let kept: Vec<Submission> = rows
            .iter()
            .filter(|row| row.registration_number != registration_number)
            .cloned()
            .collect();
        let removed = rows.len() - kept.len();
        self.persist(&kept)?;
        Ok(removed)
    }

    // Both temp files are written before either rename happens, so a
    // failure while staging leaves primary and mirror exactly as they were.
    fn persist(&self, rows: &[Submission]) -> anyhow::Result<()> {
        let bytes = csv_bytes(self.catalog, rows)?;

        let data_tmp = stage(&self.data_path, &bytes)?;
        let backup_tmp = match stage(&self.backup_path, &bytes) {
            Ok(tmp) => tmp,
            Err(err) => {
                let _ = fs::remove_file(&data_tmp);
                return Err(err);
            }
        };

        if let Err(err) = commit(&data_tmp, &self.data_path) {
            let _ = fs::remove_file(&data_tmp);
            let _ = fs::remove_file(&backup_tmp);
            return Err(err);
        }
        commit(&backup_tmp, &self.backup_path)?;

        debug!(
            rows = rows.len(),
            data = %self.data_path.display(),
            "persisted submission table and mirror"
        );
        Ok(())
    }
}

fn stage(path: &Path, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
    Ok(tmp)
}

fn commit(tmp: &Path, path: &Path) -> anyhow::Result<()> {
    fs::rename(tmp, path).with_context(|| format!("failed to replace {}", path.display()))
}

fn parse_grade_cell(text: &str) -> GradeCell {
    if text == DROPPED_SENTINEL {
        return GradeCell::Dropped;
    }
    match text.parse::<f64>() {
        Ok(value) => GradeCell::Points {
            value,
            text: text.to_string(),
        },
        Err(_) => GradeCell::Raw(text.to_string()),
    }
}
