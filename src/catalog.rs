use std::path::Path;

use anyhow::{bail, Context};

use crate::models::Course;

/// Fixed course-to-credit mapping for the running term.
#[derive(Debug, Clone)]
pub struct Catalog {
    courses: Vec<Course>,
}

impl Catalog {
    pub fn new(courses: Vec<Course>) -> anyhow::Result<Self> {
        if courses.is_empty() {
            bail!("course catalog is empty");
        }
        for course in &courses {
            if course.key.trim().is_empty() {
                bail!("course {:?} has an empty key", course.name);
            }
            if !(course.credit > 0.0) {
                bail!(
                    "course {:?} has non-positive credit {}",
                    course.name,
                    course.credit
                );
            }
        }
        let mut keys: Vec<&str> = courses.iter().map(|c| c.key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        if keys.len() != courses.len() {
            bail!("course catalog contains duplicate keys");
        }
        Ok(Catalog { courses })
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read course catalog {}", path.display()))?;
        let courses: Vec<Course> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse course catalog {}", path.display()))?;
        Self::new(courses)
    }

    /// The 3/2 EEE term catalog the tool ships with. Keys match the legacy
    /// column encoding so existing data files stay readable.
    pub fn default_term() -> Self {
        let courses = [
            ("Basic_Communication_Engineering", "Basic Communication Engineering", 3.00),
            ("Basic_Communication_Engineering_Lab", "Basic Communication Engineering Lab", 1.50),
            ("Microprocessor_and_Interfacing", "Microprocessor & Interfacing", 3.00),
            ("Microprocessor_and_Interfacing_Lab", "Microprocessor & Interfacing Lab", 1.50),
            ("Control_System_I", "Control System I", 3.00),
            ("Control_System_I_Lab", "Control System I Lab", 1.50),
            ("Power_System_II", "Power System II", 3.00),
            ("Power_Electronics", "Power Electronics", 3.00),
            ("Power_Electronics_Lab", "Power Electronics Lab", 1.50),
        ]
        .into_iter()
        .map(|(key, name, credit)| Course {
            key: key.to_string(),
            name: name.to_string(),
            credit,
        })
        .collect();

        Catalog { courses }
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn get(&self, key: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.key == key)
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }
}
