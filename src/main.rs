use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod auth;
mod calc;
mod catalog;
mod models;
mod query;
mod report;
mod store;

use catalog::Catalog;
use models::Submission;
use query::Filter;
use store::RecordStore;

const DEFAULT_COLUMNS: [&str; 5] = [
    "Registration_Number",
    "Name",
    "CGPA",
    "Total_Credits",
    "Timestamp",
];

#[derive(Parser)]
#[command(name = "cgpa-tracker")]
#[command(about = "Student CGPA calculator and record keeper", long_about = None)]
struct Cli {
    /// Submission data file
    #[arg(long, default_value = "student_cgpa_data.csv")]
    data: PathBuf,
    /// Mirror copy of the data file
    #[arg(long, default_value = "student_cgpa_backup.csv")]
    backup: PathBuf,
    /// Course catalog JSON; defaults to the built-in term catalog
    #[arg(long)]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a CGPA from course grades and append it to the records
    Submit {
        /// Registration number
        #[arg(long)]
        reg: String,
        /// Student name
        #[arg(long)]
        name: String,
        /// Course grade as KEY=POINTS (repeatable); omitted courses count
        /// as dropped
        #[arg(long = "grade", value_name = "KEY=POINTS")]
        grades: Vec<String>,
    },
    /// List the catalog courses and their credit weights
    Courses,
    /// Filter and display the stored records (admin)
    List {
        /// Substring of the registration number (case-sensitive)
        #[arg(long)]
        reg: Option<String>,
        /// Substring of the student name (case-insensitive)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        min_cgpa: Option<f64>,
        #[arg(long)]
        max_cgpa: Option<f64>,
        /// Comma-separated column names to display
        #[arg(long)]
        columns: Option<String>,
    },
    /// Show one student's submission in detail (admin)
    Show {
        #[arg(long)]
        reg: String,
    },
    /// Write the plain-text statistics report (admin)
    Report {
        #[arg(long, default_value = "cgpa_report.txt")]
        out: PathBuf,
    },
    /// Export the (optionally filtered) table as CSV (admin)
    Export {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        reg: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        min_cgpa: Option<f64>,
        #[arg(long)]
        max_cgpa: Option<f64>,
    },
    /// Delete every record with this registration number (admin)
    Delete {
        #[arg(long)]
        reg: String,
    },
    /// Replace the whole table with an externally produced CSV (admin)
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Apply the replacement instead of only previewing it
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_json_file(path)?,
        None => Catalog::default_term(),
    };
    let store = RecordStore::new(&catalog, cli.data.clone(), cli.backup.clone());

    match cli.command {
        Commands::Submit { reg, name, grades } => {
            if reg.trim().is_empty() || name.trim().is_empty() {
                bail!("please fill in both the registration number and the name");
            }
            let entries = parse_grades(&catalog, &grades)?;
            let computed = calc::compute(
                &catalog,
                &entries,
                reg.trim(),
                name.trim(),
                Local::now().naive_local(),
            )?;

            store
                .append(&computed.submission)
                .context("failed to save the submission")?;

            let breakdown = &computed.breakdown;
            println!("Saved submission for {} ({}).", name.trim(), reg.trim());
            println!();
            println!(
                "Calculated CGPA: {:.2} out of 4.00",
                computed.submission.cgpa.unwrap_or(0.0)
            );
            println!(
                "Formula: sum(GPA x Credit) / sum(Credits) = {:.2} / {:.1}",
                breakdown.weighted_sum, breakdown.total_credits
            );
            println!("Total credits counted: {:.1}", breakdown.total_credits);
            println!("Courses included: {}", breakdown.included.len());
            println!("Courses excluded: {}", breakdown.excluded.len());
            if !breakdown.included.is_empty() {
                println!("Included in the CGPA:");
                for line in &breakdown.included {
                    println!(
                        "- {} (credit {}, GPA {:.2}, weighted {:.2})",
                        line.course, line.credit, line.points, line.weighted
                    );
                }
            }
            if !breakdown.excluded.is_empty() {
                println!("Excluded (dropped/not taken):");
                for course in &breakdown.excluded {
                    println!("- {course}");
                }
            }
        }
        Commands::Courses => {
            println!("Courses in the catalog:");
            for course in catalog.courses() {
                println!(
                    "- {} (key {}, credits {})",
                    course.name, course.key, course.credit
                );
            }
        }
        Commands::List {
            reg,
            name,
            min_cgpa,
            max_cgpa,
            columns,
        } => {
            require_admin()?;
            let rows = load_or_empty(&store);
            if rows.is_empty() {
                println!("No student data available yet.");
                return Ok(());
            }

            print_metrics(&rows);

            let filter = Filter {
                registration: reg,
                name,
                cgpa_min: min_cgpa,
                cgpa_max: max_cgpa,
            };
            let filtered = filter.apply(&rows);
            let columns: Vec<String> = match columns {
                Some(spec) => spec.split(',').map(|c| c.trim().to_string()).collect(),
                None => DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            };
            let (header, projected) = query::project(&catalog, &filtered, &columns)?;

            println!();
            println!("Student records ({} of {} shown):", filtered.len(), rows.len());
            println!("{}", header.join(" | "));
            for row in projected {
                println!("{}", row.join(" | "));
            }
        }
        Commands::Show { reg } => {
            require_admin()?;
            let rows = load_or_empty(&store);
            let Some(row) = rows.iter().find(|r| r.registration_number == reg) else {
                bail!("no record found for registration number {reg}");
            };

            println!("Name: {}", row.name);
            println!("Registration: {}", row.registration_number);
            match row.cgpa {
                Some(cgpa) => println!("CGPA: {cgpa:.2}"),
                None => println!("CGPA: N/A"),
            }
            println!("Total Credits: {}", row.total_credits);
            println!("Courses Taken: {}", row.courses_taken);
            println!("Courses Dropped: {}", row.courses_dropped);
            println!("Submission Time: {}", row.timestamp);

            let mut total_weighted = 0.0;
            let mut total_credits = 0.0;
            println!();
            println!("Course details:");
            for (course, cell) in catalog.courses().iter().zip(&row.grades) {
                if let Some(points) = cell.points() {
                    let weighted = points * course.credit;
                    total_weighted += weighted;
                    total_credits += course.credit;
                    println!(
                        "- {} (GPA {:.2}, credit {}, weighted {:.2})",
                        course.name, points, course.credit, weighted
                    );
                }
            }
            if total_credits > 0.0 {
                println!(
                    "CGPA calculation: {:.2} / {:.1} = {:.2}",
                    total_weighted,
                    total_credits,
                    total_weighted / total_credits
                );
            }
        }
        Commands::Report { out } => {
            require_admin()?;
            let rows = load_or_empty(&store);
            let report = report::build_report(&catalog, &rows, Local::now().naive_local());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write report to {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            out,
            reg,
            name,
            min_cgpa,
            max_cgpa,
        } => {
            require_admin()?;
            let rows = load_or_empty(&store);
            let filter = Filter {
                registration: reg,
                name,
                cgpa_min: min_cgpa,
                cgpa_max: max_cgpa,
            };
            let filtered = filter.apply(&rows);
            let bytes = store::csv_bytes(&catalog, &filtered)?;
            std::fs::write(&out, bytes)
                .with_context(|| format!("failed to write export to {}", out.display()))?;
            println!("Exported {} rows to {}.", filtered.len(), out.display());
        }
        Commands::Delete { reg } => {
            require_admin()?;
            let removed = store.delete(&reg)?;
            if removed == 0 {
                println!("No records matched registration number {reg}.");
            } else {
                println!("Removed {removed} record(s) for {reg}.");
            }
        }
        Commands::Import { csv, yes } => {
            require_admin()?;
            let rows = store
                .read_rows(&csv)
                .with_context(|| format!("failed to read import file {}", csv.display()))?;

            println!("Preview of {} ({} rows):", csv.display(), rows.len());
            for row in rows.iter().take(5) {
                println!(
                    "- {} {} (CGPA {})",
                    row.registration_number,
                    row.name,
                    row.cgpa.map(|c| format!("{c:.2}")).unwrap_or_else(|| "N/A".to_string())
                );
            }

            if yes {
                store.replace_all(&rows)?;
                println!("Imported {} rows, previous table replaced.", rows.len());
            } else {
                println!("Preview only. Re-run with --yes to replace the current table.");
            }
        }
    }

    Ok(())
}

/// Reads grade arguments of the form KEY=POINTS and range-checks them.
/// This is the input boundary: the calculator itself assumes valid grades.
fn parse_grades(catalog: &Catalog, raw: &[String]) -> anyhow::Result<HashMap<String, f64>> {
    let mut entries = HashMap::new();
    for item in raw {
        let Some((key, value)) = item.split_once('=') else {
            bail!("grade {item:?} is not in KEY=POINTS form");
        };
        let key = key.trim();
        if catalog.get(key).is_none() {
            bail!("unknown course key {key:?}, run the courses command for the catalog");
        }
        let points: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("grade points {value:?} for {key} are not a number"))?;
        if !(0.0..=4.0).contains(&points) {
            bail!("grade points {points} for {key} are outside 0.00-4.00");
        }
        if entries.insert(key.to_string(), points).is_some() {
            bail!("course {key} was given more than once");
        }
    }
    Ok(entries)
}

fn require_admin() -> anyhow::Result<()> {
    let id = std::env::var("CGPA_ADMIN_ID")
        .context("CGPA_ADMIN_ID must be set for administrative commands")?;
    let secret = std::env::var("CGPA_ADMIN_SECRET")
        .context("CGPA_ADMIN_SECRET must be set for administrative commands")?;
    if !auth::AdminCredentials::from_env().verify(&id, &secret) {
        bail!("invalid admin credentials");
    }
    Ok(())
}

/// Read failures degrade to an empty table so the admin view stays usable.
fn load_or_empty(store: &RecordStore) -> Vec<Submission> {
    match store.load_all() {
        Ok(rows) => rows,
        Err(err) => {
            warn!("could not read the data file: {err:#}");
            println!("Could not read the data file, continuing with no data.");
            Vec::new()
        }
    }
}

fn print_metrics(rows: &[Submission]) {
    println!("Total Students: {}", rows.len());
    if let Some(summary) = report::cgpa_summary(rows) {
        println!("Average CGPA: {:.2}", summary.mean);
        println!("Highest CGPA: {:.2}", summary.max);
        println!("Lowest CGPA: {:.2}", summary.min);
    }
}
