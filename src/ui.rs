//! Terminal output: job tables, upload summaries, and a spinner while the
//! routing provider is being asked for an ETA.

use chrono::{DateTime, Utc};
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::DispatchError;
use crate::ingest::IngestReport;
use crate::lifecycle::{JobRecord, JobStatus, TimestampField};

/// Spinner shown while a provider call is in flight.
pub struct EtaSpinner {
    pb: ProgressBar,
}

impl EtaSpinner {
    pub fn start(label: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Fetching live ETA for {label}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(self) {
        self.pb.finish_and_clear();
    }
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Completed => Style::new().green().bold(),
        JobStatus::Cancelled => Style::new().red(),
        JobStatus::Scheduled => Style::new().dim(),
        _ => Style::new().yellow(),
    }
}

fn fmt_instant(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One line per job, earliest collection first.
pub fn print_jobs(jobs: &[JobRecord]) {
    if jobs.is_empty() {
        println!("No jobs.");
        return;
    }
    let header = Style::new().bold();
    println!(
        "{}",
        header.apply_to(format!(
            "{:<14} {:<18} {:<16} {:<24} {:>5}  {}",
            "REFERENCE", "COLLECTION", "DRIVER", "STATUS", "ETA", "ID"
        ))
    );
    for job in jobs {
        let eta = job
            .estimated_duration
            .map(|m| format!("{m}m"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<14} {:<18} {:<16} {} {:>5}  {}",
            job.reference_number,
            fmt_instant(Some(job.collection_time)),
            job.driver_name,
            status_style(job.status).apply_to(format!("{:<24}", job.status.as_str())),
            eta,
            job.id
        );
    }
}

/// Full detail for a single job.
pub fn print_job(job: &JobRecord) {
    let label = Style::new().bold();
    println!("{} {}", label.apply_to("Reference:"), job.reference_number);
    println!("{} {}", label.apply_to("Id:       "), job.id);
    println!("{} {}", label.apply_to("Customer: "), job.customer_name);
    println!("{} {}", label.apply_to("Driver:   "), job.driver_name);
    println!("{} {}", label.apply_to("From:     "), job.collection_address);
    println!("{} {}", label.apply_to("To:       "), job.delivery_address);
    println!(
        "{} {}",
        label.apply_to("Status:   "),
        status_style(job.status).apply_to(job.status.as_str())
    );
    if let Some(minutes) = job.estimated_duration {
        println!("{} {minutes} min", label.apply_to("ETA:      "));
    }
    if !job.notes.is_empty() {
        println!("{} {}", label.apply_to("Notes:    "), job.notes);
    }
    for field in TimestampField::EDITABLE {
        println!("  {:<24} {}", field.as_str(), fmt_instant(job.timestamp(field)));
    }
}

pub fn print_report(report: &IngestReport) {
    let green = Style::new().green().bold();
    println!("  {} {}", green.apply_to("✓"), report.summary());
    if let Some(deleted) = report.replaced {
        println!("  replaced {deleted} existing jobs");
    }
    if !report.skipped.is_empty() {
        let yellow = Style::new().yellow();
        println!("  {} skipped {} rows:", yellow.apply_to("!"), report.skipped.len());
        for row in &report.skipped {
            println!(
                "    row {} [{}]: {}",
                row.row,
                row.reference.as_deref().unwrap_or("-"),
                row.reason
            );
        }
    }
}

pub fn print_error(err: &DispatchError) {
    let red = Style::new().red().bold();
    eprintln!("  {} {} ({})", red.apply_to("✗"), err, err.kind());
    if err.is_transient() {
        eprintln!("    {}", Style::new().dim().apply_to("temporary failure, try again shortly"));
    }
}
