//! Spinner feedback and summary reporting for CLI runs.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::busy::{BusyIndicator, Feedback, StatusKind, StatusMessage};
use crate::format::format_bytes;
use crate::view::CourseRow;

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates the spinner shown while a request is in flight.
fn make_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("spinner template is valid")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn busy_text(busy: &BusyIndicator) -> String {
    let message = busy.message().unwrap_or_default();
    match busy.timer_text() {
        Some(timer) => format!("{message} {}", style(timer).dim()),
        None => message.to_string(),
    }
}

/// Renders busy episodes as an indicatif spinner.
#[derive(Debug, Default)]
pub struct SpinnerFeedback {
    bar: Mutex<Option<ProgressBar>>,
}

impl SpinnerFeedback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Feedback for SpinnerFeedback {
    fn on_busy(&self, busy: &BusyIndicator) {
        let mut bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = bar.replace(make_spinner(busy_text(busy))) {
            old.finish_and_clear();
        }
    }

    fn on_tick(&self, busy: &BusyIndicator) {
        let bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = bar.as_ref() {
            bar.set_message(busy_text(busy));
        }
    }

    fn on_idle(&self) {
        let mut bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = bar.take() {
            bar.finish_and_clear();
        }
    }

    fn on_status(&self, status: &StatusMessage) {
        let line = match status.kind {
            StatusKind::Info => format!("{} {}", style("•").cyan(), status.text),
            StatusKind::Success => format!("{} {}", style("✓").green(), status.text),
            StatusKind::Error => format!("{} {}", style("✗").red(), style(&status.text).red()),
        };
        let bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        match bar.as_ref() {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }
}

/// One file written by the run.
#[derive(Debug, Clone)]
pub struct SavedFile {
    pub path: String,
    pub size: u64,
}

/// Outcome of a CLI run, printed at the end.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub saved: Vec<SavedFile>,
    pub skipped: Vec<String>,
    pub failed: usize,
}

/// Prints the course list.
pub fn print_course_list(courses: &[CourseRow]) {
    if courses.is_empty() {
        println!("No courses available.");
        return;
    }

    println!("\n{SEPARATOR}");
    println!("Courses:");
    println!("{SEPARATOR}");

    let width = courses.iter().map(|c| c.id.as_str().len()).max().unwrap_or(0);
    for course in courses {
        println!(
            "  {:<width$}  {}",
            style(course.id.as_str()).bold(),
            course.name
        );
    }

    println!("{SEPARATOR}");
    println!("  {} course(s)", courses.len());
    println!("{SEPARATOR}\n");
}

/// Prints a summary of saved files.
pub fn print_summary(summary: &RunSummary) {
    if summary.saved.is_empty() && summary.skipped.is_empty() && summary.failed == 0 {
        return;
    }

    println!("\n{SEPARATOR}");
    println!("Extraction Summary");
    println!("{SEPARATOR}");

    for file in &summary.saved {
        println!("  {} ({})", file.path, format_bytes(file.size));
    }

    if !summary.saved.is_empty() {
        let total: u64 = summary.saved.iter().map(|f| f.size).sum();
        println!(
            "  Files saved:       {} ({})",
            summary.saved.len(),
            format_bytes(total)
        );
    }
    if !summary.skipped.is_empty() {
        println!(
            "  Files skipped:     {} (already exist, use --force)",
            summary.skipped.len()
        );
    }
    if summary.failed > 0 {
        println!("  Failed:            {}", style(summary.failed).red());
    }

    println!("{SEPARATOR}");
}
