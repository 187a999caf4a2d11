//! Progress display utilities for long-running operations

use crate::core::notify::{Notification, Notifier, Variant};
use crate::core::progress::{PromotionProgress, StepStatus};
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const SPINNER_UPDATE_INTERVAL_MS: u64 = 100;
const CLEAR_LINE_WIDTH: usize = 100;

/// Simple spinner to show progress of asynchronous operations
pub struct ProgressSpinner {
    message: String,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ProgressSpinner {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn start(&mut self) {
        self.running.store(true, Ordering::Relaxed);
        let running = Arc::clone(&self.running);
        let message = self.message.clone();

        let handle = thread::spawn(move || {
            let spinner_chars = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
            let mut index = 0;

            while running.load(Ordering::Relaxed) {
                eprint!("\r{} {}", spinner_chars[index], message);
                let _ = io::stderr().flush();

                index = (index + 1) % spinner_chars.len();
                thread::sleep(Duration::from_millis(SPINNER_UPDATE_INTERVAL_MS));
            }

            eprint!("\r{:<width$}\r", "", width = CLEAR_LINE_WIDTH);
            let _ = io::stderr().flush();
        });

        self.handle = Some(handle);
    }

    /// Stop spinner and print an optional completion message
    pub fn stop(&mut self, completion_message: Option<&str>) {
        self.running.store(false, Ordering::Relaxed);

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        if let Some(msg) = completion_message {
            // Leading space keeps emoji from being clipped
            println!(" {}", msg);
        }
    }
}

impl Drop for ProgressSpinner {
    fn drop(&mut self) {
        self.stop(None);
    }
}

/// `[████░░░░] 50.0%` for a percentage in 0..=100.
pub fn format_progress_bar(percent: f64, width: usize) -> String {
    let clamped = percent.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * width as f64).round() as usize;
    format!(
        "[{}{}] {:.1}%",
        "█".repeat(filled),
        "░".repeat(width.saturating_sub(filled)),
        clamped
    )
}

/// Display simple progress bar for `current` of `total` items
pub fn show_progress_bar(current: usize, total: usize, width: usize) {
    if total == 0 {
        return;
    }

    let percent = current as f64 / total as f64 * 100.0;
    eprint!("\r{} ({}/{})", format_progress_bar(percent, width), current, total);
    let _ = io::stderr().flush();

    if current == total {
        eprintln!();
    }
}

pub fn step_icon(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "○",
        StepStatus::Running => "◐",
        StepStatus::Completed => "✅",
        StepStatus::Error => "❌",
    }
}

/// Multi-line view of a promotion run: bar, one line per step, summary.
pub fn render_promotion_progress(progress: &PromotionProgress) -> String {
    let mut lines = vec![format_progress_bar(progress.progress(), 30)];

    for step in &progress.steps {
        let mut line = format!(" {} {} [{}]", step_icon(step.status), step.name, step.status);
        if let Some(count) = step.count {
            line.push_str(&format!(" {} records", count));
        }
        if let Some(details) = &step.details {
            line.push_str(&format!(" - {}", details));
        }
        lines.push(line);
    }

    if progress.is_complete {
        let outcome = if progress.has_errors() {
            "Promotion finished with errors"
        } else {
            "Promotion complete"
        };
        lines.push(format!(
            "{}: {}/{} steps, {} records",
            outcome,
            progress.completed_count(),
            progress.steps.len(),
            progress.total_records()
        ));
    }

    lines.join("\n")
}

/// Prints notifications to the terminal. Destructive ones go to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

pub fn format_notification(notification: &Notification) -> String {
    let symbol = match notification.variant {
        Variant::Default => "✅",
        Variant::Destructive => "❌",
    };
    if notification.description.is_empty() {
        format!("{} {}", symbol, notification.title)
    } else {
        format!("{} {}: {}", symbol, notification.title, notification.description)
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let line = format_notification(&notification);
        match notification.variant {
            Variant::Default => println!("{}", line),
            Variant::Destructive => eprintln!("{}", line),
        }
    }
}
