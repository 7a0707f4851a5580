//! Progress indicators for hostenv CLI.

use dctkit::{JobStatus, PollObserver};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner that shows the job currently being waited on.
pub struct JobSpinner {
    bar: ProgressBar,
}

impl JobSpinner {
    pub fn new(message: &str, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PollObserver for JobSpinner {
    fn on_poll(&self, job_id: &str, status: JobStatus) {
        self.bar.set_message(format!("job {job_id}: {status}"));
    }
}

impl Drop for JobSpinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
