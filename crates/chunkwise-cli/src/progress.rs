//! Progress spinner utilities.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner style, falling back to the plain default when the template is rejected.
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Create a spinner.
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// RAII spinner that clears itself on drop.
pub struct ScopedProgress {
    bar: ProgressBar,
}

impl ScopedProgress {
    /// Create with spinner.
    pub fn spinner(message: &str) -> Self {
        Self {
            bar: create_spinner(message),
        }
    }

    /// Get the progress bar.
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Drop for ScopedProgress {
    fn drop(&mut self) {
        // Reports go to stdout right after; leave no spinner line behind.
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_spinner() {
        let progress = ScopedProgress::spinner("working");
        assert_eq!(progress.bar().message(), "working");
        drop(progress);
    }
}
