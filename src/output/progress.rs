//! Progress bar utilities.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Create a spinner for long-running operations.
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

/// Create a progress bar for streamed bytes.
pub fn create_download_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes} ({binary_bytes_per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );
    bar
}

/// Create a progress bar for item counts.
pub fn create_item_bar(total: u64, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {{msg}}",
                message
            ))
            .unwrap()
            .progress_chars("#>-"),
    );
    bar
}

/// Item and byte bars for one download run.
///
/// The item bar ticks once per terminal outcome; the byte bar advances per
/// streamed chunk. Cloning shares the same bars.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    items: ProgressBar,
    bytes: ProgressBar,
}

impl TransferProgress {
    /// Visible bars for `total` attachments.
    pub fn new(total: u64) -> Self {
        let multi = MultiProgress::new();
        let items = multi.add(create_item_bar(total, "Files"));
        let bytes = multi.add(create_download_bar(0));
        Self { items, bytes }
    }

    /// Bars that draw nothing.
    pub fn hidden() -> Self {
        Self {
            items: ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden()),
            bytes: ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden()),
        }
    }

    /// Record `n` streamed bytes.
    pub fn update(&self, n: u64) {
        self.bytes.inc(n);
    }

    /// Record one finished attachment.
    pub fn item_done(&self, filename: &str) {
        self.items.set_message(filename.to_string());
        self.items.inc(1);
    }

    pub fn items_done(&self) -> u64 {
        self.items.position()
    }

    pub fn bytes_done(&self) -> u64 {
        self.bytes.position()
    }

    pub fn finish(&self) {
        self.items.finish_and_clear();
        self.bytes.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_progress_counts() {
        let progress = TransferProgress::hidden();
        progress.update(10);
        progress.update(5);
        progress.item_done("a.png");
        let shared = progress.clone();
        shared.item_done("b.png");
        assert_eq!(progress.bytes_done(), 15);
        assert_eq!(progress.items_done(), 2);
        assert_eq!(progress.items.message(), "b.png");
    }
}
