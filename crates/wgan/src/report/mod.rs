//! Reporting: sample grids, image and loss-plot sinks, training progress.

pub mod grid;
pub mod plot;
pub mod sink;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over `total` epochs, hidden when `visible` is false.
pub fn epoch_progress(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

/// Compact remaining-time string: seconds, minutes or hours.
pub fn format_eta(remaining_secs: f64) -> String {
    if remaining_secs < 60.0 {
        format!("{:.0}s", remaining_secs)
    } else if remaining_secs < 3600.0 {
        format!("{:.0}m", remaining_secs / 60.0)
    } else {
        format!("{:.1}h", remaining_secs / 3600.0)
    }
}
