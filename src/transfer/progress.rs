// 进度显示
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

pub struct ProgressTracker {
    progress_bar: ProgressBar,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total_size: u64, description: &str) -> Self {
        let progress_bar = ProgressBar::new(total_size);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
        {
            progress_bar.set_style(style.progress_chars("#>-"));
        }
        progress_bar.set_message(description.to_string());
        Self::with_bar(progress_bar)
    }

    /// Tracks bytes without drawing anything.
    pub fn hidden(total_size: u64) -> Self {
        let progress_bar = ProgressBar::hidden();
        progress_bar.set_length(total_size);
        Self::with_bar(progress_bar)
    }

    fn with_bar(progress_bar: ProgressBar) -> Self {
        Self {
            progress_bar,
            start_time: Instant::now(),
        }
    }

    pub fn update(&self, bytes_transferred: u64) {
        self.progress_bar.set_position(bytes_transferred);
    }

    pub fn position(&self) -> u64 {
        self.progress_bar.position()
    }

    pub fn finish(&self) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let total = self.progress_bar.position();
        let avg_speed = if elapsed > 0.0 { (total as f64 / elapsed) as u64 } else { total };
        self.progress_bar
            .finish_with_message(format!("Transfer completed (avg speed: {})", format_speed(avg_speed)));
    }

    pub fn finish_with_error(&self, error: &str) {
        self.progress_bar.abandon_with_message(format!("Transfer failed: {}", error));
    }
}

pub fn format_speed(bytes_per_sec: u64) -> String {
    if bytes_per_sec < 1024 {
        format!("{} B/s", bytes_per_sec)
    } else if bytes_per_sec < 1024 * 1024 {
        format!("{:.2} KB/s", bytes_per_sec as f64 / 1024.0)
    } else if bytes_per_sec < 1024 * 1024 * 1024 {
        format!("{:.2} MB/s", bytes_per_sec as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB/s", bytes_per_sec as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
