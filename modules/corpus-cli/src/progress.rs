use std::time::Duration;

use corpus_common::Progress;
use indicatif::{ProgressBar, ProgressStyle};

/// Terminal progress bar for one stage.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(stage: &'static str) -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:>10} [{bar:40.green/dim}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .progress_chars("█▓░");
        bar.set_style(style);
        bar.set_prefix(stage);
        Self { bar }
    }

    pub fn boxed(stage: &'static str) -> Box<dyn Progress> {
        Box::new(Self::new(stage))
    }
}

impl Progress for BarProgress {
    fn begin(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn advance(&self) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish();
    }
}
