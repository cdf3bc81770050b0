//! Terminal progress bars for the two passes of a job

use indicatif::{ProgressBar, ProgressStyle};

use crate::progress::{Phase, Progress};

const BAR_TEMPLATE: &str =
    "{msg} [{elapsed_precise}] {wide_bar} {pos}/{len} ({per_sec}, eta {eta})";

/// Draws one progress bar per pass on stderr
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Progress for BarProgress {
    fn start(&mut self, phase: Phase, total: usize) {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = ProgressBar::new(total as u64).with_style(style);
        bar.set_message(phase.to_string());
        self.bar = Some(bar);
    }

    fn advance(&mut self, records: usize) {
        if let Some(bar) = &self.bar {
            bar.inc(records as u64);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}
