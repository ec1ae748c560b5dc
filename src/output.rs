use indicatif::{ProgressBar, ProgressStyle};

/// `hh:mm:ss.sss` for a sample position.
pub fn samples_to_time(samples: u64, sample_rate: f64) -> String {
    let seconds = samples as f64 / sample_rate;
    let hours = (seconds / 3600.0).floor();
    let minutes = ((seconds % 3600.0) / 60.0).floor();
    let secs = seconds % 60.0;
    format!("{:02.0}:{:02.0}:{:06.3}", hours, minutes, secs)
}

/// Progress over both passes, counted in blocks.
#[derive(Debug)]
pub struct Output {
    pub progress_bar: Option<ProgressBar>,
}

impl Output {
    pub fn new(show_progress: bool, num_blocks: u64) -> Self {
        let progress_bar = show_progress.then(|| ProgressBar::new(num_blocks));

        if let Some(pb) = &progress_bar {
            if let Ok(style) = ProgressStyle::with_template(
                "{msg:>9} [{elapsed_precise}] [{wide_bar:.yellow/green}] {percent_precise}% ({pos}/{len})",
            ) {
                pb.set_style(style.progress_chars("#>-"));
            }
        }

        Self { progress_bar }
    }

    pub fn hidden() -> Self {
        Self { progress_bar: None }
    }

    pub fn set_length(&self, num_blocks: u64) {
        if let Some(pb) = &self.progress_bar {
            pb.set_length(num_blocks);
        }
    }

    pub fn set_stage(&self, stage: &'static str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(stage);
        }
    }

    pub fn inc(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_time() {
        assert_eq!(samples_to_time(0, 16000.0), "00:00:00.000");
        assert_eq!(samples_to_time(24000, 16000.0), "00:00:01.500");
        assert_eq!(samples_to_time(16000 * 3725, 16000.0), "01:02:05.000");
    }

    #[test]
    fn hidden_output_ignores_updates() {
        let output = Output::new(false, 10);
        assert!(output.progress_bar.is_none());
        output.set_length(4);
        output.set_stage("measuring");
        output.inc();
        output.finish();
    }
}
