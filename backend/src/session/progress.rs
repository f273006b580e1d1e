//! Host-process status channel
//!
//! A supervising process reads sentinel lines from stdout:
//!
//! ```text
//! $$>message              fatal status
//! $$progress>42<$$        percent of events done
//! ```

pub fn status_line(message: &str) -> String {
    format!("$$>{}", message)
}

pub fn progress_line(percent: u32) -> String {
    format!("$$progress>{}<$$", percent)
}

/// Throttles progress notifications to roughly 1% steps
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    increment: f64,
    last_reported: f64,
    done: u64,
}

impl ProgressReporter {
    /// `total` events are expected; 0 disables reporting
    pub fn new(total: u64) -> Self {
        Self {
            increment: if total == 0 { 0.0 } else { 100.0 / total as f64 },
            last_reported: 0.0,
            done: 0,
        }
    }

    /// Count one finished event; returns the percent to report, if any
    pub fn advance(&mut self) -> Option<u32> {
        self.done += 1;
        let progress = self.done as f64 * self.increment;
        if progress - self.last_reported > 1.0 {
            self.last_reported = progress;
            Some(progress as u32)
        } else {
            None
        }
    }

    pub fn events_done(&self) -> u64 {
        self.done
    }
}
