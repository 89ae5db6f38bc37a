//! Progress reporting: a spinner that tracks pages fetched and rows written.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Thin wrapper over an `indicatif` spinner. A disabled scope is a no-op,
/// so the collector can call it unconditionally.
pub struct ProgressScope {
    pb: Option<ProgressBar>,
}

impl ProgressScope {
    pub fn spinner<T: Into<String>>(label: T, enabled: bool) -> Self {
        if !enabled {
            return Self { pb: None };
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {prefix} pages: {pos}  {msg}  elapsed: {elapsed_precise}") {
            pb.set_style(style);
        }
        pb.set_prefix(label.into());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb: Some(pb) }
    }

    #[inline]
    pub fn inc_pages(&self, delta: u64) {
        if let Some(pb) = &self.pb { pb.inc(delta); }
    }

    pub fn set_message<T: Into<String>>(&self, msg: T) {
        if let Some(pb) = &self.pb { pb.set_message(msg.into()); }
    }

    pub fn finish<T: Into<String>>(&self, msg: T) {
        if let Some(pb) = &self.pb { pb.finish_with_message(msg.into()); }
    }
}
