use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Named progress bars for the transmit/receive sides of a link.
pub struct ProgressManager {
    mp: MultiProgress,
    bars: Arc<Mutex<HashMap<String, ProgressBar>>>,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self {
            mp: MultiProgress::new(),
            bars: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a bar
    /// - `id`: unique name
    /// - `total`: length of the bar
    /// - `template`: one of [`templates`]
    /// - `message`: initial message
    pub fn create_bar(
        &self,
        id: &str,
        total: u64,
        template: &str,
        message: &str,
    ) -> Result<(), String> {
        let mut bars = self
            .bars
            .lock()
            .map_err(|e| format!("Lock error: {}", e))?;

        if bars.contains_key(id) {
            return Err(format!("Progress bar '{}' already exists", id));
        }

        let style = ProgressStyle::default_bar()
            .template(template)
            .map_err(|e| format!("Bad template: {}", e))?
            .progress_chars("█▉▊▋▌▍▎▏ ");
        let pb = self
            .mp
            .add(ProgressBar::new(total));
        pb.set_style(style);
        pb.set_message(message.to_string());

        bars.insert(id.to_string(), pb);
        Ok(())
    }

    pub fn set_position(&self, id: &str, pos: u64) -> Result<(), String> {
        self.with_bar(id, |pb| pb.set_position(pos))
    }

    pub fn inc(&self, id: &str, value: u64) -> Result<(), String> {
        self.with_bar(id, |pb| pb.inc(value))
    }

    /// Rewind a bar to zero for the next round, reusing its slot
    pub fn restart(&self, id: &str, message: &str) -> Result<(), String> {
        self.with_bar(id, |pb| {
            pb.reset();
            pb.set_message(message.to_string());
        })
    }

    pub fn set_message(&self, id: &str, message: &str) -> Result<(), String> {
        self.with_bar(id, |pb| pb.set_message(message.to_string()))
    }

    /// Finish a bar, keeping it on screen
    pub fn finish(&self, id: &str, message: &str) -> Result<(), String> {
        self.with_bar(id, |pb| pb.finish_with_message(message.to_string()))
    }

    pub fn finish_all(&self) {
        if let Ok(mut bars) = self.bars.lock() {
            for (_, pb) in bars.drain() {
                pb.finish();
            }
        }
    }

    fn with_bar<F>(&self, id: &str, f: F) -> Result<(), String>
    where
        F: FnOnce(&ProgressBar),
    {
        let bars = self
            .bars
            .lock()
            .map_err(|e| format!("Lock error: {}", e))?;
        match bars.get(id) {
            Some(pb) => {
                f(pb);
                Ok(())
            }
            None => Err(format!("Progress bar '{}' not found", id)),
        }
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

pub mod templates {
    pub const SENDER: &str =
        "SEND [{bar:30.cyan}] {percent}% ({pos}/{len} bits) {msg}";
    pub const RECEIVER: &str =
        "RECV [{bar:30.blue}] {percent}% ({pos}/{len} frames) {msg}";
}
