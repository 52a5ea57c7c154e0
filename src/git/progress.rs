use tracing::info;

/// Reports clone/pull transfer progress as discrete percentage updates.
///
/// libgit2 calls the transfer callback for every received object; only
/// changes of the integer percentage are reported.
pub struct ProgressPrinter {
    label: String,
    last_percent: Option<u32>,
}

impl ProgressPrinter {
    pub fn new(label: impl Into<String>) -> Self {
        ProgressPrinter {
            label: label.into(),
            last_percent: None,
        }
    }

    /// Records a progress sample. Returns the new percentage when it changed.
    pub fn update(&mut self, received: usize, total: usize) -> Option<u32> {
        if total == 0 {
            return None;
        }
        let percent = ((received.min(total) * 100) / total) as u32;
        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);
        info!(target: "esgf_build::progress", "{}: {}%", self.label, percent);
        Some(percent)
    }
}
