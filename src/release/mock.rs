use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Result;
use crate::release::{ReleaseHost, ReleaseRequest};
use crate::trace::CallTrace;

/// Release host that records calls instead of talking to GitHub.
///
/// Calls are recorded as `release:list <slug>`, `release:create <slug> <tag>`
/// and `release:upload <slug> <tag>`.
pub struct RecordingReleaseHost {
    trace: CallTrace,
    releases: RefCell<HashMap<String, Vec<String>>>,
    created: RefCell<Vec<(String, ReleaseRequest)>>,
    uploads: RefCell<Vec<(String, String, Vec<PathBuf>)>>,
}

impl RecordingReleaseHost {
    pub fn new(trace: CallTrace) -> Self {
        RecordingReleaseHost {
            trace,
            releases: RefCell::new(HashMap::new()),
            created: RefCell::new(Vec::new()),
            uploads: RefCell::new(Vec::new()),
        }
    }

    /// Pretend a release already exists for `tag`
    pub fn with_release(self, slug: &str, tag: &str) -> Self {
        self.releases
            .borrow_mut()
            .entry(slug.to_string())
            .or_default()
            .push(tag.to_string());
        self
    }

    pub fn created(&self) -> Vec<(String, ReleaseRequest)> {
        self.created.borrow().clone()
    }

    pub fn uploads(&self) -> Vec<(String, String, Vec<PathBuf>)> {
        self.uploads.borrow().clone()
    }
}

impl ReleaseHost for RecordingReleaseHost {
    fn list_release_tags(&self, slug: &str) -> Result<Vec<String>> {
        self.trace.record(format!("release:list {}", slug));
        Ok(self
            .releases
            .borrow()
            .get(slug)
            .cloned()
            .unwrap_or_default())
    }

    fn create_release(&self, slug: &str, request: &ReleaseRequest) -> Result<()> {
        self.trace
            .record(format!("release:create {} {}", slug, request.tag));
        self.releases
            .borrow_mut()
            .entry(slug.to_string())
            .or_default()
            .push(request.tag.clone());
        self.created
            .borrow_mut()
            .push((slug.to_string(), request.clone()));
        Ok(())
    }

    fn upload_assets(&self, slug: &str, tag: &str, assets: &[PathBuf]) -> Result<()> {
        self.trace.record(format!("release:upload {} {}", slug, tag));
        self.uploads
            .borrow_mut()
            .push((slug.to_string(), tag.to_string(), assets.to_vec()));
        Ok(())
    }
}
