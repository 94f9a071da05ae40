use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::info;

use super::{FileReference, ReportBackend};
use crate::error::Result;

/// Fetches rendered statements one at a time, pausing between downloads so
/// the file server is not flooded.
#[derive(Debug, Clone, Copy)]
pub struct Downloader {
    delay: Duration,
}

impl Downloader {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Download every file into `dest_dir` in order. Stops at the first
    /// failed download.
    pub fn download_all<B: ReportBackend + ?Sized>(
        &self,
        backend: &B,
        files: &[FileReference],
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dest_dir)?;

        let mut saved = Vec::with_capacity(files.len());
        for (idx, file) in files.iter().enumerate() {
            if idx > 0 && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            let path = backend.fetch(file, dest_dir)?;
            info!(file = %file.0, path = %path.display(), "downloaded statement");
            saved.push(path);
        }
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgriError;
    use crate::statement::StatementFilters;
    use std::cell::RefCell;
    use std::time::Instant;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingBackend {
        fetched_at: RefCell<Vec<Instant>>,
        fail_on: Option<&'static str>,
    }

    impl ReportBackend for RecordingBackend {
        fn get_reports(&self, _filters: &StatementFilters) -> Result<Vec<FileReference>> {
            Ok(Vec::new())
        }

        fn fetch(&self, file: &FileReference, dest_dir: &Path) -> Result<PathBuf> {
            if self.fail_on == Some(file.0.as_str()) {
                return Err(AgriError::RemoteFailure("404 Not Found".into()));
            }
            self.fetched_at.borrow_mut().push(Instant::now());
            let path = dest_dir.join(file.file_name());
            fs::write(&path, b"%PDF")?;
            Ok(path)
        }
    }

    fn files(names: &[&str]) -> Vec<FileReference> {
        names
            .iter()
            .map(|n| FileReference(format!("/files/{n}")))
            .collect()
    }

    #[test]
    fn downloads_in_order_with_a_pause_between_files() {
        let dir = TempDir::new().unwrap();
        let backend = RecordingBackend::default();
        let downloader = Downloader::from_millis(40);

        let saved = downloader
            .download_all(&backend, &files(&["a.pdf", "b.pdf", "c.pdf"]), dir.path())
            .unwrap();

        assert_eq!(saved.len(), 3);
        assert!(saved[2].ends_with("c.pdf"));
        assert!(dir.path().join("a.pdf").exists());

        let times = backend.fetched_at.borrow();
        assert!(times[1] - times[0] >= Duration::from_millis(40));
        assert!(times[2] - times[1] >= Duration::from_millis(40));
    }

    #[test]
    fn stops_at_first_failure() {
        let dir = TempDir::new().unwrap();
        let backend = RecordingBackend {
            fail_on: Some("/files/b.pdf"),
            ..RecordingBackend::default()
        };

        let result = Downloader::from_millis(0).download_all(
            &backend,
            &files(&["a.pdf", "b.pdf", "c.pdf"]),
            dir.path(),
        );

        assert!(matches!(result, Err(AgriError::RemoteFailure(_))));
        assert_eq!(backend.fetched_at.borrow().len(), 1);
    }
}
