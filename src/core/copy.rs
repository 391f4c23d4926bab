use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use filetime::FileTime;

use crate::models::outcome::{CopyOutcome, CopyReason};

use super::ledger::QuotaLedger;

pub const DEFAULT_COPY_BUFFER_BYTES: usize = 128 * 1024;

/// Per-file copy with quota admission. Owns one reusable transfer buffer.
pub struct CopyEngine {
    per_file_ceiling_bytes: u64,
    buffer: Vec<u8>,
}

impl CopyEngine {
    pub fn new(per_file_ceiling_bytes: u64, buffer_bytes: usize) -> Self {
        Self {
            per_file_ceiling_bytes,
            buffer: vec![0u8; buffer_bytes.max(4096)],
        }
    }

    /// Checks run in order and short-circuit: missing source, ceiling, quota.
    /// The ledger is charged only after the content copy completed, with the
    /// number of bytes actually written. A failed attempt leaves any partial
    /// destination file in place.
    pub fn copy_one(
        &mut self,
        source: &Path,
        destination: &Path,
        ledger: &mut QuotaLedger,
    ) -> CopyOutcome {
        let metadata = match fs::metadata(source) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => {
                tracing::warn!(source = %source.display(), "no longer a regular file");
                return CopyOutcome::rejected(CopyReason::IoError, 0);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return CopyOutcome::rejected(CopyReason::SourceMissing, 0);
            }
            Err(e) => {
                tracing::warn!(source = %source.display(), error = %e, "cannot stat source");
                return CopyOutcome::rejected(CopyReason::IoError, 0);
            }
        };

        let size = metadata.len();
        if size > self.per_file_ceiling_bytes {
            return CopyOutcome::rejected(CopyReason::TooLarge, size);
        }
        if !ledger.can_admit(size) {
            return CopyOutcome::rejected(CopyReason::NoSpace, size);
        }

        match self.transfer(source, destination, size) {
            Ok(written) => {
                copy_metadata(&metadata, destination);
                ledger.admit(written);
                CopyOutcome::ok(written)
            }
            Err(e) => {
                tracing::warn!(
                    source = %source.display(),
                    destination = %destination.display(),
                    error = %e,
                    "copy failed, partial destination left in place"
                );
                CopyOutcome::rejected(CopyReason::IoError, size)
            }
        }
    }

    /// Stream at most `limit` bytes so a file growing mid-copy cannot exceed
    /// what was admitted.
    fn transfer(&mut self, source: &Path, destination: &Path, limit: u64) -> io::Result<u64> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut reader = File::open(source)?.take(limit);
        let mut writer = File::create(destination)?;
        let mut written = 0u64;

        loop {
            let n = match reader.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            writer.write_all(&self.buffer[..n])?;
            written += n as u64;
        }

        writer.flush()?;
        writer.sync_all()?;
        Ok(written)
    }
}

/// One-shot form using the default buffer size.
pub fn copy_one(
    source: &Path,
    destination: &Path,
    ledger: &mut QuotaLedger,
    per_file_ceiling_bytes: u64,
) -> CopyOutcome {
    CopyEngine::new(per_file_ceiling_bytes, DEFAULT_COPY_BUFFER_BYTES)
        .copy_one(source, destination, ledger)
}

/// Best effort: timestamps, then permissions.
fn copy_metadata(source_meta: &fs::Metadata, destination: &Path) {
    let atime = FileTime::from_last_access_time(source_meta);
    let mtime = FileTime::from_last_modification_time(source_meta);
    if let Err(e) = filetime::set_file_times(destination, atime, mtime) {
        tracing::debug!(
            destination = %destination.display(),
            error = %e,
            "timestamps not preserved"
        );
    }
    if let Err(e) = fs::set_permissions(destination, source_meta.permissions()) {
        tracing::debug!(
            destination = %destination.display(),
            error = %e,
            "permissions not preserved"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct TestDir {
        path: PathBuf,
    }

    impl TestDir {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!("quotacopy_copy_{}", name));
            let _ = std::fs::remove_dir_all(&path);
            std::fs::create_dir_all(&path).expect("create test dir");
            Self { path }
        }

        fn file(&self, rel: &str, len: usize) -> PathBuf {
            let path = self.path.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create parent");
            }
            let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            std::fs::write(&path, bytes).expect("write file");
            path
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn copies_content_larger_than_buffer_and_charges_ledger() {
        let tmp = TestDir::new("stream");
        let src = tmp.file("src/data.bin", 20_000);
        let dst = tmp.path.join("dst/nested/data.bin");
        let mut ledger = QuotaLedger::from_free_space(1_000_000, 0, 1_000_000).unwrap();

        let mut engine = CopyEngine::new(u64::MAX, 4096);
        let outcome = engine.copy_one(&src, &dst, &mut ledger);

        assert_eq!(outcome, CopyOutcome::ok(20_000));
        assert_eq!(std::fs::read(&src).unwrap(), std::fs::read(&dst).unwrap());
        assert_eq!(ledger.used(), 20_000);
    }

    #[test]
    fn preserves_modification_time() {
        let tmp = TestDir::new("mtime");
        let src = tmp.file("a.txt", 10);
        let stamp = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src, stamp).unwrap();
        let dst = tmp.path.join("out/a.txt");
        let mut ledger = QuotaLedger::from_free_space(1_000, 0, 1_000).unwrap();

        assert!(copy_one(&src, &dst, &mut ledger, 100).success);
        let meta = std::fs::metadata(&dst).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), stamp);
    }

    #[test]
    fn ceiling_boundary_is_inclusive() {
        let tmp = TestDir::new("ceiling");
        let exact = tmp.file("exact.bin", 100);
        let over = tmp.file("over.bin", 101);
        let mut ledger = QuotaLedger::from_free_space(10_000, 0, 10_000).unwrap();

        let ok = copy_one(&exact, &tmp.path.join("out/exact.bin"), &mut ledger, 100);
        assert_eq!(ok.reason, CopyReason::Ok);

        let too_large = copy_one(&over, &tmp.path.join("out/over.bin"), &mut ledger, 100);
        assert_eq!(too_large.reason, CopyReason::TooLarge);
        assert_eq!(too_large.size_bytes, 101);
        assert!(!tmp.path.join("out/over.bin").exists());
        assert_eq!(ledger.used(), 100);
    }

    #[test]
    fn missing_source_and_no_space_leave_ledger_untouched() {
        let tmp = TestDir::new("reject");
        let src = tmp.file("a.bin", 500);
        let mut ledger = QuotaLedger::from_free_space(500, 0, 500).unwrap();

        let gone = tmp.path.join("gone.bin");
        let missing = copy_one(&gone, &tmp.path.join("out/gone.bin"), &mut ledger, 1_000);
        assert_eq!(missing.reason, CopyReason::SourceMissing);

        // used + 500 == budget is refused
        let no_space = copy_one(&src, &tmp.path.join("out/a.bin"), &mut ledger, 1_000);
        assert_eq!(no_space.reason, CopyReason::NoSpace);
        assert!(!tmp.path.join("out/a.bin").exists());
        assert_eq!(ledger.used(), 0);
    }

    #[test]
    fn io_failure_is_not_charged() {
        let tmp = TestDir::new("ioerr");
        let src = tmp.file("a.bin", 10);
        // A regular file where the destination directory should be.
        let blocker = tmp.file("out", 1);
        let mut ledger = QuotaLedger::from_free_space(1_000, 0, 1_000).unwrap();

        let outcome = copy_one(&src, &blocker.join("a.bin"), &mut ledger, 1_000);
        assert_eq!(outcome.reason, CopyReason::IoError);
        assert!(!outcome.success);
        assert_eq!(ledger.used(), 0);
    }

    #[test]
    fn transfer_stops_at_the_measured_length() {
        let tmp = TestDir::new("grown");
        // Measured at 60 bytes, grew to 100 before the transfer.
        let src = tmp.file("log.txt", 100);
        let dst = tmp.path.join("out/log.txt");

        let mut engine = CopyEngine::new(u64::MAX, 4096);
        let written = engine.transfer(&src, &dst, 60).unwrap();

        assert_eq!(written, 60);
        let copied = std::fs::read(&dst).unwrap();
        assert_eq!(copied.len(), 60);
        assert_eq!(copied[..], std::fs::read(&src).unwrap()[..60]);
    }
}
