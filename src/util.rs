use std::fs;
use std::io;
use std::path::Path;

use chrono::Utc;

/// Current wall-clock time in milliseconds since epoch. Version stamps on the
/// shared store are derived from this.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Write `content` to `path` atomically: write a sibling temp file, then
/// rename over the target. A crash mid-write never leaves a truncated file
/// behind.
pub fn atomic_write_str(path: &Path, content: &str) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_recent() {
        // Sanity bound: after 2020-01-01 and before 2100.
        let ms = now_ms();
        assert!(ms > 1_577_836_800_000);
        assert!(ms < 4_102_444_800_000);
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        atomic_write_str(&path, "first").unwrap();
        atomic_write_str(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!path.with_extension("tmp").exists());
    }
}
