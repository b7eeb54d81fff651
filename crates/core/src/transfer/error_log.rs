//! Append-only failure log for batch uploads

use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;

/// Lines of `<RFC 3339 time>: <message>`, shared by all workers
#[derive(Debug)]
pub struct ErrorLog {
    file: Mutex<File>,
}

impl ErrorLog {
    /// Open `path` for appending, creating it if needed
    pub async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Append one line; a failing write is reported through tracing only
    pub async fn record(&self, message: &str) {
        let now = jiff::Zoned::now().strftime("%Y-%m-%dT%H:%M:%S%:z");
        let line = format!("{now}: {message}\n");

        let mut file = self.file.lock().await;
        if let Err(e) = file.write_all(line.as_bytes()).await {
            tracing::error!(error = %e, "could not write to error log");
            return;
        }
        if let Err(e) = file.flush().await {
            tracing::error!(error = %e, "could not flush error log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lines_are_timestamped_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("err.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let log = ErrorLog::open(&path).await.unwrap();
        log.record("upload failed 'a.txt'").await;
        log.record("upload failed 'b.txt'").await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "earlier");
        assert!(lines[1].ends_with(": upload failed 'a.txt'"));
        let stamp = lines[2].split(": ").next().unwrap();
        assert!(stamp.parse::<jiff::Timestamp>().is_ok(), "{stamp}");
    }
}
