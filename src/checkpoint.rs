//! Durable checkpoint for the monthly traffic reset

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs;

use crate::error::Result;

/// Record of the last completed traffic reset. Survives restarts; the
/// stored value, not process memory, is authoritative.
#[async_trait]
pub trait Checkpoint: Send + Sync {
  /// Last stored reset time, `None` when nothing was ever written.
  async fn load(&self) -> Result<Option<DateTime<Utc>>>;

  async fn save(&self, at: DateTime<Utc>) -> Result<()>;
}

/// Checkpoint kept as a single RFC 3339 timestamp in a flat file.
pub struct FileCheckpoint {
  path: PathBuf,
}

impl FileCheckpoint {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

#[async_trait]
impl Checkpoint for FileCheckpoint {
  async fn load(&self) -> Result<Option<DateTime<Utc>>> {
    let raw = match fs::read_to_string(&self.path).await {
      Ok(raw) => raw,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        return Ok(None);
      }
      Err(err) => return Err(err.into()),
    };

    let at = DateTime::parse_from_rfc3339(raw.trim())?;
    Ok(Some(at.with_timezone(&Utc)))
  }

  async fn save(&self, at: DateTime<Utc>) -> Result<()> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).await?;
    }

    let encoded = at.to_rfc3339_opts(SecondsFormat::Secs, true);
    Ok(fs::write(&self.path, encoded).await?)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::error::Error;

  fn checkpoint_in(dir: &tempfile::TempDir) -> FileCheckpoint {
    FileCheckpoint::new(dir.path().join("last_reset_time.txt"))
  }

  #[tokio::test]
  async fn test_missing_file_is_initial_state() {
    let dir = tempfile::tempdir().unwrap();

    let loaded = checkpoint_in(&dir).load().await.unwrap();
    assert_eq!(loaded, None);
  }

  #[tokio::test]
  async fn test_save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = checkpoint_in(&dir);

    let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
    checkpoint.save(at).await.unwrap();

    assert_eq!(checkpoint.load().await.unwrap(), Some(at));
  }

  #[tokio::test]
  async fn test_save_overwrites_previous_value() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = checkpoint_in(&dir);

    let first = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();
    checkpoint.save(first).await.unwrap();
    checkpoint.save(second).await.unwrap();

    assert_eq!(checkpoint.load().await.unwrap(), Some(second));
  }

  #[tokio::test]
  async fn test_garbage_contents_fail_to_parse() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("last_reset_time.txt");
    std::fs::write(&path, "not a timestamp").unwrap();

    let result = FileCheckpoint::new(path).load().await;
    assert!(matches!(result, Err(Error::Checkpoint(_))));
  }
}
