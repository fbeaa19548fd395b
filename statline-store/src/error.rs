use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("failed to read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("failed to write {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    source: std::io::Error,
  },
}

pub type Result<T> = std::result::Result<T, StoreError>;
