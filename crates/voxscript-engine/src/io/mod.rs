use std::path::{Path, PathBuf};

use crate::editing::block::Block;
use crate::editing::document::Document;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("Script not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid script file {path}: {source}")]
    InvalidScript {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Read a narration script file (an ordered JSON list of blocks) into a
/// document.
pub fn read_script(path: &Path) -> Result<Document, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let blocks: Vec<Block> =
        serde_json::from_str(&content).map_err(|source| IoError::InvalidScript {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Document::from_blocks(blocks))
}

/// Write a document back out as the script wire format.
pub fn write_script(path: &Path, doc: &Document) -> Result<(), IoError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(doc.blocks())
        .map_err(|source| IoError::InvalidScript {
            path: path.to_path_buf(),
            source,
        })?;
    content.push('\n');
    std::fs::write(path, content).map_err(IoError::Io)
}
