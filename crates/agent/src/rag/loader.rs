//! Reading documents from disk.

use std::path::Path;

use llmbind_core::error::Error;
use llmbind_core::memory::Document;
use tracing::{debug, warn};

const EXTENSIONS: &[&str] = &["txt", "md"];

/// Load every `.txt` and `.md` file directly inside `dir`, sorted by file
/// name. The file name is the document id.
pub async fn load_documents(dir: &Path) -> Result<Vec<Document>, Error> {
    let io_error = |e: std::io::Error| Error::Internal(format!("reading {}: {e}", dir.display()));

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if supported && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(id) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            warn!(path = %path.display(), "Skipping file with non-UTF-8 name");
            continue;
        };
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::Internal(format!("reading {}: {e}", path.display())))?;
        debug!(document = %id, bytes = text.len(), "Loaded document");
        documents.push(Document { id, text });
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_text_and_markdown_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "# Fuel\nFull tank").unwrap();
        std::fs::write(dir.path().join("a.txt"), "Cancellation terms").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let docs = load_documents(dir.path()).await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.md"]);
        assert_eq!(docs[0].text, "Cancellation terms");
    }

    #[tokio::test]
    async fn missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_documents(&dir.path().join("absent")).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
