//! Hash-compared file writing and rustfmt piping.
//!
//! Generated files are rewritten on every run, so the writer compares a
//! SHA-256 of the existing content first and leaves identical files
//! untouched. That keeps mtimes stable and downstream build tools quiet.

use std::path::Path;
use std::process::Stdio;

use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::error::{Error, Result};

/// Write `content` to `path`, creating parent directories as needed.
///
/// Skips the write when the on-disk content hashes identically.
/// Returns whether the file changed.
pub async fn write_code(path: &Path, content: &str) -> Result<bool> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }
    if let Ok(existing) = tokio::fs::read(path).await {
        if Sha256::digest(&existing) == Sha256::digest(content.as_bytes()) {
            return Ok(false);
        }
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| Error::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(true)
}

/// Run `source` through `rustfmt --emit stdout` and return the formatted
/// text.
///
/// stdin is fed and stdout drained concurrently so neither pipe can fill
/// and deadlock on large files.
pub async fn format_rust_code(source: &str) -> Result<String> {
    let mut child = Command::new("rustfmt")
        .arg("--emit")
        .arg("stdout")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Format(format!("failed to spawn rustfmt: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::Format("rustfmt stdin not captured".to_string()))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Format("rustfmt stdout not captured".to_string()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Format("rustfmt stderr not captured".to_string()))?;

    let input = source.as_bytes().to_vec();
    let feed = tokio::spawn(async move {
        stdin.write_all(&input).await?;
        stdin.shutdown().await?;
        drop(stdin);
        Ok::<(), std::io::Error>(())
    });

    let mut formatted = String::new();
    let mut errors = String::new();
    let (out_read, err_read) = tokio::join!(
        stdout.read_to_string(&mut formatted),
        stderr.read_to_string(&mut errors),
    );
    out_read.map_err(|e| Error::Format(format!("reading rustfmt output: {e}")))?;
    err_read.map_err(|e| Error::Format(format!("reading rustfmt errors: {e}")))?;

    feed.await
        .map_err(|e| Error::Format(format!("feeding rustfmt: {e}")))?
        .map_err(|e| Error::Format(format!("feeding rustfmt: {e}")))?;

    let status = child
        .wait()
        .await
        .map_err(|e| Error::Format(format!("waiting for rustfmt: {e}")))?;
    if !status.success() {
        return Err(Error::Format(format!(
            "rustfmt exited with {status}: {}",
            errors.trim()
        )));
    }
    Ok(formatted)
}

/// Whether rustfmt can be spawned at all.
pub async fn rustfmt_available() -> bool {
    Command::new("rustfmt")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Format Rust source and write it with [`write_code`].
pub async fn write_rust_code(path: &Path, content: &str) -> Result<bool> {
    let formatted = format_rust_code(content).await?;
    write_code(path, &formatted).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tempdir() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "si-registry-writer-test-{}-{id}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn write_code_creates_parents_and_reports_change() {
        let dir = tempdir();
        let path = dir.join("nested").join("out.proto");
        let changed = write_code(&path, "syntax = \"proto3\";\n").await.unwrap();
        assert!(changed);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "syntax = \"proto3\";\n"
        );
    }

    #[tokio::test]
    async fn identical_content_is_not_rewritten() {
        let dir = tempdir();
        let path = dir.join("out.proto");
        assert!(write_code(&path, "a\n").await.unwrap());
        assert!(!write_code(&path, "a\n").await.unwrap());
        assert!(write_code(&path, "b\n").await.unwrap());
    }

    #[tokio::test]
    async fn format_rust_code_normalizes_whitespace() {
        if !rustfmt_available().await {
            eprintln!("skipping: rustfmt not available");
            return;
        }
        let formatted = format_rust_code("fn  main( ){ let x=1;println!(\"{x}\") ; }")
            .await
            .unwrap();
        assert!(formatted.contains("fn main() {"));
        assert!(formatted.contains("let x = 1;"));
    }

    #[tokio::test]
    async fn format_rust_code_reports_syntax_errors() {
        if !rustfmt_available().await {
            eprintln!("skipping: rustfmt not available");
            return;
        }
        let err = format_rust_code("fn main( {").await.unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }
}
