//! Atomic filesystem primitives shared by every component that persists
//! state under the home directory: write-temp-then-rename for JSON
//! snapshots, append-only JSONL, and corrupt-file quarantine on load.

use std::path::{Path, PathBuf};

use nxa_domain::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Write `bytes` to `path` atomically: write to a sibling temp file, then
/// rename over the destination. A reader never observes a partial write.
/// Sets mode 0600 on unix (state files may hold session transcripts).
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, bytes)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Async variant of [`write_atomic`], running the blocking syscalls on the
/// blocking pool so callers never stall the Tokio executor.
pub async fn write_atomic_async(path: PathBuf, bytes: Vec<u8>) -> Result<()> {
    tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
        .await
        .map_err(|e| Error::Other(format!("join error in write_atomic_async: {e}")))?
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)
}

pub async fn write_json_atomic_async<T: Serialize>(path: PathBuf, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic_async(path, json).await
}

/// Read and deserialize JSON from `path`, returning `T::default()` if the
/// file is absent. A file that exists but fails to parse is quarantined
/// (renamed alongside itself with a `.corrupt-<unix-ts>` suffix) rather
/// than silently discarded, and the default is returned so startup never
/// hard-fails on a damaged state file.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(err) => {
            quarantine(path)?;
            tracing::warn!(path = %path.display(), error = %err, "quarantined corrupt state file");
            Ok(T::default())
        }
    }
}

/// Append `value` as a single JSON line to `path`, creating the file (and
/// its parent directory) if needed.
pub fn append_jsonl<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(value)?;
    line.push('\n');

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

pub async fn append_jsonl_async<T: Serialize + Send + 'static>(
    path: PathBuf,
    value: T,
) -> Result<()> {
    tokio::task::spawn_blocking(move || append_jsonl(&path, &value))
        .await
        .map_err(|e| Error::Other(format!("join error in append_jsonl_async: {e}")))?
}

/// Read every line of a JSONL file as `T`, skipping (and logging) lines
/// that fail to parse rather than aborting the whole read.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(value) => out.push(value),
            Err(err) => {
                tracing::warn!(path = %path.display(), line = i, error = %err, "skipping malformed jsonl line");
            }
        }
    }
    Ok(out)
}

/// Recursively list files under `root` whose names match `predicate`.
pub fn walk_files(root: &Path, predicate: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    walk_files_inner(root, &predicate, &mut out)?;
    Ok(out)
}

fn walk_files_inner(
    dir: &Path,
    predicate: &impl Fn(&Path) -> bool,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_files_inner(&path, predicate, out)?;
        } else if predicate(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "tmp".to_string());
    let pid = std::process::id();
    path.with_file_name(format!(".{file_name}.tmp-{pid}"))
}

fn quarantine(path: &Path) -> Result<()> {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "state".to_string());
    let dest = path.with_file_name(format!("{file_name}.corrupt-{ts}"));
    std::fs::rename(path, dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        let value = Sample {
            name: "a".into(),
            count: 3,
        };
        write_json_atomic(&path, &value).unwrap();
        let back: Sample = read_json_or_default(&path).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let back: Sample = read_json_or_default(&path).unwrap();
        assert_eq!(back, Sample::default());
    }

    #[test]
    fn corrupt_file_is_quarantined_and_default_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        std::fs::write(&path, b"{not json").unwrap();

        let back: Sample = read_json_or_default(&path).unwrap();
        assert_eq!(back, Sample::default());
        assert!(!path.exists());

        let quarantined: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains("corrupt"))
            .collect();
        assert_eq!(quarantined.len(), 1);
    }

    #[test]
    fn jsonl_append_and_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        append_jsonl(&path, &Sample { name: "a".into(), count: 1 }).unwrap();
        append_jsonl(&path, &Sample { name: "b".into(), count: 2 }).unwrap();

        let entries: Vec<Sample> = read_jsonl(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name, "b");
    }

    #[test]
    fn jsonl_read_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, "{\"name\":\"a\",\"count\":1}\nnot json\n{\"name\":\"b\",\"count\":2}\n").unwrap();

        let entries: Vec<Sample> = read_jsonl(&path).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn async_write_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        let value = Sample { name: "c".into(), count: 9 };
        write_json_atomic_async(path.clone(), &value).await.unwrap();
        let back: Sample = read_json_or_default(&path).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn walk_files_finds_nested_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.md"), "x").unwrap();
        std::fs::write(dir.path().join("nested/b.md"), "x").unwrap();
        std::fs::write(dir.path().join("nested/c.txt"), "x").unwrap();

        let matches = walk_files(dir.path(), |p| {
            p.extension().map(|e| e == "md").unwrap_or(false)
        })
        .unwrap();
        assert_eq!(matches.len(), 2);
    }
}
