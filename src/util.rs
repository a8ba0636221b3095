use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut truncated = String::new();
    for ch in text.chars() {
        if truncated.len() + ch.len_utf8() > max_bytes {
            break;
        }
        truncated.push(ch);
    }
    truncated
}

/// Write `text` to `dest` through a temporary sibling so readers never see a
/// partial file. An existing `dest` is replaced.
pub fn write_atomic(dest: &Path, text: &str) -> Result<()> {
    let tmp = stage(dest, text)?;
    tmp.persist(dest)
        .with_context(|| format!("publish {}", dest.display()))?;
    Ok(())
}

/// Like [`write_atomic`], but an existing `dest` is left alone and `false` is
/// returned.
pub fn write_new(dest: &Path, text: &str) -> Result<bool> {
    let tmp = stage(dest, text)?;
    match tmp.persist_noclobber(dest) {
        Ok(_) => Ok(true),
        Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => {
            Err(anyhow::Error::new(err.error).context(format!("publish {}", dest.display())))
        }
    }
}

/// Temporary sibling of `dest` holding `text`, created with the same mode a
/// plain `fs::write` would give it.
fn stage(dest: &Path, text: &str) -> Result<NamedTempFile> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut builder = tempfile::Builder::new();
    builder.prefix(".mmif-pipeline-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Still masked by the process umask.
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder
        .tempfile_in(parent)
        .with_context(|| format!("create temporary file in {}", parent.display()))?;
    tmp.write_all(text.as_bytes())
        .with_context(|| format!("write {}", dest.display()))?;
    Ok(tmp)
}

/// Snapshot path for step `step` of a run writing to `output`:
/// `out.json` -> `out-2-spacy.json`.
pub fn snapshot_path(output: &Path, step: usize, service: &str) -> PathBuf {
    let text = output.to_string_lossy();
    let stem = text.strip_suffix(".json").unwrap_or(&text);
    PathBuf::from(format!("{stem}-{step}-{service}.json"))
}
