//! Filesystem helpers shared by the local adapters.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::application::ports::FileHasher;
use crate::domain::ids::hex_encode;

/// Local filesystem implementation of `FileHasher`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileHasher for LocalFs {
    fn sha256_file(&self, path: &Path) -> Result<String> {
        sha256_file(path)
    }
}

/// Compute the SHA256 hex digest of a file.
///
/// Reads the file in 64 KB chunks to avoid loading large files into memory.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 65536];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

/// SHA256 hex digest of an in-memory string.
#[must_use]
pub fn sha256_str(content: &str) -> String {
    hex_encode(&Sha256::digest(content.as_bytes()))
}

/// `~/.campfire`, home of the config, state and inventory files.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn campfire_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".campfire"))
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))
}

/// Resolve a file path from an environment override, falling back to
/// `~/.campfire/<file_name>`.
///
/// # Errors
///
/// Returns an error if the variable is unset and the home directory
/// cannot be determined.
pub fn path_from_env(var: &str, file_name: &str) -> Result<PathBuf> {
    match std::env::var_os(var) {
        Some(val) if !val.is_empty() => Ok(PathBuf::from(val)),
        _ => Ok(campfire_dir()?.join(file_name)),
    }
}

/// Write `content` through a sibling temp file and rename it into place,
/// owner-readable only.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or any
/// filesystem step fails.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);
    std::fs::write(&temp_path, content)
        .with_context(|| format!("writing temp file {}", temp_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
    }

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("finalizing {}", path.display()))
}
