use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Platform data directory for the durable store, created on demand.
pub fn data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "cradlebridge", "cradle")
        .context("could not determine a home directory for the data store")?;
    let dir = dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create data dir {}", dir.display()))?;
    Ok(dir)
}

/// `explicit` when given (created if missing), else [`data_dir`].
pub fn resolve_data_dir(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(d) => {
            std::fs::create_dir_all(d).with_context(|| format!("create data dir {}", d.display()))?;
            Ok(d.clone())
        }
        None => data_dir(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("store");
        let resolved = resolve_data_dir(Some(&target)).unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }
}
