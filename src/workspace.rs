use crate::{
    errors::{FileOperation, IoError},
    version::WinVersion,
};
use miette::Diagnostic;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum WorkspaceError {
    #[error("I/O error within workspace domain")]
    #[diagnostic(code(mkspecimen::workspace::io))]
    Io(#[from] IoError),

    #[error("workspace directory already exists: '{path}'")]
    #[diagnostic(
        code(mkspecimen::workspace::already_exists),
        help("Remove or move the previous specimen directory before re-running")
    )]
    AlreadyExists { path: PathBuf },
}

/// Creates the per-version workspace directory under `root`.
///
/// Refuses to touch a pre-existing directory: earlier specimens are never
/// overwritten or mutated.
pub fn prepare(root: &Path, version: &WinVersion) -> Result<PathBuf, WorkspaceError> {
    let workspace = root.join(version.to_string());

    if workspace.exists() {
        return Err(WorkspaceError::AlreadyExists { path: workspace });
    }

    log::debug!("creating workspace at {}", workspace.display());

    fs::create_dir_all(&workspace)
        .map_err(|error| IoError::new(FileOperation::Mkdir, workspace.clone(), error))?;

    Ok(workspace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_zero() -> WinVersion {
        WinVersion { major: 10, minor: 0 }
    }

    #[test]
    fn creates_directory_named_after_version() {
        let root = tempfile::tempdir().unwrap();

        let workspace = prepare(root.path(), &ten_zero()).unwrap();

        assert_eq!(workspace, root.path().join("10.0"));
        assert!(workspace.is_dir());
    }

    #[test]
    fn refuses_existing_directory_and_leaves_it_alone() {
        let root = tempfile::tempdir().unwrap();
        let existing = root.path().join("10.0");
        fs::create_dir(&existing).unwrap();
        fs::write(existing.join("keep.txt"), "previous run").unwrap();

        let result = prepare(root.path(), &ten_zero());

        assert!(matches!(
            result,
            Err(WorkspaceError::AlreadyExists { path }) if path == existing
        ));
        assert_eq!(
            fs::read_to_string(existing.join("keep.txt")).unwrap(),
            "previous run"
        );
    }
}
