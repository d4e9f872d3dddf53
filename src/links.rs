use miette::Diagnostic;
use std::{path::Path, process::Command};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LinkError {
    #[error("unable to launch the link creation utility: {source}")]
    #[diagnostic(code(mkspecimen::links::launch))]
    Launch {
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' failed with {status}")]
    #[diagnostic(
        code(mkspecimen::links::utility),
        help("Symbolic link creation needs SeCreateSymbolicLinkPrivilege (elevated prompt or developer mode)")
    )]
    Utility {
        command: String,
        status: std::process::ExitStatus,
    },
}

/// Seam over the link creation facility. Three distinct link kinds matter
/// to downstream parsers: a hard link shares the target's allocation, a
/// symbolic link is a path reference, and a junction is a directory-level
/// reparse point distinct from a directory symlink.
pub trait LinkMaker {
    fn hard_link(&self, link: &Path, target: &Path) -> Result<(), LinkError>;
    fn file_symlink(&self, link: &Path, target: &Path) -> Result<(), LinkError>;
    fn dir_symlink(&self, link: &Path, target: &Path) -> Result<(), LinkError>;
    fn junction(&self, link: &Path, target: &Path) -> Result<(), LinkError>;
}

/// Real implementation shelling out to `cmd /c mklink`.
pub struct Mklink;
impl Mklink {
    fn mklink(&self, flag: Option<&str>, link: &Path, target: &Path) -> Result<(), LinkError> {
        let mut command = Command::new("cmd");
        command.args(["/c", "mklink"]);
        if let Some(flag) = flag {
            command.arg(flag);
        }
        command.arg(link).arg(target);

        let rendered = format!(
            "mklink {}{} {}",
            flag.map(|f| format!("{f} ")).unwrap_or_default(),
            link.display(),
            target.display()
        );

        log::debug!("{rendered}");

        let status = command
            .status()
            .map_err(|error| LinkError::Launch { source: error })?;

        if !status.success() {
            return Err(LinkError::Utility {
                command: rendered,
                status,
            });
        }

        Ok(())
    }
}
impl LinkMaker for Mklink {
    fn hard_link(&self, link: &Path, target: &Path) -> Result<(), LinkError> {
        self.mklink(Some("/h"), link, target)
    }

    fn file_symlink(&self, link: &Path, target: &Path) -> Result<(), LinkError> {
        self.mklink(None, link, target)
    }

    fn dir_symlink(&self, link: &Path, target: &Path) -> Result<(), LinkError> {
        self.mklink(Some("/d"), link, target)
    }

    fn junction(&self, link: &Path, target: &Path) -> Result<(), LinkError> {
        self.mklink(Some("/j"), link, target)
    }
}
