use miette::Diagnostic;
use std::{
    path::{Path, PathBuf},
    process::Command,
};
use thiserror::Error;

/// Creation date stamped onto the empty-file specimen, in the helper's
/// `%Y/%m/%d %H:%M:%S %z` format (`%z` wants a numeric offset, not a zone
/// name). Deliberately far in the past so timestamp parsers have an
/// anomalous value to chew on.
pub const SPECIMEN_CREATION_DATE: &str = "2000/01/01 00:00:00 +0000";

#[derive(Debug, Error, Diagnostic)]
pub enum TimestompError {
    #[error("unable to launch the timestamp helper '{helper}': {source}")]
    #[diagnostic(
        code(mkspecimen::timestomp::launch),
        help("Point --timestomp at the timestamp helper executable")
    )]
    Launch {
        helper: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timestamp helper failed on '{path}' with {status}")]
    #[diagnostic(code(mkspecimen::timestomp::utility))]
    Utility {
        path: PathBuf,
        status: std::process::ExitStatus,
    },
}

/// Seam over the external timestamp-modification helper.
pub trait Timestomper {
    /// Sets the creation (birth) timestamp of `path` to `date`, where
    /// `date` is formatted as `%Y/%m/%d %H:%M:%S %z`.
    fn set_creation_time(&self, path: &Path, date: &str) -> Result<(), TimestompError>;
}

/// Real implementation invoking the helper as `<exe> <path> -b <date>`.
pub struct TimestompHelper {
    pub exe: PathBuf,
}
impl TimestompHelper {
    /// The helper reads the whole date from one argv entry, so it must not
    /// be split on whitespace. A `.py` helper cannot be exec'd directly on
    /// Windows and is routed through the interpreter.
    fn command(&self, path: &Path, date: &str) -> Command {
        let mut command = if self.exe.extension().is_some_and(|ext| ext == "py") {
            let mut interpreter = Command::new("python");
            interpreter.arg(&self.exe);
            interpreter
        } else {
            Command::new(&self.exe)
        };

        command.arg(path).arg("-b").arg(date);
        command
    }
}
impl Timestomper for TimestompHelper {
    fn set_creation_time(&self, path: &Path, date: &str) -> Result<(), TimestompError> {
        log::debug!("{} {} -b '{date}'", self.exe.display(), path.display());

        let status = self
            .command(path, date)
            .status()
            .map_err(|error| TimestompError::Launch {
                helper: self.exe.clone(),
                source: error,
            })?;

        if !status.success() {
            return Err(TimestompError::Utility {
                path: path.to_path_buf(),
                status,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn argv(command: &Command) -> Vec<&OsStr> {
        command.get_args().collect()
    }

    #[test]
    fn date_stays_one_argv_entry() {
        let helper = TimestompHelper {
            exe: PathBuf::from("WindowsTimestampAccessor.exe"),
        };

        let command = helper.command(Path::new("emptyfile"), SPECIMEN_CREATION_DATE);

        assert_eq!(command.get_program(), "WindowsTimestampAccessor.exe");
        assert_eq!(
            argv(&command),
            vec![
                OsStr::new("emptyfile"),
                OsStr::new("-b"),
                OsStr::new("2000/01/01 00:00:00 +0000"),
            ]
        );
    }

    #[test]
    fn python_helper_runs_through_interpreter() {
        let helper = TimestompHelper {
            exe: PathBuf::from("timestomp.py"),
        };

        let command = helper.command(Path::new("emptyfile"), SPECIMEN_CREATION_DATE);

        assert_eq!(command.get_program(), "python");
        assert_eq!(
            argv(&command),
            vec![
                OsStr::new("timestomp.py"),
                OsStr::new("emptyfile"),
                OsStr::new("-b"),
                OsStr::new(SPECIMEN_CREATION_DATE),
            ]
        );
    }

    #[test]
    fn specimen_date_uses_numeric_offset() {
        // strptime's %z rejects zone names like 'UTC'.
        assert!(SPECIMEN_CREATION_DATE.ends_with("+0000"));
    }
}
