use crate::{
    errors::{FileOperation, IoError},
    links::{LinkError, LinkMaker},
    timestomp::{TimestompError, Timestomper, SPECIMEN_CREATION_DATE},
};
use colored::Colorize;
use miette::Diagnostic;
use std::{fs, path::Path};
use thiserror::Error;

// The fixed specimen catalog. Downstream parsing suites address these by
// name, so they are not configurable.
pub const EMPTY_FILE: &str = "emptyfile";
pub const TEST_DIR: &str = "testdir1";
pub const TEST_FILE: &str = "testfile1";
pub const FILE_HARDLINK: &str = "file_hardlink1";
pub const FILE_SYMLINK: &str = "file_symboliclink1";
pub const DIR_JUNCTION: &str = "directory_junction1";
pub const DIR_SYMLINK: &str = "directory_symboliclink1";
pub const ADS_FILE: &str = "ads1";
pub const ADS_STREAM: &str = "myads";

pub const TEST_FILE_CONTENT: &str = "This is a test file.\n";
pub const ADS_CONTENT: &str = "This is an alternate data stream.\n";

#[derive(Debug, Error, Diagnostic)]
pub enum StepError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Timestomp(#[from] TimestompError),
}

#[derive(Debug, Error, Diagnostic)]
pub enum FixtureError {
    #[error("{} of {total} specimen steps failed", failures.len())]
    #[diagnostic(
        code(mkspecimen::fixtures::incomplete),
        help("The volume holds an incomplete specimen set; see the step errors above")
    )]
    Incomplete {
        total: usize,
        #[related]
        failures: Vec<StepError>,
    },
}

fn report_step(name: &str, result: &Result<(), StepError>) {
    match result {
        Ok(()) => println!("{} {}", "create".green(), name),
        Err(error) => println!("{} {} ({})", "fail".red(), name, error),
    }
}

/// Creates the eight specimens, in catalog order, at `volume_root`.
///
/// Every step is attempted even when an earlier one fails (a missing link
/// privilege should not hide the state of the remaining specimens); the
/// failures are collected and returned together so the run still ends
/// non-zero with one diagnostic per broken specimen.
pub fn populate(
    volume_root: &Path,
    links: &dyn LinkMaker,
    timestomper: &dyn Timestomper,
) -> Result<(), FixtureError> {
    let empty_file = volume_root.join(EMPTY_FILE);
    let test_dir = volume_root.join(TEST_DIR);
    let test_file = test_dir.join(TEST_FILE);
    let ads = volume_root.join(format!("{ADS_FILE}:{ADS_STREAM}"));

    let mut total = 0;
    let mut failures = Vec::new();
    // Each step is reported the moment it finishes, so the progress lines
    // track the volume state even when a later step hangs or fails.
    let mut step = |name: &str, result: Result<(), StepError>| {
        total += 1;
        report_step(name, &result);

        if let Err(error) = result {
            log::warn!("specimen step '{name}' failed");
            failures.push(error);
        }
    };

    step(
        "emptyfile (backdated)",
        backdated_empty_file(&empty_file, timestomper),
    );
    step(TEST_DIR, make_dir(&test_dir));
    step(
        "testdir1/testfile1",
        write_file(&test_file, TEST_FILE_CONTENT),
    );
    step(
        FILE_HARDLINK,
        links
            .hard_link(&volume_root.join(FILE_HARDLINK), &test_file)
            .map_err(StepError::from),
    );
    step(
        FILE_SYMLINK,
        links
            .file_symlink(&volume_root.join(FILE_SYMLINK), &test_file)
            .map_err(StepError::from),
    );
    step(
        DIR_JUNCTION,
        links
            .junction(&volume_root.join(DIR_JUNCTION), &test_dir)
            .map_err(StepError::from),
    );
    step(
        DIR_SYMLINK,
        links
            .dir_symlink(&volume_root.join(DIR_SYMLINK), &test_dir)
            .map_err(StepError::from),
    );
    step("ads1:myads", alternate_data_stream(volume_root, &ads));

    if failures.is_empty() {
        Ok(())
    } else {
        Err(FixtureError::Incomplete { total, failures })
    }
}

/// Zero-length file whose creation timestamp is pushed back to 2000-01-01,
/// giving timestamp parsers a controlled anomalous value.
fn backdated_empty_file(path: &Path, timestomper: &dyn Timestomper) -> Result<(), StepError> {
    write_file(path, "")?;
    timestomper.set_creation_time(path, SPECIMEN_CREATION_DATE)?;
    Ok(())
}

fn make_dir(path: &Path) -> Result<(), StepError> {
    fs::create_dir(path)
        .map_err(|error| IoError::new(FileOperation::Mkdir, path.to_path_buf(), error))?;
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), StepError> {
    fs::write(path, contents)
        .map_err(|error| IoError::new(FileOperation::Write, path.to_path_buf(), error))?;
    Ok(())
}

/// `ads1` with an empty primary stream plus a named secondary stream holding
/// one line of text, addressed through the `file:stream` path form.
fn alternate_data_stream(volume_root: &Path, stream_path: &Path) -> Result<(), StepError> {
    write_file(&volume_root.join(ADS_FILE), "")?;
    write_file(stream_path, ADS_CONTENT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, path::PathBuf};

    /// Records every link request; optionally fails a named subset.
    struct FakeLinks {
        calls: RefCell<Vec<String>>,
        fail_symlinks: bool,
    }
    impl FakeLinks {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_symlinks: false,
            }
        }

        fn failing_symlinks() -> Self {
            Self {
                fail_symlinks: true,
                ..Self::new()
            }
        }

        fn record(&self, kind: &str, link: &Path, target: &Path) {
            self.calls.borrow_mut().push(format!(
                "{kind} {} -> {}",
                link.file_name().unwrap().to_string_lossy(),
                target.file_name().unwrap().to_string_lossy()
            ));
        }

        fn symlink_result(&self) -> Result<(), LinkError> {
            if self.fail_symlinks {
                Err(LinkError::Launch {
                    source: std::io::Error::other("privilege not held"),
                })
            } else {
                Ok(())
            }
        }
    }
    impl LinkMaker for FakeLinks {
        fn hard_link(&self, link: &Path, target: &Path) -> Result<(), LinkError> {
            self.record("hardlink", link, target);
            Ok(())
        }

        fn file_symlink(&self, link: &Path, target: &Path) -> Result<(), LinkError> {
            self.record("symlink", link, target);
            self.symlink_result()
        }

        fn dir_symlink(&self, link: &Path, target: &Path) -> Result<(), LinkError> {
            self.record("dirsymlink", link, target);
            self.symlink_result()
        }

        fn junction(&self, link: &Path, target: &Path) -> Result<(), LinkError> {
            self.record("junction", link, target);
            Ok(())
        }
    }

    struct FakeTimestomper {
        stamped: RefCell<Vec<(PathBuf, String)>>,
    }
    impl FakeTimestomper {
        fn new() -> Self {
            Self {
                stamped: RefCell::new(Vec::new()),
            }
        }
    }
    impl Timestomper for FakeTimestomper {
        fn set_creation_time(&self, path: &Path, date: &str) -> Result<(), TimestompError> {
            self.stamped
                .borrow_mut()
                .push((path.to_path_buf(), date.to_string()));
            Ok(())
        }
    }

    #[test]
    fn creates_full_catalog_in_order() {
        let volume = tempfile::tempdir().unwrap();
        let links = FakeLinks::new();
        let timestomper = FakeTimestomper::new();

        populate(volume.path(), &links, &timestomper).unwrap();

        // Plain filesystem entities exist on disk.
        assert_eq!(
            fs::read(volume.path().join(EMPTY_FILE)).unwrap(),
            Vec::<u8>::new()
        );
        assert!(volume.path().join(TEST_DIR).is_dir());
        assert_eq!(
            fs::read_to_string(volume.path().join(TEST_DIR).join(TEST_FILE)).unwrap(),
            TEST_FILE_CONTENT
        );
        assert_eq!(
            fs::read(volume.path().join(ADS_FILE)).unwrap(),
            Vec::<u8>::new()
        );

        // Link requests went out in catalog order, against the right targets.
        assert_eq!(
            *links.calls.borrow(),
            vec![
                "hardlink file_hardlink1 -> testfile1",
                "symlink file_symboliclink1 -> testfile1",
                "junction directory_junction1 -> testdir1",
                "dirsymlink directory_symboliclink1 -> testdir1",
            ]
        );

        // The empty file was backdated to the fixed specimen date.
        assert_eq!(
            *timestomper.stamped.borrow(),
            vec![(
                volume.path().join(EMPTY_FILE),
                SPECIMEN_CREATION_DATE.to_string()
            )]
        );
    }

    struct BrokenTimestomper;
    impl Timestomper for BrokenTimestomper {
        fn set_creation_time(&self, _path: &Path, _date: &str) -> Result<(), TimestompError> {
            Err(TimestompError::Launch {
                helper: PathBuf::from("timestomp.py"),
                source: std::io::Error::other("helper missing"),
            })
        }
    }

    #[test]
    fn first_step_failure_does_not_stop_the_rest() {
        let volume = tempfile::tempdir().unwrap();
        let links = FakeLinks::new();

        let result = populate(volume.path(), &links, &BrokenTimestomper);

        match result {
            Err(FixtureError::Incomplete { total, failures }) => {
                assert_eq!(total, 8);
                assert_eq!(failures.len(), 1);
            }
            other => panic!("expected Incomplete, got {other:?}"),
        }
        // Everything after the backdate step was still created.
        assert!(volume.path().join(TEST_DIR).join(TEST_FILE).is_file());
        assert_eq!(links.calls.borrow().len(), 4);
        assert!(volume.path().join(ADS_FILE).exists());
    }

    #[test]
    fn failed_steps_are_collected_not_fatal() {
        let volume = tempfile::tempdir().unwrap();
        let links = FakeLinks::failing_symlinks();
        let timestomper = FakeTimestomper::new();

        let result = populate(volume.path(), &links, &timestomper);

        // Both symlink steps failed, and both were still attempted along
        // with everything after them.
        match result {
            Err(FixtureError::Incomplete { total, failures }) => {
                assert_eq!(total, 8);
                assert_eq!(failures.len(), 2);
            }
            other => panic!("expected Incomplete, got {other:?}"),
        }
        assert_eq!(links.calls.borrow().len(), 4);
        assert!(volume.path().join(ADS_FILE).exists());
    }
}
