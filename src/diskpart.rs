use crate::errors::{FileOperation, IoError};
use miette::Diagnostic;
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
    thread,
    time::Duration,
};
use thiserror::Error;

/// Image file name inside the workspace directory.
pub const IMAGE_FILE_NAME: &str = "ntfs.vhd";
/// VHD size handed to `create vdisk maximum=` (megabytes).
pub const IMAGE_SIZE_MB: u32 = 4;
/// NTFS cluster size handed to `format unit=`.
pub const ALLOCATION_UNIT: u32 = 4096;
/// Volume label of the formatted partition.
pub const DEFAULT_LABEL: &str = "TestVolume";
/// Drive letter the partition is assigned to.
pub const DEFAULT_DRIVE_LETTER: char = 'v';

const PROVISION_SCRIPT_NAME: &str = "create_vdisk.txt";
const DETACH_SCRIPT_NAME: &str = "detach_vdisk.txt";

/// Pause after each diskpart run so the OS finishes registering (or
/// releasing) the volume before the next stage touches it.
const SETTLE: Duration = Duration::from_secs(1);

#[derive(Debug, Error, Diagnostic)]
pub enum DiskpartError {
    #[error("I/O error within diskpart domain")]
    #[diagnostic(code(mkspecimen::diskpart::io))]
    Io(#[from] IoError),

    #[error("unable to launch the disk provisioning utility: {source}")]
    #[diagnostic(
        code(mkspecimen::diskpart::launch),
        help("diskpart ships with Windows; make sure it is on PATH")
    )]
    Launch {
        #[source]
        source: std::io::Error,
    },

    #[error("disk provisioning script '{script}' failed with {status}")]
    #[diagnostic(
        code(mkspecimen::diskpart::utility),
        help("diskpart requires an elevated prompt; the partial image is left in place for inspection")
    )]
    Utility {
        script: PathBuf,
        status: std::process::ExitStatus,
    },
}

/// Everything diskpart needs to create, format and mount the specimen image.
#[derive(Debug, Clone)]
pub struct ProvisionSpec {
    pub image_path: PathBuf,
    pub max_size_mb: u32,
    pub label: String,
    pub unit_size: u32,
    pub drive_letter: char,
}
impl ProvisionSpec {
    pub fn for_workspace(workspace: &Path, label: &str, drive_letter: char) -> Self {
        Self {
            image_path: workspace.join(IMAGE_FILE_NAME),
            max_size_mb: IMAGE_SIZE_MB,
            label: label.to_string(),
            unit_size: ALLOCATION_UNIT,
            drive_letter,
        }
    }

    /// Root of the mounted volume, e.g. `v:\`.
    pub fn volume_root(&self) -> PathBuf {
        PathBuf::from(format!("{}:\\", self.drive_letter))
    }
}

/// Renders the diskpart directives that create, attach, partition, format
/// and mount the image. Directive order is load-bearing: diskpart keeps a
/// current-object cursor, so each line operates on what the previous one
/// selected.
pub fn provision_script(spec: &ProvisionSpec) -> String {
    let image = spec.image_path.display();

    format!(
        "create vdisk file=\"{image}\" maximum={size} type=fixed\n\
         select vdisk file=\"{image}\"\n\
         attach vdisk\n\
         convert mbr\n\
         create partition primary\n\
         format fs=ntfs label=\"{label}\" unit={unit} quick\n\
         assign letter={letter}\n",
        size = spec.max_size_mb,
        label = spec.label,
        unit = spec.unit_size,
        letter = spec.drive_letter,
    )
}

/// Renders the directives that release the mounted image.
pub fn detach_script(image_path: &Path) -> String {
    format!(
        "select vdisk file=\"{image}\"\n\
         detach vdisk\n",
        image = image_path.display(),
    )
}

/// Seam over the external disk provisioning utility so the pipeline can be
/// exercised against a fake without touching real disks.
pub trait DiskProvisioner {
    fn run_script(&self, script: &Path) -> Result<(), DiskpartError>;
}

/// The real thing: `diskpart /s <script>`. Needs an elevated prompt.
pub struct Diskpart;
impl DiskProvisioner for Diskpart {
    fn run_script(&self, script: &Path) -> Result<(), DiskpartError> {
        let status = Command::new("diskpart")
            .arg("/s")
            .arg(script)
            .status()
            .map_err(|error| DiskpartError::Launch { source: error })?;

        if !status.success() {
            return Err(DiskpartError::Utility {
                script: script.to_path_buf(),
                status,
            });
        }

        Ok(())
    }
}

fn run_transient_script(
    provisioner: &dyn DiskProvisioner,
    script_path: &Path,
    directives: &str,
) -> Result<(), DiskpartError> {
    fs::write(script_path, directives)
        .map_err(|error| IoError::new(FileOperation::Write, script_path.to_path_buf(), error))?;

    // On failure the script stays next to the partial image for inspection.
    provisioner.run_script(script_path)?;

    fs::remove_file(script_path)
        .map_err(|error| IoError::new(FileOperation::Remove, script_path.to_path_buf(), error))?;

    thread::sleep(SETTLE);

    Ok(())
}

/// Creates and mounts the specimen image described by `spec`.
pub fn provision(
    provisioner: &dyn DiskProvisioner,
    workspace: &Path,
    spec: &ProvisionSpec,
) -> Result<(), DiskpartError> {
    log::info!(
        "provisioning {} ({} MB, ntfs, {}:)",
        spec.image_path.display(),
        spec.max_size_mb,
        spec.drive_letter
    );

    run_transient_script(
        provisioner,
        &workspace.join(PROVISION_SCRIPT_NAME),
        &provision_script(spec),
    )
}

/// Detaches the mounted specimen image.
pub fn detach(
    provisioner: &dyn DiskProvisioner,
    workspace: &Path,
    image_path: &Path,
) -> Result<(), DiskpartError> {
    log::info!("detaching {}", image_path.display());

    run_transient_script(
        provisioner,
        &workspace.join(DETACH_SCRIPT_NAME),
        &detach_script(image_path),
    )
}
