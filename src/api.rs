use crate::{
    diskpart::{self, DiskProvisioner, ProvisionSpec},
    fixtures,
    links::LinkMaker,
    timestomp::Timestomper,
    version, workspace,
};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum MkspecimenError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Version(#[from] version::VersionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Workspace(#[from] workspace::WorkspaceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Diskpart(#[from] diskpart::DiskpartError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fixtures(#[from] fixtures::FixtureError),
}

/// Knobs the CLI exposes; everything else about the specimen set is fixed.
pub struct CreateOptions {
    pub output_root: PathBuf,
    pub label: String,
    pub drive_letter: char,
}

/// What a successful run left on disk.
pub struct SpecimenSummary {
    pub workspace: PathBuf,
    pub image_path: PathBuf,
}

/// Runs the whole pipeline: probe → workspace → provision → populate →
/// detach. Strictly sequential; each stage's success gates the next, and a
/// failure leaves everything created so far in place for inspection.
///
/// # Errors
///
/// Returns a [`MkspecimenError`] if:
///
/// - The host Windows version cannot be probed or is not the supported one.
/// - The versioned workspace directory already exists.
/// - The disk provisioning utility fails to create, mount or detach the image.
/// - Any specimen step failed (all steps are still attempted first).
pub fn create_specimens(
    options: &CreateOptions,
    provisioner: &dyn DiskProvisioner,
    links: &dyn LinkMaker,
    timestomper: &dyn Timestomper,
) -> Result<SpecimenSummary, MkspecimenError> {
    let probed = version::probe()?;
    version::ensure_supported(&probed)?;

    log::info!("host version {probed} supported, preparing workspace");

    let workspace = workspace::prepare(&options.output_root, &probed)?;

    let spec = ProvisionSpec::for_workspace(&workspace, &options.label, options.drive_letter);
    diskpart::provision(provisioner, &workspace, &spec)?;

    // The volume is mounted from here on; populate before detaching no
    // matter what the populator reports, so a partial specimen set is
    // still unmounted cleanly.
    let populated = fixtures::populate(&spec.volume_root(), links, timestomper);

    diskpart::detach(provisioner, &workspace, &spec.image_path)?;

    populated?;

    Ok(SpecimenSummary {
        workspace,
        image_path: spec.image_path,
    })
}
