use miette::Diagnostic;
use std::{fmt, process::Command};
use thiserror::Error;

/// The only Windows release the fixture catalog has been validated against.
pub const SUPPORTED_VERSION: &str = "10.0";

#[derive(Debug, Error, Diagnostic)]
pub enum VersionError {
    #[error("unable to query the host Windows version: {source}")]
    #[diagnostic(
        code(mkspecimen::version::probe),
        help("mkspecimen drives diskpart and mklink and therefore only runs on Windows")
    )]
    Probe {
        #[source]
        source: std::io::Error,
    },

    #[error("could not find a version token in '{raw}'")]
    #[diagnostic(
        code(mkspecimen::version::unparsable),
        help("Expected `ver` to print something like 'Microsoft Windows [Version 10.0.19045]'")
    )]
    Unparsable { raw: String },

    #[error("unsupported Windows version: {found}")]
    #[diagnostic(
        code(mkspecimen::version::unsupported),
        help("Only Windows 10.0 is supported")
    )]
    Unsupported { found: WinVersion },
}

/// A Windows version reduced to its first two dot-separated components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinVersion {
    pub major: u32,
    pub minor: u32,
}
impl fmt::Display for WinVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
impl WinVersion {
    /// Extracts the first dotted numeric token from a raw version banner and
    /// keeps its `major.minor` prefix.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        lazy_static::lazy_static! {
            static ref VERSION_REGEX: regex::Regex =
                regex::Regex::new(r"(\d+)\.(\d+)(?:\.\d+)*").expect("a valid regex pattern");
        }

        let captures = VERSION_REGEX
            .captures(raw)
            .ok_or_else(|| VersionError::Unparsable {
                raw: raw.to_string(),
            })?;

        // Both groups are all-digits; anything overflowing u32 is not a
        // Windows version banner.
        let major = captures[1].parse().map_err(|_| VersionError::Unparsable {
            raw: raw.to_string(),
        })?;
        let minor = captures[2].parse().map_err(|_| VersionError::Unparsable {
            raw: raw.to_string(),
        })?;

        Ok(WinVersion { major, minor })
    }

    pub fn is_supported(&self) -> bool {
        self.to_string() == SUPPORTED_VERSION
    }
}

/// Probes the host Windows version via `cmd /c ver`.
pub fn probe() -> Result<WinVersion, VersionError> {
    let output = Command::new("cmd")
        .args(["/c", "ver"])
        .output()
        .map_err(|error| VersionError::Probe { source: error })?;

    parse_probe_output(output)
}

/// Whatever a failing `ver` happens to print is not a version banner, so
/// the exit status is checked before the stdout is parsed.
fn parse_probe_output(output: std::process::Output) -> Result<WinVersion, VersionError> {
    if !output.status.success() {
        return Err(VersionError::Probe {
            source: std::io::Error::other(format!("`cmd /c ver` exited with {}", output.status)),
        });
    }

    let banner = String::from_utf8_lossy(&output.stdout);

    log::debug!("version banner: {}", banner.trim());

    WinVersion::parse(&banner)
}

/// Gates the pipeline on the single supported release.
pub fn ensure_supported(version: &WinVersion) -> Result<(), VersionError> {
    if version.is_supported() {
        Ok(())
    } else {
        Err(VersionError::Unsupported {
            found: version.clone(),
        })
    }
}
