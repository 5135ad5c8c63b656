//! Jupyter kernelspec generation and install.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sched::InterruptMode;

/// Default kernel name and display name.
pub const DEFAULT_KERNEL_NAME: &str = "simbook";

/// Contents of `kernel.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub argv: Vec<String>,
    pub display_name: String,
    pub language: String,
    pub interrupt_mode: InterruptMode,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl KernelSpec {
    /// Spec that starts `executable launch` with the given config name.
    pub fn new(executable: &Path, config_name: &str, display_name: &str) -> Self {
        Self {
            argv: vec![
                executable.to_string_lossy().to_string(),
                "launch".to_string(),
                "--connection-file".to_string(),
                "{connection_file}".to_string(),
                "--config-name".to_string(),
                config_name.to_string(),
            ],
            display_name: display_name.to_string(),
            language: "simbook".to_string(),
            interrupt_mode: InterruptMode::Message,
            metadata: BTreeMap::new(),
        }
    }

    /// Serialize as `kernel.json` text with sorted keys.
    pub fn to_json(&self) -> Result<String> {
        // Round-trip through Value so object keys come out sorted.
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

/// Where to install a kernelspec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallLocation {
    /// Per-user Jupyter data directory.
    User,
    /// The active virtualenv / conda environment.
    SysPrefix,
    /// `<prefix>/share/jupyter`.
    Prefix(PathBuf),
    /// System-wide Jupyter data directory.
    System,
}

impl InstallLocation {
    /// The `kernels` directory for this location.
    pub fn kernels_dir(&self) -> Result<PathBuf> {
        let data_dir = match self {
            Self::User => user_data_dir()?,
            Self::SysPrefix => {
                let prefix = std::env::var_os("VIRTUAL_ENV")
                    .or_else(|| std::env::var_os("CONDA_PREFIX"))
                    .ok_or_else(|| {
                        Error::KernelSpec(
                            "--sys-prefix needs an active virtualenv or conda environment"
                                .to_string(),
                        )
                    })?;
                PathBuf::from(prefix).join("share").join("jupyter")
            }
            Self::Prefix(prefix) => prefix.join("share").join("jupyter"),
            Self::System => system_data_dir(),
        };
        Ok(data_dir.join("kernels"))
    }
}

fn user_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("JUPYTER_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if cfg!(target_os = "macos") {
        return dirs::home_dir()
            .map(|home| home.join("Library").join("Jupyter"))
            .ok_or_else(|| Error::KernelSpec("cannot determine home directory".to_string()));
    }
    dirs::data_dir()
        .map(|data| data.join("jupyter"))
        .ok_or_else(|| Error::KernelSpec("cannot determine user data directory".to_string()))
}

fn system_data_dir() -> PathBuf {
    if cfg!(windows) {
        let program_data =
            std::env::var_os("PROGRAMDATA").unwrap_or_else(|| "C:\\ProgramData".into());
        PathBuf::from(program_data).join("jupyter")
    } else {
        PathBuf::from("/usr/local/share/jupyter")
    }
}

/// Check a kernel name against what Jupyter accepts.
pub fn validate_kernel_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(Error::KernelSpec(format!(
            "invalid kernel name {name:?}: use letters, digits, '.', '_' or '-'"
        )))
    }
}

/// Write `spec` as `<kernels_dir>/<name>/kernel.json` and return the
/// kernel directory.
pub fn install(spec: &KernelSpec, kernel_name: &str, location: &InstallLocation) -> Result<PathBuf> {
    validate_kernel_name(kernel_name)?;
    let dir = location.kernels_dir()?.join(kernel_name.to_lowercase());

    fs::create_dir_all(&dir)
        .map_err(|e| Error::KernelSpec(format!("cannot create {}: {}", dir.display(), e)))?;
    fs::write(dir.join("kernel.json"), spec.to_json()?)?;

    tracing::info!("installed kernelspec {} to {}", kernel_name, dir.display());
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kernel_json_contents() {
        let spec = KernelSpec::new(Path::new("/usr/bin/simbook"), "bench", "Bench");
        let json: serde_json::Value = serde_json::from_str(&spec.to_json().unwrap()).unwrap();

        assert_eq!(json["argv"][0], "/usr/bin/simbook");
        assert_eq!(json["argv"][3], "{connection_file}");
        assert_eq!(json["argv"][5], "bench");
        assert_eq!(json["display_name"], "Bench");
        assert_eq!(json["interrupt_mode"], "message");
    }

    #[test]
    fn test_keys_sorted() {
        let spec = KernelSpec::new(Path::new("simbook"), "simbook", "simbook");
        let text = spec.to_json().unwrap();
        let argv = text.find("\"argv\"").unwrap();
        let display = text.find("\"display_name\"").unwrap();
        let interrupt = text.find("\"interrupt_mode\"").unwrap();
        let language = text.find("\"language\"").unwrap();
        assert!(argv < display && display < interrupt && interrupt < language);
    }

    #[test]
    fn test_install_into_prefix() {
        let temp = TempDir::new().unwrap();
        let spec = KernelSpec::new(Path::new("simbook"), "simbook", "simbook");
        let location = InstallLocation::Prefix(temp.path().to_path_buf());

        let dir = install(&spec, "SimBook", &location).unwrap();
        assert_eq!(dir, temp.path().join("share/jupyter/kernels/simbook"));

        let written: KernelSpec =
            serde_json::from_str(&fs::read_to_string(dir.join("kernel.json")).unwrap()).unwrap();
        assert_eq!(written, spec);
    }

    #[test]
    fn test_invalid_names_rejected() {
        assert!(validate_kernel_name("sim book").is_err());
        assert!(validate_kernel_name("").is_err());
        assert!(validate_kernel_name("sim-book_2.0").is_ok());
    }
}
