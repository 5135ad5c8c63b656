//! Install command implementation for simbook CLI.
//!
//! Writes a kernelspec whose argv runs `simbook launch` with this executable.

use std::path::PathBuf;

use simbook_core::kernelspec::{self, InstallLocation, KernelSpec};

use crate::colors;

/// Pick the install location from the mutually exclusive flags.
///
/// Without a flag the kernelspec is installed system-wide.
pub fn location(user: bool, sys_prefix: bool, prefix: Option<PathBuf>) -> InstallLocation {
    if sys_prefix {
        InstallLocation::SysPrefix
    } else if let Some(prefix) = prefix {
        InstallLocation::Prefix(prefix)
    } else if user {
        InstallLocation::User
    } else {
        InstallLocation::System
    }
}

/// Install the kernelspec.
pub fn execute(location: &InstallLocation, config_name: &str, kernel_name: &str) -> anyhow::Result<()> {
    let exe = std::env::current_exe()?;
    let spec = KernelSpec::new(&exe, config_name, kernel_name);
    let dir = kernelspec::install(&spec, kernel_name, location)?;

    println!(
        "{}✓{} Installed kernelspec {}{}{} in {}{}{}",
        colors::GREEN,
        colors::RESET,
        colors::BOLD,
        kernel_name,
        colors::RESET,
        colors::DIM,
        dir.display(),
        colors::RESET
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_flags() {
        assert_eq!(location(false, false, None), InstallLocation::System);
        assert_eq!(location(true, false, None), InstallLocation::User);
        assert_eq!(location(false, true, None), InstallLocation::SysPrefix);
        assert_eq!(
            location(false, false, Some(PathBuf::from("/opt/env"))),
            InstallLocation::Prefix(PathBuf::from("/opt/env"))
        );
    }
}
