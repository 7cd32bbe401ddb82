use crate::{Error, Result};
use std::path::Path;

/// Cross-platform file permission mode, applied after an atomic write or
/// as part of an [`crate::AccessGate`]-style read-only clamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PermissionMode {
    /// Use the platform default (umask on Unix, inherited ACL on Windows).
    #[default]
    Inherit,

    /// Write-protected. `0o444` on Unix, the `readonly` attribute on Windows.
    ReadOnly,

    /// Explicit Unix mode bits. No-op on Windows, which has no mode bits.
    Custom(u32),
}

impl PermissionMode {
    pub fn apply_to_path(self, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = match self {
                Self::Inherit => return Ok(()),
                Self::ReadOnly => 0o444,
                Self::Custom(m) => m,
            };
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(
                |e| Error::Write {
                    path: path.to_path_buf(),
                    source: e,
                },
            )?;
        }

        #[cfg(windows)]
        {
            if matches!(self, Self::ReadOnly) {
                let mut perms = std::fs::metadata(path)
                    .map_err(|e| Error::Write {
                        path: path.to_path_buf(),
                        source: e,
                    })?
                    .permissions();
                perms.set_readonly(true);
                std::fs::set_permissions(path, perms).map_err(|e| Error::Write {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }

        Ok(())
    }

    pub fn to_unix_mode(self) -> Option<u32> {
        match self {
            Self::Custom(m) => Some(m),
            Self::Inherit | Self::ReadOnly => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_inherit() {
        assert_eq!(PermissionMode::default(), PermissionMode::Inherit);
    }

    #[test]
    fn custom_round_trips_unix_mode() {
        assert_eq!(PermissionMode::Custom(0o755).to_unix_mode(), Some(0o755));
        assert_eq!(PermissionMode::Inherit.to_unix_mode(), None);
        assert_eq!(PermissionMode::ReadOnly.to_unix_mode(), None);
    }

    #[test]
    #[cfg(unix)]
    fn applies_readonly_bits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"x").unwrap();
        PermissionMode::ReadOnly.apply_to_path(&path).unwrap();
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o444);
    }
}
