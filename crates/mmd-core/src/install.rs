//! Installing metadata directories.
//!
//! Installation copies (or, in develop mode, symlinks) every file under
//! a source metadata directory into a destination, metadata files
//! included.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use crate::error::{MetadataError, Result};

/// Options controlling [`install`].
#[derive(Debug, Clone, Copy)]
pub struct InstallOptions {
    /// Symlink files instead of copying them.
    pub develop: bool,
    /// Overwrite existing destination files instead of failing.
    pub clobber: bool,
    /// Report what would be done without doing it.
    pub dry_run: bool,
    /// Suppress per-file status messages.
    pub silent: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        InstallOptions {
            develop: false,
            clobber: false,
            dry_run: false,
            silent: true,
        }
    }
}

/// Install all files under `source` into `dest`.
///
/// Returns the installed files relative to `dest`, in a stable order.
/// An existing destination file fails the install unless `clobber` is
/// set; existing symlinks are always replaced.
pub fn install(
    source: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: InstallOptions,
) -> Result<Vec<PathBuf>> {
    let source = source.as_ref();
    let dest = dest.as_ref();

    let mut installed = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|err| MetadataError::Io {
            message: format!("failed to walk {}", source.display()),
            path: Some(source.to_path_buf()),
            source: err.into_io_error(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source)
            .expect("walked path is under its root")
            .to_path_buf();

        install_file(entry.path(), &dest.join(&relative), options)?;
        installed.push(relative);
    }

    Ok(installed)
}

fn install_file(src: &Path, dest: &Path, options: InstallOptions) -> Result<()> {
    if !options.silent || options.dry_run {
        let verb = if options.develop { "ln -s" } else { "cp" };
        info!("{verb} {} {}", src.display(), dest.display());
    }
    if options.dry_run {
        return Ok(());
    }

    if dest.is_symlink() {
        fs::remove_file(dest)
            .map_err(|err| MetadataError::io("failed to remove existing symlink", dest, err))?;
    } else if dest.is_file() {
        if !options.clobber {
            return Err(MetadataError::FileExists(dest.to_path_buf()));
        }
        fs::remove_file(dest)
            .map_err(|err| MetadataError::io("failed to remove existing file", dest, err))?;
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| MetadataError::io("failed to create install directory", parent, err))?;
    }

    if options.develop {
        symlink(src, dest)
            .map_err(|err| MetadataError::io("failed to create symlink", dest, err))?;
    } else {
        fs::copy(src, dest).map_err(|err| MetadataError::io("failed to copy file", src, err))?;
    }

    Ok(())
}

#[cfg(unix)]
fn symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dest)
}

#[cfg(windows)]
fn symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(src, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("api.yaml"), "name: Child\n").unwrap();
        fs::write(dir.path().join("child.in"), "duration: {run_duration}\n").unwrap();
        dir
    }

    #[test]
    fn install_copies_everything() {
        let source = source_dir();
        let dest = TempDir::new().unwrap();

        let installed =
            install(source.path(), dest.path(), InstallOptions::default()).unwrap();
        assert_eq!(
            installed,
            [PathBuf::from("api.yaml"), PathBuf::from("child.in")]
        );
        for relative in installed {
            let path = dest.path().join(relative);
            assert!(path.is_file());
            assert!(!path.is_symlink());
        }
    }

    #[test]
    fn develop_installs_symlinks() {
        let source = source_dir();
        let dest = TempDir::new().unwrap();

        install(
            source.path(),
            dest.path(),
            InstallOptions {
                develop: true,
                ..InstallOptions::default()
            },
        )
        .unwrap();
        assert!(dest.path().join("api.yaml").is_symlink());
        assert!(dest.path().join("child.in").is_symlink());
    }

    #[test]
    fn existing_files_need_clobber() {
        let source = source_dir();
        let dest = TempDir::new().unwrap();
        fs::write(dest.path().join("child.in"), "").unwrap();

        let err = install(source.path(), dest.path(), InstallOptions::default()).unwrap_err();
        assert!(matches!(err, MetadataError::FileExists(_)));

        install(
            source.path(),
            dest.path(),
            InstallOptions {
                clobber: true,
                ..InstallOptions::default()
            },
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(dest.path().join("child.in")).unwrap(),
            "duration: {run_duration}\n"
        );
    }

    #[test]
    fn dry_run_writes_nothing() {
        let source = source_dir();
        let dest = TempDir::new().unwrap();

        let installed = install(
            source.path(),
            dest.path(),
            InstallOptions {
                dry_run: true,
                silent: false,
                ..InstallOptions::default()
            },
        )
        .unwrap();
        assert_eq!(installed.len(), 2);
        assert!(!dest.path().join("api.yaml").exists());
    }
}
