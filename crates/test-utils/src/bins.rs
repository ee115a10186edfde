use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Temp directory holding stub executables, for resolver tests.
///
/// The files are never executed; they only need to look runnable to a
/// `PATH` search.
pub struct BinDir {
    dir: TempDir,
}

impl BinDir {
    pub fn with_executables(names: &[&str]) -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        for name in names {
            write_executable(dir.path(), name)?;
        }
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Add a file that exists but is not executable.
    pub fn add_plain_file(&self, name: &str) -> io::Result<PathBuf> {
        let path = self.join(name);
        fs::write(&path, "not a program\n")?;
        Ok(path)
    }
}

fn write_executable(dir: &Path, name: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, "#!/bin/sh\nexit 0\n")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}
