use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::{Builder, TempDir};

const WORKSPACE_PREFIX: &str = "pruning-missing-data-";

/// An isolated, uniquely named directory that lives for exactly one engine call.
///
/// The directory is removed when the workspace is closed or dropped, so every
/// exit path (success, engine failure, a parse error, or a panic unwinding
/// through the call) leaves nothing behind.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates the directory under `root`, or under the system temp dir when
    /// `root` is `None`.
    pub fn create(root: Option<&Path>) -> io::Result<Self> {
        let mut builder = Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file directly inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Removes the directory, reporting any failure instead of swallowing it.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => {
                debug!("Removed workspace {}", path.display());
                Ok(())
            }
            Err(err) => {
                warn!("Failed to remove workspace {}: {err}", path.display());
                Err(err)
            }
        }
    }
}
