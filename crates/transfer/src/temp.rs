use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Attempts before giving up on finding an unused temporary name.
const CREATE_ATTEMPTS: u32 = 16;

/// An exclusive temporary file next to its final destination.
///
/// The file is named `.<name>.XXXXXX` in the destination's directory and
/// created with mode 0600. Unless [`persist`](Self::persist) renames it
/// into place, dropping the guard unlinks it, which covers every error
/// path out of a merge.
#[derive(Debug)]
pub struct TempGuard {
    path: PathBuf,
    file: Option<File>,
    keep: bool,
}

impl TempGuard {
    /// Creates a fresh temporary for `dest`.
    pub fn create(dest: &Path) -> io::Result<Self> {
        let dir = dest.parent().filter(|p| !p.as_os_str().is_empty());
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tmp".to_owned());

        for _ in 0..CREATE_ATTEMPTS {
            let suffix: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(6)
                .map(char::from)
                .collect();
            let file_name = format!(".{name}.{suffix}");
            let path = match dir {
                Some(dir) => dir.join(file_name),
                None => PathBuf::from(file_name),
            };
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(0o600)
                .open(&path)
            {
                Ok(file) => {
                    return Ok(Self {
                        path,
                        file: Some(file),
                        keep: false,
                    })
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no unused temporary name for {}", dest.display()),
        ))
    }

    /// Borrows the open handle for writing.
    pub fn file_mut(&mut self) -> &mut File {
        self.file.as_mut().expect("temporary still open")
    }

    /// The temporary's own path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renames the temporary over `dest` and disarms the cleanup.
    pub fn persist(mut self, dest: &Path) -> io::Result<()> {
        self.file.take();
        fs::rename(&self.path, dest)?;
        self.keep = true;
        Ok(())
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if !self.keep {
            // The file may already be gone; nothing useful to do about
            // failures here.
            let _ = fs::remove_file(&self.path);
        }
    }
}
