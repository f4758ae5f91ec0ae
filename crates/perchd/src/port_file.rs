//! Port discovery file coordination.
//!
//! After binding, the daemon advertises its port as decimal text in a
//! `.perch-port` file at the project root so editor clients can find the
//! running instance. The file is advisory state only: every failure while
//! cleaning it up is swallowed.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;
use tracing::{debug, info};

use perch_config::PORT_FILE_NAME;

pub(crate) const PORT_FILE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::port_file");

/// Guard owning the advertised port file for this daemon instance.
///
/// Dropping the guard removes the file, but only while it still holds this
/// instance's port: a newer daemon may have replaced the contents between
/// our bind and our exit, and its advertisement must survive us.
#[derive(Debug)]
pub struct PortFile {
    path: PathBuf,
    port: u16,
}

impl PortFile {
    /// Writes the bound port into the project root.
    ///
    /// The write goes through an atomic persist step so a concurrent reader
    /// never observes a partially written port.
    ///
    /// # Errors
    ///
    /// Returns the IO error when the file cannot be written.
    pub fn publish(root: &Path, port: u16) -> io::Result<Self> {
        let path = root.join(PORT_FILE_NAME);
        atomic_write(&path, port.to_string().as_bytes())?;
        info!(
            target: PORT_FILE_TARGET,
            port,
            file = %path.display(),
            "port file written"
        );
        Ok(Self { path, port })
    }

    /// Path of the discovery file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PortFile {
    fn drop(&mut self) {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return;
        };
        if contents.trim() != self.port.to_string() {
            debug!(
                target: PORT_FILE_TARGET,
                file = %self.path.display(),
                "port file superseded by a newer instance; leaving it in place"
            );
            return;
        }
        if fs::remove_file(&self.path).is_ok() {
            debug!(
                target: PORT_FILE_TARGET,
                file = %self.path.display(),
                "port file removed"
            );
        }
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "target path did not have a parent directory",
        )
    })?;

    let mut file = Builder::new()
        .prefix(PORT_FILE_NAME)
        .tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
