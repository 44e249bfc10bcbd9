//! Packaging of report pack directory trees into `.arp` archives and back.
//!
//! An `.arp` is a deflated zip. Like a Java archive, entries under a
//! `META-INF` directory must come first; the remaining entries follow the
//! sorted directory walk so the same tree always yields the same member order.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub use pack::{pack, plan};
pub use unpack::unpack;
pub use xml::{pretty_print, pretty_print_file};

mod pack;
mod unpack;
mod xml;

pub const ARCHIVE_EXTENSION: &str = "arp";
pub const MANIFEST_DIR: &str = "META-INF";

/// One file scheduled for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub source: PathBuf,
    /// `/`-separated path relative to the packed directory.
    pub name: String,
}

impl ArchiveMember {
    pub fn is_manifest(&self) -> bool {
        self.name.split('/').any(|segment| segment == MANIFEST_DIR)
    }

    fn directory(&self) -> &str {
        self.name.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }
}

/// `<dir>.arp` next to the directory it packs.
pub fn archive_path_for(directory: &Path) -> Result<PathBuf> {
    let name = directory.file_name().ok_or_else(|| Error::ArchiveSource {
        path: directory.to_path_buf(),
    })?;
    let mut file_name = name.to_os_string();
    file_name.push(".");
    file_name.push(ARCHIVE_EXTENSION);
    Ok(directory.with_file_name(file_name))
}

/// Directory an archive unpacks into: the archive path minus its extension.
pub fn unpacked_path_for(archive: &Path) -> PathBuf {
    archive.with_extension("")
}
