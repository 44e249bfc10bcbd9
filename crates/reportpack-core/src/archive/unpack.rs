use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::result::ZipError;

use super::{pretty_print_file, unpacked_path_for};
use crate::error::{Error, Result};

/// Extract `archive` next to itself and normalise every `*.xml` file inside.
///
/// Returns the directory the archive was extracted into.
pub fn unpack(archive: &Path) -> Result<PathBuf> {
    let target = unpacked_path_for(archive);
    if target == archive {
        return Err(Error::archive(
            archive,
            ZipError::InvalidArchive("archive file name has no extension"),
        ));
    }

    let file = File::open(archive).map_err(|err| Error::io(archive, err))?;
    let mut zip = ZipArchive::new(file).map_err(|err| {
        error!(archive = %archive.display(), error = %err, "not a report pack archive");
        Error::archive(archive, err)
    })?;

    info!(
        archive = %archive.display(),
        directory = %target.display(),
        members = zip.len(),
        "unpacking report pack"
    );
    zip.extract(&target)
        .map_err(|err| Error::archive(archive, err))?;

    let formatted = pretty_print_tree(&target)?;
    debug!(directory = %target.display(), formatted, "pretty-printed XML files");
    Ok(target)
}

fn pretty_print_tree(root: &Path) -> Result<usize> {
    let mut formatted = 0;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            Error::io(path, std::io::Error::from(err))
        })?;
        if !entry.file_type().is_file() || !entry.file_name().to_string_lossy().ends_with(".xml") {
            continue;
        }
        debug!(file = %entry.path().display(), "pretty-printing XML file");
        pretty_print_file(entry.path())?;
        formatted += 1;
    }
    Ok(formatted)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;

    use super::*;
    use crate::archive::{pack, plan};

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn relative_files(root: &Path) -> BTreeSet<String> {
        plan(root)
            .unwrap()
            .into_iter()
            .map(|member| member.name)
            .collect()
    }

    #[test]
    fn round_trip_preserves_relative_paths() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("src").join("Exchange");
        write(&source, "META-INF/manifest.txt", "Manifest-Version: 1.0\n");
        write(&source, "reports/main.xml", "<report><title>Mail</title></report>");
        write(&source, "reports/img/logo.png", "\u{0}\u{1}png");
        let archive = pack(&source).unwrap();

        let moved = temp.path().join("Exchange.arp");
        fs::rename(&archive, &moved).unwrap();
        let unpacked = unpack(&moved).unwrap();

        assert_eq!(unpacked, temp.path().join("Exchange"));
        assert_eq!(relative_files(&unpacked), relative_files(&source));
        assert_eq!(
            fs::read(unpacked.join("reports/img/logo.png")).unwrap(),
            b"\0\x01png"
        );
        let xml = fs::read_to_string(unpacked.join("reports/main.xml")).unwrap();
        assert_eq!(xml.trim_start(), "<report>\n  <title>Mail</title>\n</report>\n");
    }

    #[test]
    fn non_zip_input_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let bogus = temp.path().join("bogus.arp");
        fs::write(&bogus, "definitely not a zip").unwrap();
        assert!(matches!(unpack(&bogus), Err(Error::Archive { .. })));
        assert!(!temp.path().join("bogus").exists());
    }

    #[test]
    fn archive_without_extension_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let bare = temp.path().join("bare");
        fs::write(&bare, "x").unwrap();
        assert!(matches!(unpack(&bare), Err(Error::Archive { .. })));
    }
}
