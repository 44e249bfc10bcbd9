use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{ArchiveMember, archive_path_for};
use crate::error::{Error, Result};

/// Ordered member list for `directory` without writing anything.
///
/// Directories are visited in sorted path order and files in sorted name
/// order within each directory; `META-INF` members are then moved to the front,
/// keeping the relative order inside both groups.
pub fn plan(directory: &Path) -> Result<Vec<ArchiveMember>> {
    if !directory.is_dir() {
        return Err(Error::ArchiveSource {
            path: directory.to_path_buf(),
        });
    }

    let mut members = Vec::new();
    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| directory.to_path_buf());
            Error::io(path, io::Error::from(err))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(directory)
            .unwrap_or(entry.path());
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        members.push(ArchiveMember {
            source: entry.path().to_path_buf(),
            name,
        });
    }

    members.sort_by(|a, b| a.directory().cmp(b.directory()));
    members.sort_by_key(|member| !member.is_manifest());
    Ok(members)
}

/// Pack `directory` into `<directory>.arp` and return the archive path.
pub fn pack(directory: &Path) -> Result<PathBuf> {
    let members = plan(directory).inspect_err(|err| {
        error!(directory = %directory.display(), error = %err, "cannot plan report pack archive");
    })?;
    let target = archive_path_for(directory)?;
    info!(
        directory = %directory.display(),
        archive = %target.display(),
        members = members.len(),
        "creating report pack archive"
    );

    let file = File::create(&target).map_err(|err| Error::io(&target, err))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for member in &members {
        debug!(name = %member.name, source = %member.source.display(), "adding archive member");
        writer
            .start_file(member.name.as_str(), options)
            .map_err(|err| Error::archive(&target, err))?;
        let mut source = File::open(&member.source).map_err(|err| Error::io(&member.source, err))?;
        io::copy(&mut source, &mut writer).map_err(|err| Error::io(&member.source, err))?;
    }
    writer
        .finish()
        .map_err(|err| Error::archive(&target, err))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, relative.as_bytes()).unwrap();
    }

    fn names(members: &[ArchiveMember]) -> Vec<&str> {
        members.iter().map(|member| member.name.as_str()).collect()
    }

    #[test]
    fn manifest_entries_come_first() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("Exchange");
        touch(&root, "a/c.txt");
        touch(&root, "a/b.txt");
        touch(&root, "META-INF/manifest.txt");

        let members = plan(&root).unwrap();
        assert_eq!(
            names(&members),
            vec!["META-INF/manifest.txt", "a/b.txt", "a/c.txt"]
        );
    }

    #[test]
    fn directories_are_walked_in_path_order() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("pack");
        touch(&root, "z.xml");
        touch(&root, "a/x.xml");
        touch(&root, "a-b/y.xml");
        touch(&root, "reports/META-INF/templates/t.xml");
        touch(&root, "META-INF/MANIFEST.MF");

        let members = plan(&root).unwrap();
        assert_eq!(
            names(&members),
            vec![
                "META-INF/MANIFEST.MF",
                "reports/META-INF/templates/t.xml",
                "z.xml",
                "a/x.xml",
                "a-b/y.xml",
            ]
        );
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = pack(&temp.path().join("absent")).unwrap_err();
        assert!(matches!(err, Error::ArchiveSource { .. }));
    }

    #[test]
    fn writes_members_in_planned_order() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("Exchange");
        touch(&root, "b.txt");
        touch(&root, "META-INF/manifest.txt");

        let archive = pack(&root).unwrap();
        assert_eq!(archive, temp.path().join("Exchange.arp"));
        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let order: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(order, vec!["META-INF/manifest.txt", "b.txt"]);
    }
}
