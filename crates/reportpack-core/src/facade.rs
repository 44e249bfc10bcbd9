//! User-facing report pack operations composed from the remote client and the
//! archive packager.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::archive;
use crate::client::RemoteClient;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::model::{FetchedReportPack, ReportPackSummary, StoredReportPack};

/// Remote report pack store as seen by the facade.
pub trait RemoteObjects {
    /// Report packs pinned on the admin page, ascending by id.
    fn list_pinned(&mut self) -> Result<Vec<ReportPackSummary>>;

    /// Every report pack known to the management service, ascending by id.
    fn list_all(&mut self) -> Result<Vec<ReportPackSummary>>;

    /// Download a pack and return the local `.arp` path.
    fn fetch(&mut self, id: u64, name: &str) -> Result<PathBuf>;

    fn store(&mut self, archive: &[u8]) -> Result<StoredReportPack>;

    fn delete(&mut self, id: u64, name: &str) -> Result<u64>;

    /// Upload an archive that already exists on disk.
    fn store_file(&mut self, path: &Path) -> Result<StoredReportPack> {
        let bytes = fs::read(path).map_err(|err| Error::io(path, err))?;
        info!(file = %path.display(), bytes = bytes.len(), "uploading report pack");
        self.store(&bytes)
    }
}

pub struct ReportPacks<R = RemoteClient> {
    remote: R,
    reports_path: PathBuf,
}

impl ReportPacks<RemoteClient> {
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(
            RemoteClient::new(config)?,
            config.reports_path.clone(),
        ))
    }
}

impl<R: RemoteObjects> ReportPacks<R> {
    pub fn new(remote: R, reports_path: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            reports_path: reports_path.into(),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn list(&mut self) -> Result<Vec<ReportPackSummary>> {
        self.remote.list_all()
    }

    pub fn pinned(&mut self) -> Result<Vec<ReportPackSummary>> {
        self.remote.list_pinned()
    }

    /// Name of the first listed pack with `id`.
    pub fn resolve_name(&mut self, id: u64) -> Result<String> {
        let packs = self.remote.list_all()?;
        find_name(&packs, id)
            .map(str::to_string)
            .ok_or_else(|| {
                error!(id, "report pack id not found");
                Error::Resolution { id }
            })
    }

    /// Download pack `id`, optionally unpacking it next to the archive.
    pub fn get(&mut self, id: u64, extract: bool) -> Result<FetchedReportPack> {
        let name = self.resolve_name(id)?;
        let archive = self.remote.fetch(id, &name)?;
        let unpacked = if extract {
            Some(archive::unpack(&archive)?)
        } else {
            None
        };
        Ok(FetchedReportPack {
            id,
            name,
            archive,
            unpacked,
        })
    }

    /// Package `<reports_path>/<name>` into `<reports_path>/<name>.arp`.
    pub fn build(&self, name: &str) -> Result<PathBuf> {
        let archive = archive::pack(&self.reports_path.join(name))?;
        info!(name, archive = %archive.display(), "report pack built");
        Ok(archive)
    }

    pub fn put_file(&mut self, path: &Path) -> Result<StoredReportPack> {
        self.remote.store_file(path)
    }

    /// Build the named pack and upload the resulting archive.
    pub fn put_named(&mut self, name: &str) -> Result<StoredReportPack> {
        let archive = self.build(name)?;
        self.put_file(&archive)
    }

    pub fn remove(&mut self, id: u64) -> Result<ReportPackSummary> {
        let name = self.resolve_name(id)?;
        let deleted = self.remote.delete(id, &name)?;
        Ok(ReportPackSummary::new(deleted, name))
    }
}

fn find_name(packs: &[ReportPackSummary], id: u64) -> Option<&str> {
    packs
        .iter()
        .find(|pack| pack.id == id)
        .map(|pack| pack.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeRemote {
        packs: Vec<ReportPackSummary>,
        fetched: Vec<(u64, String)>,
        deleted: Vec<(u64, String)>,
        stored: Vec<Vec<u8>>,
        root: PathBuf,
    }

    impl RemoteObjects for FakeRemote {
        fn list_pinned(&mut self) -> Result<Vec<ReportPackSummary>> {
            Ok(self.packs.iter().take(1).cloned().collect())
        }

        fn list_all(&mut self) -> Result<Vec<ReportPackSummary>> {
            Ok(self.packs.clone())
        }

        fn fetch(&mut self, id: u64, name: &str) -> Result<PathBuf> {
            self.fetched.push((id, name.to_string()));
            Ok(self.root.join(format!("{name}.arp")))
        }

        fn store(&mut self, archive: &[u8]) -> Result<StoredReportPack> {
            self.stored.push(archive.to_vec());
            Ok(StoredReportPack {
                id: 99,
                name: "Uploaded".into(),
            })
        }

        fn delete(&mut self, id: u64, name: &str) -> Result<u64> {
            self.deleted.push((id, name.to_string()));
            Ok(id)
        }
    }

    fn facade() -> ReportPacks<FakeRemote> {
        let remote = FakeRemote {
            packs: vec![
                ReportPackSummary::new(3, "VMware"),
                ReportPackSummary::new(12, "Exchange"),
            ],
            ..Default::default()
        };
        ReportPacks::new(remote, "reports")
    }

    #[test]
    fn resolves_name_from_id() {
        assert_eq!(facade().resolve_name(12).unwrap(), "Exchange");
    }

    #[test]
    fn unknown_id_never_reaches_fetch_or_delete() {
        let mut packs = facade();
        assert!(matches!(packs.get(999, false), Err(Error::Resolution { id: 999 })));
        assert!(matches!(packs.remove(999), Err(Error::Resolution { id: 999 })));
        assert!(packs.remote().fetched.is_empty());
        assert!(packs.remote().deleted.is_empty());
    }

    #[test]
    fn get_fetches_with_resolved_name() {
        let mut packs = facade();
        let fetched = packs.get(3, false).unwrap();
        assert_eq!(fetched.name, "VMware");
        assert_eq!(fetched.unpacked, None);
        assert_eq!(packs.remote().fetched, vec![(3, "VMware".to_string())]);
    }

    #[test]
    fn remove_deletes_with_resolved_name() {
        let mut packs = facade();
        let removed = packs.remove(12).unwrap();
        assert_eq!(removed, ReportPackSummary::new(12, "Exchange"));
        assert_eq!(packs.remote().deleted, vec![(12, "Exchange".to_string())]);
    }

    #[test]
    fn put_named_builds_then_uploads() {
        let temp = tempfile::tempdir().unwrap();
        let pack_dir = temp.path().join("Storage");
        fs::create_dir_all(pack_dir.join("META-INF")).unwrap();
        fs::write(pack_dir.join("META-INF/manifest.txt"), "v1").unwrap();

        let mut packs = ReportPacks::new(FakeRemote::default(), temp.path());
        let stored = packs.put_named("Storage").unwrap();
        assert_eq!(stored.id, 99);
        let uploaded = &packs.remote().stored[0];
        assert_eq!(uploaded, &fs::read(temp.path().join("Storage.arp")).unwrap());
        assert!(uploaded.starts_with(b"PK"));
    }

    #[test]
    fn put_named_without_directory_uploads_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let mut packs = ReportPacks::new(FakeRemote::default(), temp.path());
        assert!(matches!(
            packs.put_named("Missing"),
            Err(Error::ArchiveSource { .. })
        ));
        assert!(packs.remote().stored.is_empty());
    }
}
