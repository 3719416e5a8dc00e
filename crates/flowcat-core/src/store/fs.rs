//! Filesystem spec store
//!
//! One pretty-printed JSON file per spec at `<root>/<group>/<name>.json`.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! reader never sees a partial file. Group directories are never removed, so a
//! concurrent write into the same group cannot lose its directory.

use super::{SpecStore, StoreError};
use async_trait::async_trait;
use flowcat_spec::{FlowId, FlowSpec};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

const SPEC_EXTENSION: &str = "json";

/// Store rooted at a directory
#[derive(Debug)]
pub struct FsSpecStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl FsSpecStore {
    /// Create store rooted at `root`; the directory is created on init
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    /// Store root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding `id`
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidKey`] unless group and name are each a
    /// single plain path segment
    pub fn path_for(&self, id: &FlowId) -> Result<PathBuf, StoreError> {
        if !is_plain_segment(id.group()) || !is_plain_segment(id.name()) {
            return Err(StoreError::InvalidKey(id.clone()));
        }
        Ok(self
            .root
            .join(id.group())
            .join(format!("{}.{SPEC_EXTENSION}", id.name())))
    }

    fn tmp_path_for(&self, path: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".tmp-{}-{n}", std::process::id()));
        path.with_file_name(name)
    }

    async fn read_spec(path: &Path) -> Result<Option<FlowSpec>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

#[async_trait]
impl SpecStore for FsSpecStore {
    fn name(&self) -> &'static str {
        "fs"
    }

    async fn init(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))
    }

    async fn get(&self, id: &FlowId) -> Result<Option<FlowSpec>, StoreError> {
        let path = self.path_for(id)?;
        let spec = Self::read_spec(&path).await?;
        match spec {
            Some(spec) if spec.id != *id => Err(StoreError::Corrupt {
                path,
                reason: format!("file holds flow {}", spec.id),
            }),
            other => Ok(other),
        }
    }

    async fn put(&self, spec: &FlowSpec) -> Result<(), StoreError> {
        let path = self.path_for(&spec.id)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::io(dir, e))?;
        }

        let bytes = serde_json::to_vec_pretty(spec)?;
        let tmp = self.tmp_path_for(&path);
        fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::io(&path, e));
        }
        Ok(())
    }

    async fn delete(&self, id: &FlowId) -> Result<bool, StoreError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    async fn exists(&self, id: &FlowId) -> Result<bool, StoreError> {
        let path = self.path_for(id)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))
    }

    async fn get_all(&self) -> Result<Vec<FlowSpec>, StoreError> {
        let mut specs = Vec::new();
        let mut groups = match fs::read_dir(&self.root).await {
            Ok(groups) => groups,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(specs),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };

        while let Some(group) = groups
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.root, e))?
        {
            let group_path = group.path();
            if !group_path.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(&group_path)
                .await
                .map_err(|e| StoreError::io(&group_path, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StoreError::io(&group_path, e))?
            {
                let path = entry.path();
                // Skips in-flight temp files too
                if path.extension().and_then(|e| e.to_str()) != Some(SPEC_EXTENSION) {
                    continue;
                }
                if let Some(spec) = Self::read_spec(&path).await? {
                    specs.push(spec);
                }
            }
        }
        Ok(specs)
    }
}

fn is_plain_segment(component: &str) -> bool {
    let mut parts = Path::new(component).components();
    matches!(
        (parts.next(), parts.next()),
        (Some(Component::Normal(part)), None) if part == component
    ) && !component.contains(['\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcat_spec::{ScheduleSpec, ServiceRequester, REQUESTER_LIST_KEY};
    use pretty_assertions::assert_eq;

    fn full_spec() -> FlowSpec {
        let mut spec = FlowSpec::new(FlowId::new("testGroup", "testFlow"), "FS:///templates/test.template")
            .with_schedule(ScheduleSpec::cron("0 0 12 * * *").with_run_immediately(true))
            .with_property("param1", "value1")
            .with_owning_group("ops");
        spec.set_requesters(&[ServiceRequester::user("testName", "testFrom")])
            .unwrap();
        spec
    }

    #[tokio::test]
    async fn round_trips_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSpecStore::new(dir.path());
        store.init().await.unwrap();

        let spec = full_spec();
        store.put(&spec).await.unwrap();

        assert!(store
            .path_for(&spec.id)
            .unwrap()
            .ends_with("testGroup/testFlow.json"));
        let loaded = store.get(&spec.id).await.unwrap().unwrap();
        assert_eq!(loaded, spec);
        assert!(loaded.properties.contains_key(REQUESTER_LIST_KEY));
        assert_eq!(loaded.fingerprint().unwrap(), spec.fingerprint().unwrap());
    }

    #[tokio::test]
    async fn lists_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSpecStore::new(dir.path());

        let a = full_spec();
        let b = FlowSpec::new(FlowId::new("other", "flow"), "FS:///t.template");
        store.put(&a).await.unwrap();
        store.put(&b).await.unwrap();
        std::fs::write(dir.path().join("other").join("flow.json.tmp-1-0"), b"{").unwrap();

        let mut all = store.get_all().await.unwrap();
        all.sort_by(|x, y| x.id.cmp(&y.id));
        assert_eq!(all, vec![b.clone(), a.clone()]);

        assert!(store.delete(&a.id).await.unwrap());
        assert!(!store.exists(&a.id).await.unwrap());
        assert!(dir.path().join("testGroup").is_dir());
        assert!(!store.delete(&a.id).await.unwrap());
    }

    #[tokio::test]
    async fn missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSpecStore::new(dir.path().join("absent"));
        assert!(store.get_all().await.unwrap().is_empty());
        assert_eq!(store.get(&FlowId::new("g", "n")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn misplaced_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSpecStore::new(dir.path());
        let spec = full_spec();
        store.put(&spec).await.unwrap();

        let moved = FlowId::new("testGroup", "elsewhere");
        std::fs::copy(
            store.path_for(&spec.id).unwrap(),
            store.path_for(&moved).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            store.get(&moved).await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn ids_outside_root_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let store = FsSpecStore::new(&root);
        store.init().await.unwrap();

        for id in [
            FlowId::new("..", "escaped"),
            FlowId::new("g", ".."),
            FlowId::new(".", "n"),
            FlowId::new("a/b", "n"),
            FlowId::new("g", ""),
        ] {
            assert!(matches!(store.path_for(&id), Err(StoreError::InvalidKey(_))), "{id}");
            let spec = FlowSpec::new(id.clone(), "FS:///t.template");
            assert!(matches!(store.put(&spec).await, Err(StoreError::InvalidKey(_))));
            assert!(store.delete(&id).await.is_err());
        }
        assert!(!dir.path().join("escaped.json").exists());
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_delete_and_put_in_one_group() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FsSpecStore::new(dir.path()));

        for round in 0..50 {
            let doomed = FlowSpec::new(FlowId::new("shared", format!("a{round}")), "FS:///t.template");
            store.put(&doomed).await.unwrap();

            let deleter = {
                let store = store.clone();
                let id = doomed.id.clone();
                tokio::spawn(async move { store.delete(&id).await })
            };
            let fresh = FlowSpec::new(FlowId::new("shared", format!("b{round}")), "FS:///t.template");
            store.put(&fresh).await.unwrap();
            assert!(deleter.await.unwrap().unwrap());
            assert_eq!(store.get(&fresh.id).await.unwrap(), Some(fresh));
        }
    }
}
