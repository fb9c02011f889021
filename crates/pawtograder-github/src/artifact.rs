//! Grader artifact cache-aside retrieval.
//!
//! Grader tarballs are content-addressed by repository and commit SHA, so a
//! stored object never goes stale. A lookup resolves the default branch head,
//! tries to sign a URL for the stored tarball and, only on a miss, downloads
//! the tarball from GitHub and uploads it before signing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use pawtograder_opendal::{SignedUrl, StorageBackend};

use crate::{
    Error, ErrorKind, InstallationClient, RepositoryName, Result, TRACING_TARGET_ARTIFACT,
};

/// Lifetime of signed grader download URLs.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60);

/// Content type of stored grader tarballs.
const TARBALL_CONTENT_TYPE: &str = "application/gzip";

/// Returns the storage key of the grader tarball for a commit.
pub fn artifact_key(repository: &RepositoryName, sha: &str) -> String {
    format!("{repository}/{sha}/grader.tgz")
}

/// Object storage as seen by the artifact cache.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Signs a download URL, or returns `None` if the object does not exist.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<Option<SignedUrl>>;

    /// Stores an object, replacing any existing content.
    async fn upload(&self, key: &str, data: Bytes) -> Result<()>;
}

#[async_trait::async_trait]
impl ArtifactStore for StorageBackend {
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<Option<SignedUrl>> {
        match StorageBackend::signed_url(self, key, ttl).await {
            Ok(url) => Ok(Some(url)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn upload(&self, key: &str, data: Bytes) -> Result<()> {
        self.write(key, data, Some(TARBALL_CONTENT_TYPE)).await?;
        Ok(())
    }
}

/// Where grader sources come from.
#[async_trait::async_trait]
pub trait RepositorySource: Send + Sync {
    /// Returns the commit SHA at the head of the default branch.
    async fn head_sha(&self, repository: &RepositoryName) -> Result<String>;

    /// Downloads the repository tarball at a commit.
    async fn download_tarball(&self, repository: &RepositoryName, sha: &str) -> Result<Bytes>;
}

#[async_trait::async_trait]
impl RepositorySource for InstallationClient {
    async fn head_sha(&self, repository: &RepositoryName) -> Result<String> {
        InstallationClient::head_sha(self, repository).await
    }

    async fn download_tarball(&self, repository: &RepositoryName, sha: &str) -> Result<Bytes> {
        InstallationClient::download_tarball(self, repository, sha).await
    }
}

/// Resolves which repository holds the grader for a student repository.
#[async_trait::async_trait]
pub trait GraderRepositoryLookup: Send + Sync {
    /// Returns the grader repository, or `None` if the repository is not an
    /// assignment repository.
    async fn grader_repository(
        &self,
        repository: &RepositoryName,
    ) -> Result<Option<RepositoryName>>;
}

/// A signed grader download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraderArtifact {
    /// Grader repository.
    pub repository: RepositoryName,
    /// Commit the tarball was built from.
    pub sha: String,
    /// Storage key of the tarball.
    pub key: String,
    /// Signed download URL.
    pub url: SignedUrl,
    /// `false` if this call uploaded the tarball.
    pub cached: bool,
}

type KeyLock = Arc<tokio::sync::Mutex<()>>;
type KeyLocks = HashMap<String, KeyLock>;

/// Shared handle on the population lock of one key.
///
/// Dropping the last handle removes the key from the map, also when the
/// owning future is cancelled mid-population.
struct KeyLockGuard {
    locks: Arc<Mutex<KeyLocks>>,
    key: String,
    lock: KeyLock,
}

impl KeyLockGuard {
    fn acquire(locks: &Arc<Mutex<KeyLocks>>, key: &str) -> Self {
        let lock = locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_owned())
            .or_default()
            .clone();

        Self {
            locks: locks.clone(),
            key: key.to_owned(),
            lock,
        }
    }
}

impl Drop for KeyLockGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Release our handle under the map lock so the count below is exact.
        drop(std::mem::take(&mut self.lock));
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

/// Cache-aside front for grader tarballs in object storage.
///
/// Population of a key is serialized within the process: concurrent callers
/// for the same uncached commit wait for the first one and then take the
/// cache-hit path, so each tarball is downloaded and uploaded once.
#[derive(Clone)]
pub struct GraderArtifactCache {
    store: Arc<dyn ArtifactStore>,
    ttl: Duration,
    locks: Arc<Mutex<KeyLocks>>,
}

impl GraderArtifactCache {
    /// Creates a cache over the given store.
    pub fn new(store: impl ArtifactStore + 'static) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Creates a cache over a shared store.
    pub fn from_arc(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            ttl: SIGNED_URL_TTL,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Overrides the signed URL lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns a signed URL for the grader tarball at the default branch head.
    pub async fn fetch(
        &self,
        source: &dyn RepositorySource,
        repository: &RepositoryName,
    ) -> Result<GraderArtifact> {
        let sha = source.head_sha(repository).await?;
        let key = artifact_key(repository, &sha);

        if let Some(url) = self.store.signed_url(&key, self.ttl).await? {
            tracing::debug!(
                target: TRACING_TARGET_ARTIFACT,
                key = %key,
                "Grader artifact cache hit"
            );
            return Ok(self.artifact(repository, sha, key, url, true));
        }

        let key_lock = KeyLockGuard::acquire(&self.locks, &key);
        let _populating = key_lock.lock.lock().await;
        self.populate(source, repository, sha, &key).await
    }

    async fn populate(
        &self,
        source: &dyn RepositorySource,
        repository: &RepositoryName,
        sha: String,
        key: &str,
    ) -> Result<GraderArtifact> {
        // Another caller may have built it while we waited.
        if let Some(url) = self.store.signed_url(key, self.ttl).await? {
            return Ok(self.artifact(repository, sha, key.to_owned(), url, true));
        }

        tracing::info!(
            target: TRACING_TARGET_ARTIFACT,
            repository = %repository,
            sha = %sha,
            "Grader artifact cache miss, building"
        );

        let data = source.download_tarball(repository, &sha).await?;
        let size = data.len();
        self.store.upload(key, data).await?;

        let url = self.store.signed_url(key, self.ttl).await?.ok_or_else(|| {
            Error::new(ErrorKind::Storage)
                .with_message(format!("Uploaded grader artifact {key} is not readable"))
        })?;

        tracing::info!(
            target: TRACING_TARGET_ARTIFACT,
            key = %key,
            size,
            "Grader artifact uploaded"
        );

        Ok(self.artifact(repository, sha, key.to_owned(), url, false))
    }

    fn artifact(
        &self,
        repository: &RepositoryName,
        sha: String,
        key: String,
        url: SignedUrl,
        cached: bool,
    ) -> GraderArtifact {
        GraderArtifact {
            repository: repository.clone(),
            sha,
            key,
            url,
            cached,
        }
    }

    #[cfg(test)]
    fn pending_keys(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for GraderArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraderArtifactCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::join_all;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<HashMap<String, Bytes>>,
        uploads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ArtifactStore for MemoryStore {
        async fn signed_url(&self, key: &str, ttl: Duration) -> Result<Option<SignedUrl>> {
            let objects = self.objects.lock().unwrap();
            Ok(objects.contains_key(key).then(|| SignedUrl {
                url: format!("https://storage.test/{key}?sig=abc"),
                expires_in: ttl,
            }))
        }

        async fn upload(&self, key: &str, data: Bytes) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.uploads.fetch_add(1, Ordering::SeqCst);
            self.objects.lock().unwrap().insert(key.to_owned(), data);
            Ok(())
        }
    }

    struct FakeSource {
        sha: Option<&'static str>,
        download_time: Duration,
        downloads: AtomicUsize,
    }

    impl FakeSource {
        fn at(sha: &'static str) -> Self {
            Self {
                sha: Some(sha),
                download_time: Duration::from_millis(20),
                downloads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl RepositorySource for FakeSource {
        async fn head_sha(&self, repository: &RepositoryName) -> Result<String> {
            self.sha.map(str::to_owned).ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message(format!("No default branch for {repository}"))
            })
        }

        async fn download_tarball(&self, _: &RepositoryName, _: &str) -> Result<Bytes> {
            tokio::time::sleep(self.download_time).await;
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"grader tarball"))
        }
    }

    fn repository() -> RepositoryName {
        "pawtograder-org/hw1-solution".parse().unwrap()
    }

    #[tokio::test]
    async fn miss_downloads_uploads_and_signs() {
        let store = Arc::new(MemoryStore::default());
        let cache = GraderArtifactCache::from_arc(store.clone());
        let source = FakeSource::at("abc123");

        let artifact = cache.fetch(&source, &repository()).await.unwrap();

        assert!(!artifact.cached);
        assert_eq!(artifact.sha, "abc123");
        assert_eq!(artifact.key, "pawtograder-org/hw1-solution/abc123/grader.tgz");
        assert_eq!(artifact.url.expires_in, SIGNED_URL_TTL);
        assert_eq!(source.downloads.load(Ordering::SeqCst), 1);
        assert_eq!(store.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.objects.lock().unwrap()[&artifact.key],
            Bytes::from_static(b"grader tarball")
        );
    }

    #[tokio::test]
    async fn hit_skips_download() {
        let store = Arc::new(MemoryStore::default());
        store.objects.lock().unwrap().insert(
            artifact_key(&repository(), "abc123"),
            Bytes::from_static(b"cached"),
        );
        let cache = GraderArtifactCache::from_arc(store.clone());
        let source = FakeSource::at("abc123");

        let artifact = cache.fetch(&source, &repository()).await.unwrap();

        assert!(artifact.cached);
        assert_eq!(source.downloads.load(Ordering::SeqCst), 0);
        assert_eq!(store.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_misses_build_once() {
        let store = Arc::new(MemoryStore::default());
        let cache = GraderArtifactCache::from_arc(store.clone());
        let source = FakeSource::at("abc123");
        let repository = repository();

        let results = join_all((0..8).map(|_| cache.fetch(&source, &repository))).await;

        let artifacts: Vec<_> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(artifacts.iter().filter(|a| !a.cached).count(), 1);
        assert!(artifacts.iter().all(|a| a.url == artifacts[0].url));
        assert_eq!(source.downloads.load(Ordering::SeqCst), 1);
        assert_eq!(store.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.pending_keys(), 0);
    }

    #[tokio::test]
    async fn new_commit_builds_new_artifact() {
        let store = Arc::new(MemoryStore::default());
        let cache = GraderArtifactCache::from_arc(store.clone());

        cache
            .fetch(&FakeSource::at("abc123"), &repository())
            .await
            .unwrap();
        let artifact = cache
            .fetch(&FakeSource::at("def456"), &repository())
            .await
            .unwrap();

        assert!(!artifact.cached);
        assert_eq!(store.uploads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn head_resolution_failure_is_fatal() {
        let store = Arc::new(MemoryStore::default());
        let cache = GraderArtifactCache::from_arc(store.clone());
        let source = FakeSource {
            sha: None,
            ..FakeSource::at("unused")
        };

        let error = cache.fetch(&source, &repository()).await.unwrap_err();

        assert!(error.is_not_found());
        assert_eq!(store.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_fetches_release_key_locks() {
        let store = Arc::new(MemoryStore::default());
        let cache = GraderArtifactCache::from_arc(store.clone());
        let source = FakeSource {
            download_time: Duration::from_secs(60),
            ..FakeSource::at("abc123")
        };

        for _ in 0..5 {
            let repository = repository();
            let fetch = cache.fetch(&source, &repository);
            let timed_out = tokio::time::timeout(Duration::from_millis(20), fetch).await;
            assert!(timed_out.is_err());
        }

        assert_eq!(cache.pending_keys(), 0);
        assert_eq!(store.uploads.load(Ordering::SeqCst), 0);
    }
}
