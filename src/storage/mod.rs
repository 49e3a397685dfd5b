mod directory;
mod http;

pub use directory::DirectoryStore;
pub use http::HttpStore;

use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default key prefix for game cover photos.
pub const DEFAULT_KEY_PREFIX: &str = "Images/Events";

/// Object storage that keeps normalized images and hands back a URL.
///
/// The crate ships with two implementations: [`DirectoryStore`] for local
/// use and tests, and [`HttpStore`] for any service that accepts a `PUT`
/// of the object body.
///
/// # Example
///
/// ```rust,no_run
/// use upright::storage::{DirectoryStore, ObjectStore, object_key, now_millis};
///
/// # async fn example(jpeg: Vec<u8>) -> anyhow::Result<()> {
/// let store = DirectoryStore::new("./uploads");
/// let url = store.store(&object_key("Images/Events", now_millis()), &jpeg).await?;
/// println!("Stored at {url}");
/// # Ok(())
/// # }
/// ```
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// The display name of this store (e.g., "directory", "http").
    fn name(&self) -> &str;
    /// Store `bytes` as a JPEG under `key` and return the URL it can be fetched from.
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<String>;
}

/// Build the object key for an upload made at `millis` since the Unix epoch.
///
/// ```rust
/// use upright::storage::object_key;
///
/// assert_eq!(object_key("Images/Events", 1700000000000), "Images/Events/1700000000000.jpg");
/// assert_eq!(object_key("", 42), "42.jpg");
/// ```
pub fn object_key(prefix: &str, millis: u128) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{millis}.jpg")
    } else {
        format!("{prefix}/{millis}.jpg")
    }
}

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Last value handed out by [`unique_millis`].
static LAST_ISSUED: AtomicU64 = AtomicU64::new(0);

/// Like [`now_millis`], but strictly increasing within this process, so
/// uploads in the same millisecond still get distinct object keys.
///
/// A repeat is bumped one past the last value issued.
pub fn unique_millis() -> u128 {
    let now = u64::try_from(now_millis()).unwrap_or(u64::MAX);
    let mut last = LAST_ISSUED.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_ISSUED.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return u128::from(next),
            Err(actual) => last = actual,
        }
    }
}
