use crate::{cache::DiskCache, config::Settings, error, success};

fn cache() -> DiskCache {
    match Settings::from_env() {
        Ok(settings) => DiskCache::new(settings.cache_dir),
        Err(_) => DiskCache::new(crate::config::data_dir().join("cache")),
    }
}

/// Removes the whole response cache directory.
pub async fn clear_cache() {
    let cache = cache();
    match cache.clear().await {
        Ok(()) => success!("Cleared cache at {}", cache.root().display()),
        Err(e) => error!("Cannot clear cache. Err: {}", e),
    }
}

pub async fn purge_cache() {
    match cache().purge_expired().await {
        Ok(removed) => success!("Removed {} expired cache entries.", removed),
        Err(e) => error!("Cannot purge cache. Err: {}", e),
    }
}
