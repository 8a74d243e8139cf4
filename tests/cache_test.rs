use std::time::Duration;

use cloudmeta::cache::DiskCache;
use serde_json::json;

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_put_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::new(dir.path().join("cache"));
    let p = params(&[("keywords", "Jay Chou"), ("type", "100")]);
    let value = json!({"result": {"artists": [{"id": 1}]}});

    assert_eq!(cache.get("search", &p).await.unwrap(), None);
    cache.put("search", &p, &value).await.unwrap();
    assert_eq!(cache.get("search", &p).await.unwrap(), Some(value.clone()));

    // Parameter order does not matter for lookups
    let reordered = params(&[("type", "100"), ("keywords", "Jay Chou")]);
    assert_eq!(cache.get("search", &reordered).await.unwrap(), Some(value));
}

#[tokio::test]
async fn test_entries_survive_a_new_handle() {
    let dir = tempfile::tempdir().unwrap();
    let p = params(&[("id", "42")]);

    DiskCache::new(dir.path())
        .put("artist/detail", &p, &json!({"code": 200}))
        .await
        .unwrap();

    let reopened = DiskCache::new(dir.path());
    assert_eq!(
        reopened.get("artist/detail", &p).await.unwrap(),
        Some(json!({"code": 200}))
    );
}

#[tokio::test]
async fn test_expired_entries_are_misses() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::with_ttl(dir.path(), Duration::ZERO);
    let p = params(&[("id", "1")]);

    cache.put("lyric", &p, &json!({"lrc": null})).await.unwrap();
    assert_eq!(cache.get("lyric", &p).await.unwrap(), None);
    // The expired file was removed on read
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_clear_removes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("cache");
    let cache = DiskCache::new(&root);

    cache.put("search", &params(&[("a", "1")]), &json!(1)).await.unwrap();
    cache.put("search", &params(&[("a", "2")]), &json!(2)).await.unwrap();
    cache.clear().await.unwrap();

    assert!(!root.exists());
    assert_eq!(cache.get("search", &params(&[("a", "1")])).await.unwrap(), None);

    // Clearing a missing directory is fine
    cache.clear().await.unwrap();
}

#[tokio::test]
async fn test_purge_expired_only_drops_stale_entries() {
    let dir = tempfile::tempdir().unwrap();
    let fresh = DiskCache::new(dir.path());
    fresh.put("search", &params(&[("a", "1")]), &json!(1)).await.unwrap();
    std::fs::write(dir.path().join("garbage.json"), "not json").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    assert_eq!(fresh.purge_expired().await.unwrap(), 1);
    assert!(dir.path().join("notes.txt").exists());
    assert_eq!(
        fresh.get("search", &params(&[("a", "1")])).await.unwrap(),
        Some(json!(1))
    );

    let stale = DiskCache::with_ttl(dir.path(), Duration::ZERO);
    assert_eq!(stale.purge_expired().await.unwrap(), 1);
    assert_eq!(stale.purge_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn test_purge_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::new(dir.path().join("never-created"));
    assert_eq!(cache.purge_expired().await.unwrap(), 0);
}
