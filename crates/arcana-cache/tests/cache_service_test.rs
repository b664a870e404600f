//! Integration tests for the store client against the in-memory transport.

mod common;

use arcana_cache::{CacheExt, CacheInterface, CacheValue, ConnectionState};
use common::{assert_ready, keys, TestCache};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
}

#[tokio::test]
async fn test_set_get_ttl_scenario() {
    let cache = TestCache::new().client().await;
    let ann = Profile {
        name: "Ann".to_string(),
    };

    assert!(cache.set("user:1", &ann, Some(60)).await.unwrap());
    assert_eq!(cache.get::<Profile>("user:1").await.unwrap(), Some(ann));

    let ttl = cache.ttl("user:1").await;
    assert!(ttl > 0 && ttl <= 60, "ttl was {ttl}");
}

#[tokio::test]
async fn test_get_after_del_is_absent() {
    let cache = TestCache::new().client().await;

    cache.set("k", "v", None).await.unwrap();
    assert!(cache.del("k").await);
    assert_eq!(cache.get::<String>("k").await.unwrap(), None);
    assert!(!cache.del("k").await);
}

#[tokio::test]
async fn test_default_ttl_applies() {
    let cache = TestCache::new().client().await;

    cache.set("k", &1, None).await.unwrap();
    let ttl = cache.ttl("k").await;
    assert!(ttl > 3_590 && ttl <= 3_600, "ttl was {ttl}");
}

#[tokio::test]
async fn test_ttl_conventions() {
    let test = TestCache::new();
    let cache = test.client().await;
    test.store().insert_persistent("forever", "x");

    assert_eq!(cache.ttl("forever").await, -1);
    assert_eq!(cache.ttl("missing").await, -2);
}

#[tokio::test]
async fn test_strings_are_stored_raw() {
    let test = TestCache::new();
    let cache = test.client().await;

    cache.set("greeting", "hello", None).await.unwrap();
    cache.set("count", &42, None).await.unwrap();

    assert_eq!(cache.get_raw("greeting").await.unwrap().as_deref(), Some("hello"));
    assert_eq!(cache.get_raw("count").await.unwrap().as_deref(), Some("42"));
    assert_eq!(cache.get::<String>("greeting").await.unwrap().as_deref(), Some("hello"));
    assert_eq!(cache.get::<u32>("count").await.unwrap(), Some(42));
}

#[tokio::test]
async fn test_get_value_is_permissive() {
    let test = TestCache::new();
    let cache = test.client().await;
    test.store().insert_persistent("broken", "not json{{");
    test.store().insert_persistent("nothing", "null");

    assert_eq!(
        cache.get_value("broken").await.unwrap(),
        Some(CacheValue::Text("not json{{".to_string()))
    );
    assert_eq!(cache.get_value("nothing").await.unwrap(), Some(CacheValue::Null));
    assert_eq!(cache.get::<Profile>("nothing").await.unwrap(), None);
    assert_eq!(cache.get_value("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_del_many() {
    let cache = TestCache::new().client().await;

    assert_eq!(cache.del_many(&[]).await, 0);

    cache.set("k1", "v", None).await.unwrap();
    assert_eq!(cache.del_many(&keys(&["k1", "k2"])).await, 1);
}

#[tokio::test]
async fn test_exists_and_expire() {
    let cache = TestCache::new().client().await;

    assert!(!cache.exists("k").await);
    assert!(!cache.expire("k", 10).await);

    cache.set("k", "v", Some(100)).await.unwrap();
    assert!(cache.exists("k").await);
    assert!(cache.expire("k", 10).await);
    assert!(cache.ttl("k").await <= 10);
}

#[tokio::test]
async fn test_keys_and_delete_pattern() {
    let cache = TestCache::new().client().await;
    for key in ["user:1", "user:2", "session:1"] {
        cache.set(key, "v", None).await.unwrap();
    }

    assert_eq!(cache.keys("user:*").await, keys(&["user:1", "user:2"]));
    assert!(cache.keys("nope:*").await.is_empty());
    assert_eq!(cache.delete_pattern("user:*").await, 2);
    assert_eq!(cache.keys("*").await, keys(&["session:1"]));
}

#[tokio::test]
async fn test_flush_all() {
    let test = TestCache::new();
    let cache = test.client().await;
    cache.set("a", "1", None).await.unwrap();
    cache.set("b", "2", None).await.unwrap();

    assert!(cache.flush_all().await);
    assert!(test.store().is_empty());
}

#[tokio::test]
async fn test_get_or_set_computes_once() {
    let cache = TestCache::new().client().await;

    let first: Result<u32, arcana_cache::CacheError> = cache.get_or_set("answer", None, || async { Ok(42) }).await;
    assert_eq!(first.unwrap(), 42);

    let second: Result<u32, arcana_cache::CacheError> = cache.get_or_set("answer", None, || async { Ok(7) }).await;
    assert_eq!(second.unwrap(), 42);
}

#[tokio::test(start_paused = true)]
async fn test_entries_expire_after_ttl() {
    let cache = TestCache::new().client().await;

    cache.set("short", "v", Some(1)).await.unwrap();
    tokio::time::advance(Duration::from_millis(1_100)).await;

    assert_eq!(cache.get::<String>("short").await.unwrap(), None);
    assert_eq!(cache.ttl("short").await, -2);
}

#[tokio::test]
async fn test_lifecycle_states() {
    let test = TestCache::new();
    let cache = test.client().await;
    assert_ready(cache.as_ref(), true);

    cache.shutdown().await;
    assert_eq!(cache.state(), ConnectionState::Closed);
    assert!(cache.get_raw("k").await.is_err());
    assert!(!cache.set("k", "v", None).await.unwrap());

    cache.initialize().await.unwrap();
    assert_ready(cache.as_ref(), true);
}

#[tokio::test]
async fn test_unavailable_store_degrades_writes() {
    let test = TestCache::new();
    let cache = test.client().await;

    test.set_unavailable(true);

    assert!(cache.get_raw("k").await.is_err());
    assert!(!cache.set("k", "v", None).await.unwrap());
    assert_eq!(cache.ttl("k").await, 0);
    assert!(cache.keys("*").await.is_empty());
}
