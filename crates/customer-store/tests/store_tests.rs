use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use customer_store::{CustomerIdStore, SqliteCustomerStore};

#[tokio::test]
async fn set_get_delete_round() {
    let path = temp_db_path("set_get_delete_round");
    let store = SqliteCustomerStore::open(path.to_str().expect("path"))
        .await
        .expect("open");

    assert_eq!(store.get().await.expect("get"), None);

    store.set("11111111").await.expect("set");
    assert_eq!(store.get().await.expect("get").as_deref(), Some("11111111"));

    store.set("22222222").await.expect("overwrite");
    assert_eq!(store.get().await.expect("get").as_deref(), Some("22222222"));

    store.delete().await.expect("delete");
    assert_eq!(store.get().await.expect("get"), None);

    store.close().await;
    cleanup_db(&path);
}

#[tokio::test]
async fn identity_survives_reopen() {
    let path = temp_db_path("identity_survives_reopen");
    let path_str = path.to_str().expect("path").to_string();

    let store = SqliteCustomerStore::open(&path_str).await.expect("open");
    store.set("11111111").await.expect("set");
    store.close().await;

    let reopened = SqliteCustomerStore::open(&path_str).await.expect("reopen");
    assert_eq!(reopened.get().await.expect("get").as_deref(), Some("11111111"));

    reopened.close().await;
    cleanup_db(&path);
}

#[tokio::test]
async fn delete_on_empty_store_is_noop() {
    let store = SqliteCustomerStore::open(":memory:").await.expect("open");
    store.delete().await.expect("delete");
    assert_eq!(store.get().await.expect("get"), None);
}

#[tokio::test]
async fn memory_store_keeps_identity_across_calls() {
    let store = SqliteCustomerStore::open(":memory:").await.expect("open");
    store.set("abc").await.expect("set");
    assert_eq!(store.get().await.expect("get").as_deref(), Some("abc"));
}

fn temp_db_path(prefix: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let pid = std::process::id();
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    path.push(format!("{prefix}-{pid}-{ts}.sqlite"));
    path
}

fn cleanup_db(path: &PathBuf) {
    let _ = std::fs::remove_file(path);
    let wal = PathBuf::from(format!("{}-wal", path.display()));
    let shm = PathBuf::from(format!("{}-shm", path.display()));
    let _ = std::fs::remove_file(wal);
    let _ = std::fs::remove_file(shm);
}
