use super::*;
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_memory_store_set_get_delete() {
    let store = MemoryStateStore::new();
    assert!(store.get_state("dsa_state").await.unwrap().is_none());

    store.set_state("dsa_state", json!({"position": 7})).await.unwrap();
    assert_eq!(
        store.get_state("dsa_state").await.unwrap(),
        Some(json!({"position": 7}))
    );

    store.delete_state("dsa_state").await.unwrap();
    assert!(store.get_state("dsa_state").await.unwrap().is_none());

    // deleting twice is fine
    store.delete_state("dsa_state").await.unwrap();
}

#[tokio::test]
async fn test_memory_store_clear() {
    let store = MemoryStateStore::new();
    store.set_state("a", json!(1)).await.unwrap();
    store.set_state("b", json!(2)).await.unwrap();
    assert_eq!(store.entries().await.unwrap().len(), 2);

    store.clear().await.unwrap();
    assert!(store.entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_store_persists_across_open() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = FileStateStore::open(temp_dir.path(), "agent-1").await.unwrap();
        store.set_state("agent_state", json!("STREAMING")).await.unwrap();
        store
            .set_state("dsa_state", json!({"file": "a.dat", "position": 1024}))
            .await
            .unwrap();
    }

    let store = FileStateStore::open(temp_dir.path(), "agent-1").await.unwrap();
    assert_eq!(
        store.get_state("agent_state").await.unwrap(),
        Some(json!("STREAMING"))
    );
    assert_eq!(
        store.get_state("dsa_state").await.unwrap().unwrap()["position"],
        1024
    );
}

#[tokio::test]
async fn test_file_store_agents_are_isolated() {
    let temp_dir = TempDir::new().unwrap();
    let a = FileStateStore::open(temp_dir.path(), "agent-a").await.unwrap();
    let b = FileStateStore::open(temp_dir.path(), "agent-b").await.unwrap();

    a.set_state("agent_state", json!("COMMAND")).await.unwrap();
    assert!(b.get_state("agent_state").await.unwrap().is_none());
    assert_ne!(a.path(), b.path());
}

#[tokio::test]
async fn test_file_store_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStateStore::open(temp_dir.path(), "agent").await.unwrap();
    store.set_state("k", json!(true)).await.unwrap();

    let mut names = Vec::new();
    let mut entries = fs::read_dir(temp_dir.path()).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    assert_eq!(names, vec!["agent.json".to_string()]);
}

#[tokio::test]
async fn test_file_store_delete_and_clear() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStateStore::open(temp_dir.path(), "agent").await.unwrap();
    store.set_state("a", json!(1)).await.unwrap();
    store.set_state("b", json!(2)).await.unwrap();

    store.delete_state("a").await.unwrap();
    let reopened = FileStateStore::open(temp_dir.path(), "agent").await.unwrap();
    assert!(reopened.get_state("a").await.unwrap().is_none());
    assert_eq!(reopened.get_state("b").await.unwrap(), Some(json!(2)));

    store.clear().await.unwrap();
    assert!(!store.path().exists());
    assert!(store.entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_store_rejects_non_object_document() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("agent.json"), "[1, 2, 3]").unwrap();

    let result = FileStateStore::open(temp_dir.path(), "agent").await;
    assert!(matches!(result, Err(StoreError::Corrupt { .. })));
}

#[tokio::test]
async fn test_file_store_empty_document_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("agent.json"), "").unwrap();

    let store = FileStateStore::open(temp_dir.path(), "agent").await.unwrap();
    assert!(store.entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_open_store_by_backend() {
    let temp_dir = TempDir::new().unwrap();
    let config = PersistenceConfig {
        backend: StoreBackend::File,
        path: temp_dir.path().to_path_buf(),
    };
    let store = open_store(&config, "ctd/01").await.unwrap();
    store.set_state("k", json!("v")).await.unwrap();
    assert!(temp_dir.path().join("ctd_01.json").exists());

    let config = PersistenceConfig {
        backend: StoreBackend::Memory,
        path: temp_dir.path().to_path_buf(),
    };
    let store = open_store(&config, "mem").await.unwrap();
    store.set_state("k", json!("v")).await.unwrap();
    assert!(!temp_dir.path().join("mem.json").exists());
}

#[test]
fn test_sanitize_id() {
    assert_eq!(FileStateStore::sanitize_id("simple-agent_1"), "simple-agent_1");
    assert_eq!(FileStateStore::sanitize_id("ctd/with/slashes"), "ctd_with_slashes");
    assert_eq!(FileStateStore::sanitize_id("agent:colon"), "agent_colon");
}
