//! Registry durability across process restarts.

mod common;

use vtn_fleet::fleet::JsonFileStore;
use vtn_fleet::fleet::record::CHECK_IN_CAPACITY;

use common::{at, open_registry};

#[tokio::test]
async fn reopened_registry_matches_previous_state() {
    let dir = tempfile::tempdir().unwrap();

    let before = {
        let registry = open_registry(dir.path()).await;
        for name in ["ven_1", "ven_2", "ven_3"] {
            registry.register(name).await.unwrap();
        }
        registry.remove("ven_2").await.unwrap();
        for i in 0..15 {
            registry
                .record_report("ven_1", i as f64, "voltage", at(i * 10))
                .await
                .unwrap();
        }
        registry.close().await.unwrap();
        registry.list_all().await
    };

    let registry = open_registry(dir.path()).await;
    let after = registry.list_all().await;

    assert_eq!(after, before);
    let names: Vec<&str> = after.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["ven_1", "ven_3"]);
    assert_eq!(after[0].check_in_history.len(), CHECK_IN_CAPACITY);
    assert_eq!(after[0].check_in_history.iter().next(), Some(&at(50)));
}

#[tokio::test]
async fn every_mutation_is_written_before_returning() {
    let dir = tempfile::tempdir().unwrap();
    let registry = open_registry(dir.path()).await;
    let record = registry.register("ven_1").await.unwrap();

    let path = JsonFileStore::new(dir.path()).path().to_path_buf();
    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["ven_1"]["resource_id"], record.resource_id.as_str());
    assert!(on_disk["ven_1"]["check_in_history"].as_array().unwrap().is_empty());

    registry.record_report("ven_1", 5.0, "power", at(0)).await.unwrap();
    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["ven_1"]["last_report_value"], 5.0);
    assert_eq!(on_disk["ven_1"]["check_in_history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn oversized_history_on_disk_is_truncated_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let stamps: Vec<String> = (0..14).map(|i| at(i * 10).to_rfc3339()).collect();
    let doc = serde_json::json!({
        "ven_9": {
            "name": "ven_9",
            "resource_id": "r-9",
            "registration_id": "reg-9",
            "check_in_history": stamps,
        }
    });
    std::fs::write(dir.path().join(JsonFileStore::FILE_NAME), doc.to_string()).unwrap();

    let registry = open_registry(dir.path()).await;
    let record = registry.lookup_by_id("r-9").await.unwrap();
    assert_eq!(record.check_in_history.len(), CHECK_IN_CAPACITY);
    assert_eq!(record.check_in_history.iter().next(), Some(&at(40)));
    assert!(record.last_report_value.is_none());
}
