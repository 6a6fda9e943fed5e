//! SQLite credential store tests
//!
//! Exercises the store contract on a temporary database file and runs the
//! duplicate self-heal over it.

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use umacred::operation::{OperationType, ResultState};
use umacred::store::{
    CredentialCollection, CredentialStore, SqliteCredentialStore, StoreOperation, StoreQuery,
};
use umacred::CredentialLookup;

fn create_temp_store() -> (SqliteCredentialStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = SqliteCredentialStore::new_with_path(tmp.path().join("credentials.db"))
        .expect("failed to create sqlite store with path");
    (store, tmp)
}

fn op(kind: OperationType, json: Value) -> StoreOperation {
    StoreOperation {
        kind,
        json,
        database: "resource-server".to_string(),
        collection: "credentials".to_string(),
    }
}

async fn create(store: &SqliteCredentialStore, data: Value) -> String {
    let resp = store
        .execute(op(OperationType::Create, json!({ "data": data })))
        .await
        .unwrap();
    assert_eq!(resp.state, ResultState::Success);
    resp.json["uid"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_assigns_uuid_and_read_returns_document() {
    let (store, _tmp) = create_temp_store();
    let uid = create(&store, json!({"owner": "a", "category": "c", "credential": {"k": 1}})).await;
    assert!(uuid::Uuid::parse_str(&uid).is_ok());

    let resp = store
        .execute(op(OperationType::Read, json!({ "uid": uid })))
        .await
        .unwrap();
    assert_eq!(resp.state, ResultState::Success);
    assert_eq!(resp.json["uid"], uid.as_str());
    assert_eq!(resp.json["data"]["credential"]["k"], 1);
}

#[tokio::test]
async fn test_replace_and_delete() {
    let (store, _tmp) = create_temp_store();
    let uid = create(&store, json!({"owner": "a"})).await;

    let resp = store
        .execute(op(
            OperationType::Replace,
            json!({"uid": uid, "data": {"owner": "b"}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.state, ResultState::Success);

    let read = store
        .execute(op(OperationType::Read, json!({ "uid": uid })))
        .await
        .unwrap();
    assert_eq!(read.json["data"]["owner"], "b");

    let deleted = store
        .execute(op(OperationType::Delete, json!({ "uid": uid })))
        .await
        .unwrap();
    assert_eq!(deleted.state, ResultState::Success);

    let gone = store
        .execute(op(OperationType::Read, json!({ "uid": uid })))
        .await
        .unwrap();
    assert_eq!(gone.state, ResultState::NotExist);

    let again = store
        .execute(op(OperationType::Delete, json!({ "uid": uid })))
        .await
        .unwrap();
    assert_eq!(again.state, ResultState::NotExist);
}

#[tokio::test]
async fn test_search_and_query() {
    let (store, _tmp) = create_temp_store();
    create(&store, json!({"owner": "a", "category": "uma_pat"})).await;
    create(&store, json!({"owner": "a", "category": "sso_session"})).await;
    create(&store, json!({"owner": "b", "category": "uma_pat"})).await;

    let query = serde_json::to_value(StoreQuery::owner_and_category("a", "uma_pat")).unwrap();
    let resp = store
        .execute(op(OperationType::Search, json!({ "query": query })))
        .await
        .unwrap();
    assert_eq!(resp.state, ResultState::Success);
    assert_eq!(resp.json["quantity"], 1);
    assert_eq!(resp.json["results"][0]["data"]["owner"], "a");
    assert_eq!(resp.json["results"][0]["data"]["category"], "uma_pat");
}

#[tokio::test]
async fn test_search_or_query() {
    let (store, _tmp) = create_temp_store();
    create(&store, json!({"owner": "a"})).await;
    create(&store, json!({"owner": "b"})).await;
    create(&store, json!({"owner": "c"})).await;

    let resp = store
        .execute(op(
            OperationType::Search,
            json!({"query": {"operator": "or", "queries": [
                {"operator": "equal", "attribute": "data.owner", "value": "a"},
                {"operator": "equal", "attribute": "data.owner", "value": "c"}
            ]}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.json["quantity"], 2);
}

#[tokio::test]
async fn test_search_value_is_bound_not_interpolated() {
    let (store, _tmp) = create_temp_store();
    create(&store, json!({"owner": "a"})).await;

    let query = serde_json::to_value(StoreQuery::Equal {
        attribute: "data.owner".to_string(),
        value: json!("a' OR '1'='1"),
    })
    .unwrap();
    let resp = store
        .execute(op(OperationType::Search, json!({ "query": query })))
        .await
        .unwrap();
    assert_eq!(resp.json["quantity"], 0);
}

#[tokio::test]
async fn test_collections_are_isolated() {
    let (store, _tmp) = create_temp_store();
    create(&store, json!({"owner": "a"})).await;

    let mut other = op(
        OperationType::Search,
        json!({"query": {"operator": "equal", "attribute": "data.owner", "value": "a"}}),
    );
    other.collection = "resources".to_string();
    let resp = store.execute(other).await.unwrap();
    assert_eq!(resp.json["quantity"], 0);
}

#[tokio::test]
async fn test_malformed_operation_is_error_state() {
    let (store, _tmp) = create_temp_store();
    let resp = store
        .execute(op(OperationType::Read, json!({})))
        .await
        .unwrap();
    assert_eq!(resp.state, ResultState::Error);
    assert!(resp.message().contains("uid"));
}

#[tokio::test]
async fn test_lookup_heals_duplicates_on_sqlite() {
    let (store, _tmp) = create_temp_store();
    let data = json!({"owner": "x", "category": "sso_session", "credential": {"tokenId": "T"}});
    create(&store, data.clone()).await;
    create(&store, data).await;

    let store: Arc<dyn CredentialStore> = Arc::new(store);
    let lookup = CredentialLookup::new(CredentialCollection::new(
        store.clone(),
        "resource-server",
        "credentials",
    ));

    assert_eq!(lookup.find_credential_id("x", "sso_session").await.unwrap(), None);

    let resp = store
        .execute(op(
            OperationType::Search,
            json!({"query": StoreQuery::owner_and_category("x", "sso_session")}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.json["quantity"], 0);
}

#[tokio::test]
async fn test_unreachable_database_is_transport_error() {
    let (store, tmp) = create_temp_store();
    let db_path = tmp.path().join("credentials.db");
    std::fs::remove_file(&db_path).expect("failed to remove database file");
    std::fs::create_dir(&db_path).expect("failed to put a directory in its place");

    let store: Arc<dyn CredentialStore> = Arc::new(store);
    let lookup = CredentialLookup::new(CredentialCollection::new(
        store,
        "resource-server",
        "credentials",
    ));

    let err = lookup
        .find_credential_id("x", "uma_pat")
        .await
        .unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err:?}");
}
