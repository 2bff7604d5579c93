mod common;

use async_trait::async_trait;
use colmapper::codec;
use colmapper::index::{ColumnFamilyIndexer, Indexer};
use colmapper::store::Family;
use colmapper::{
    Client, ClientConfig, ColumnStore, DbError, MemoryStore, Predicate, Result, SemanticType, Value,
};
use common::{User, connected_client, user};
use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::Arc;

colmapper::column_entity! {
    pub struct Reading in "readings" {
        #[column(key)]
        pub id: String,
        #[column(index)]
        pub level: f64,
    }
}

colmapper::column_entity! {
    pub struct Tagged in "tagged" {
        #[column(key)]
        pub id: i64,
        #[column(index)]
        pub tag: Option<String>,
    }
}

/// Accepts nothing; every call fails as an unreachable index backend would.
struct BrokenIndexer;

#[async_trait]
impl Indexer for BrokenIndexer {
    async fn insert(&self, _: &Family, _: &str, _: &[u8], _: &str) -> Result<()> {
        Err(DbError::Index("index backend unreachable".into()))
    }

    async fn remove(&self, _: &Family, _: &str, _: &[u8], _: &str) -> Result<()> {
        Err(DbError::Index("index backend unreachable".into()))
    }

    async fn lookup(&self, _: &Family, _: &str, _: &[u8]) -> Result<BTreeSet<String>> {
        Ok(BTreeSet::new())
    }

    async fn lookup_range(
        &self,
        _: &Family,
        _: &str,
        _: Bound<Vec<u8>>,
        _: Bound<Vec<u8>>,
    ) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_lookup_tracks_write_and_delete() {
    let client = connected_client().await;
    client.persist(user("u1", "a@x.com", "Alice", 30)).await.unwrap();
    assert!(client.index_lookup::<User>("email", "a@x.com").await.unwrap().contains("u1"));

    let keyspace = client.config().keyspace.clone();
    client.delete(&keyspace, "users", "u1").await.unwrap();
    assert!(!client.index_lookup::<User>("email", "a@x.com").await.unwrap().contains("u1"));
}

#[tokio::test]
async fn test_changed_value_moves_entry() {
    let client = connected_client().await;
    let mut written = client.persist(user("u1", "a@x.com", "Alice", 30)).await.unwrap();

    written.set("email", "new@x.com").unwrap();
    client.write_data(&mut written).await.unwrap();

    assert!(client.index_lookup::<User>("email", "a@x.com").await.unwrap().is_empty());
    let ids = client.index_lookup::<User>("email", "new@x.com").await.unwrap();
    assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["u1"]);
}

#[tokio::test]
async fn test_blind_overwrite_clears_previous_entry() {
    let client = connected_client().await;
    client.persist(user("u1", "a@x.com", "Alice", 30)).await.unwrap();
    // A second fresh wrapper for the same key, never loaded.
    client.persist(user("u1", "b@x.com", "Alice", 30)).await.unwrap();

    assert!(client.index_lookup::<User>("email", "a@x.com").await.unwrap().is_empty());
    assert!(client.index_lookup::<User>("email", "b@x.com").await.unwrap().contains("u1"));
}

#[tokio::test]
async fn test_null_value_drops_entry() {
    let client = connected_client().await;
    let mut row = client
        .persist(Tagged { id: 7, tag: Some("red".into()) })
        .await
        .unwrap();
    assert!(client.index_lookup::<Tagged>("tag", "red").await.unwrap().contains(row.row_key()));

    row.set("tag", Value::Null).unwrap();
    let outcome = client.write_data(&mut row).await.unwrap();
    assert_eq!(outcome.columns_removed, 1);
    assert!(client.index_lookup::<Tagged>("tag", "red").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lookup_on_unindexed_attribute_is_rejected() {
    let client = connected_client().await;
    assert!(matches!(
        client.index_lookup::<User>("age", 30i64).await,
        Err(DbError::UnsupportedQuery(_))
    ));
}

#[tokio::test]
async fn test_index_failure_is_a_warning_not_an_error() {
    let client = Client::in_memory().with_indexer(Arc::new(BrokenIndexer));
    client.connect().await.unwrap();

    let mut written = colmapper::EnhancedEntity::wrap(user("u1", "a@x.com", "Alice", 30)).unwrap();
    let outcome = client.write_data(&mut written).await.unwrap();
    assert!(!outcome.is_consistent());
    let attributes: Vec<&str> = outcome
        .index_warnings
        .iter()
        .map(|w| w.attribute.as_str())
        .collect();
    assert_eq!(attributes, vec!["email", "name"]);
    assert_eq!(outcome.index_warnings[0].row_id, "u1");
    assert!(outcome.index_warnings[0].reason.contains("unreachable"));

    // The primary row was written regardless.
    assert_eq!(client.load_data::<User>("u1").await.unwrap().entity().unwrap().age, 30);

    let deleted = client.remove(&mut written).await.unwrap();
    assert!(deleted.existed);
    assert_eq!(deleted.index_warnings.len(), 2);
}

#[tokio::test]
async fn test_column_family_indexer_keeps_entries_in_store() {
    let store = Arc::new(MemoryStore::new());
    let client = Client::new(ClientConfig::default(), store.clone());
    client.connect().await.unwrap();

    client.persist(user("u1", "a@x.com", "Alice", 30)).await.unwrap();
    client.persist(user("u2", "b@x.com", "Alice", 25)).await.unwrap();

    let users = Family::new("colmapper", "users");
    let index_family = ColumnFamilyIndexer::index_family(&users, "name");
    assert_eq!(store.row_count(&index_family).await, 1);

    let ids = client.index_lookup::<User>("name", "Alice").await.unwrap();
    assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["u1", "u2"]);

    let encoded = codec::encode(&Value::from("Alice"), &SemanticType::Text).unwrap();
    let raw = client.indexer().lookup(&users, "name", &encoded).await.unwrap();
    assert_eq!(raw.len(), 2);

    client.delete("colmapper", "users", "u1").await.unwrap();
    client.delete("colmapper", "users", "u2").await.unwrap();
    // The emptied index row stays behind and reads as no entries.
    assert_eq!(store.row_count(&index_family).await, 1);
    assert!(client.index_lookup::<User>("name", "Alice").await.unwrap().is_empty());
    assert!(store.get_row(&users, "u1").await.unwrap().is_none());
}

async fn column_family_client() -> Client {
    let client = Client::new(ClientConfig::default(), Arc::new(MemoryStore::new()));
    client.connect().await.unwrap();
    client
}

async fn assert_concurrent_writers_consistent(client: Arc<Client>) {
    let mut tasks = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let id = format!("u{:02}", i);
            let group = if i % 2 == 0 { "even" } else { "odd" };
            client
                .persist(user(&id, &format!("{}@x.com", id), group, i))
                .await
                .map(|_| ())
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let even = client.index_lookup::<User>("name", "even").await.unwrap();
    let odd = client.index_lookup::<User>("name", "odd").await.unwrap();
    assert_eq!(even.len(), 8);
    assert_eq!(odd.len(), 8);
    assert!(even.is_disjoint(&odd));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_keep_index_consistent() {
    assert_concurrent_writers_consistent(Arc::new(connected_client().await)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_keep_store_index_consistent() {
    assert_concurrent_writers_consistent(Arc::new(column_family_client().await)).await;
}

/// Half the rows leave a shared value while the other half join it.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_moves_through_store_index() {
    let client = Arc::new(column_family_client().await);
    for i in 0..8 {
        let id = format!("m{}", i);
        let name = if i % 2 == 0 { "Alice" } else { "Bob" };
        client.persist(user(&id, &format!("{}@x.com", id), name, i)).await.unwrap();
    }

    let mut tasks = Vec::new();
    for i in 0..8i64 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let mut row = client.load_data::<User>(format!("m{}", i)).await?;
            let next = if i % 2 == 0 { "Bob" } else { "Alice" };
            row.set("name", next)?;
            client.write_data(&mut row).await.map(|_| ())
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let alice = client.index_lookup::<User>("name", "Alice").await.unwrap();
    let bob = client.index_lookup::<User>("name", "Bob").await.unwrap();
    assert_eq!(alice.into_iter().collect::<Vec<_>>(), vec!["m1", "m3", "m5", "m7"]);
    assert_eq!(bob.into_iter().collect::<Vec<_>>(), vec!["m0", "m2", "m4", "m6"]);
}

#[tokio::test]
async fn test_signed_zero_update_moves_index_entry() {
    for client in [connected_client().await, column_family_client().await] {
        let mut reading = client
            .persist(Reading { id: "r1".into(), level: -0.0 })
            .await
            .unwrap();
        reading.set("level", 0.0).unwrap();
        let outcome = client.write_data(&mut reading).await.unwrap();
        assert!(outcome.is_consistent());

        let positive = client.index_lookup::<Reading>("level", 0.0).await.unwrap();
        let negative = client.index_lookup::<Reading>("level", -0.0).await.unwrap();
        assert!(positive.contains("r1"));
        assert!(negative.is_empty());

        let found = client.find::<Reading>(&[Predicate::eq("level", 0.0)]).await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
