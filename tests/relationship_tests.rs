mod common;

use colmapper::{ColumnStore, DbError, Value};
use common::{Author, Book, User, connected_client};

fn book(id: &str, title: &str, author: &str) -> Book {
    Book {
        id: id.into(),
        title: title.into(),
        author: author.into(),
    }
}

#[tokio::test]
async fn test_to_many_loads_lazily_and_caches() {
    let client = connected_client().await;
    client.persist(book("b1", "Dune", "a1")).await.unwrap();
    client.persist(book("b2", "Children of Dune", "a1")).await.unwrap();
    client
        .persist(Author {
            id: "a1".into(),
            name: "Frank".into(),
            books: vec!["b1".into(), "b2".into(), "b9".into()],
        })
        .await
        .unwrap();

    let mut author = client.load_data::<Author>("a1").await.unwrap();
    assert!(!author.is_relation_loaded("books"));

    let titles: Vec<String> = author
        .related::<Book>("books", &client)
        .await
        .unwrap()
        .iter()
        .map(|b| b.title.clone())
        .collect();
    assert_eq!(titles, vec!["Dune", "Children of Dune"]);
    assert!(author.is_relation_loaded("books"));

    // Served from the wrapper's cache: the store is not consulted again.
    let family = client.family_of(&colmapper::metadata::resolve::<Book>().unwrap());
    client.store().delete_row(&family, "b1").await.unwrap();
    assert_eq!(author.related::<Book>("books", &client).await.unwrap().len(), 2);

    // Rewriting the attribute drops the cached resolution.
    author.set("books", Value::KeyList(vec!["b2".into()])).unwrap();
    assert!(!author.is_relation_loaded("books"));
    let reloaded = author.related::<Book>("books", &client).await.unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].id, "b2");
}

#[tokio::test]
async fn test_to_one_resolution() {
    let client = connected_client().await;
    client
        .persist(Author {
            id: "a2".into(),
            name: "Ursula".into(),
            books: vec!["b3".into()],
        })
        .await
        .unwrap();
    client.persist(book("b3", "The Dispossessed", "a2")).await.unwrap();
    client.persist(book("b4", "Anonymous", "")).await.unwrap();

    let mut b3 = client.load_data::<Book>("b3").await.unwrap();
    let author = b3.related_one::<Author>("author", &client).await.unwrap();
    assert_eq!(author.map(|a| a.name.as_str()), Some("Ursula"));

    let mut b4 = client.load_data::<Book>("b4").await.unwrap();
    assert!(b4.related_one::<Author>("author", &client).await.unwrap().is_none());
}

#[tokio::test]
async fn test_relationship_misuse() {
    let client = connected_client().await;
    client
        .persist(Author {
            id: "a3".into(),
            name: "Octavia".into(),
            books: Vec::new(),
        })
        .await
        .unwrap();
    let mut author = client.load_data::<Author>("a3").await.unwrap();

    assert!(matches!(
        author.related::<User>("books", &client).await,
        Err(DbError::Metadata(_))
    ));
    assert!(matches!(
        author.related::<Book>("name", &client).await,
        Err(DbError::Metadata(_))
    ));
    assert!(author.related::<Book>("books", &client).await.unwrap().is_empty());

    client.remove(&mut author).await.unwrap();
    assert!(matches!(
        author.related::<Book>("books", &client).await,
        Err(DbError::StaleEntity(_))
    ));
}
