#![allow(dead_code)]

use colmapper::Client;

colmapper::column_entity! {
    pub struct User in "users" {
        #[column(key)]
        pub id: String,
        #[column(index)]
        pub email: String,
        #[column(index)]
        pub name: String,
        pub age: i64,
    }
}

colmapper::column_entity! {
    pub struct Author in "authors" {
        #[column(key)]
        pub id: String,
        pub name: String,
        #[relation(many = "books")]
        pub books: Vec<String>,
    }
}

colmapper::column_entity! {
    pub struct Book in "books" {
        #[column(key)]
        pub id: String,
        pub title: String,
        #[relation("authors")]
        pub author: String,
    }
}

pub fn user(id: &str, email: &str, name: &str, age: i64) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        age,
    }
}

pub async fn connected_client() -> Client {
    let client = Client::in_memory();
    client.connect().await.unwrap();
    client
}
