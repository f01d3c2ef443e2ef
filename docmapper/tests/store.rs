mod common;

use common::SpyBackend;
use docmapper::{codec, memory::InMemoryStore, prelude::*};

#[derive(DocumentType)]
#[document(fields = ["line1", "line2", "state", "city", "zip"])]
struct Address;

#[derive(DocumentType)]
#[document(fields = ["name", "age", "address", "tags", "scores"])]
struct User;

#[derive(DocumentType)]
#[document(fields = ["title"], collection = "articles", id = "uuid")]
struct Post;

fn store_with<B: StoreBackend + 'static>(backend: B) -> DocumentStore {
    DocumentStore::builder()
        .backend(backend)
        .register::<Address>()
        .register::<User>()
        .register::<Post>()
        .build()
}

#[tokio::test]
async fn insert_assigns_bookkeeping_fields_and_reads_back() {
    let store = store_with(InMemoryStore::new());
    let users = store.collection::<User>();

    let user = users.create();
    user.set("name", "Alice").unwrap();
    user.set("age", 30).unwrap();

    let id = users.insert(&user).await.unwrap();

    assert_eq!(user.primary_key(), Some(id.clone()));
    assert!(matches!(user.id(), Some(DocumentId::ObjectId(_))));
    assert!(user.get("createdDate").is_some());
    assert!(user.is_persisted());
    assert!(!user.is_dirty());

    let found = users.find_one(doc! { "name": "Alice" }).await.unwrap();

    assert_eq!(found.primary_key(), Some(id));
    assert_eq!(found.get("age"), Some(Value::Int32(30)));
    assert!(found.is_persisted());
    assert!(!found.is_dirty());
    assert_eq!(found, user);
}

#[tokio::test]
async fn uuid_documents_use_their_own_collection() {
    let backend = InMemoryStore::new();
    let store = store_with(backend.clone());
    let posts = store.collection::<Post>();

    let post = posts.create();
    post.set("title", "Hello").unwrap();
    posts.insert(&post).await.unwrap();

    assert!(matches!(post.id(), Some(DocumentId::Uuid(_))));
    assert_eq!(posts.name(), "articles");
    assert_eq!(store.list_collections().await.unwrap(), vec!["articles".to_string()]);

    let raw = backend
        .find_one("articles", doc! { "title": "Hello" })
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(raw.get("_id"), Some(docmapper::bson::Bson::Binary(_))));
}

#[tokio::test]
async fn inserting_twice_is_rejected() {
    let store = store_with(InMemoryStore::new());
    let users = store.collection::<User>();

    let user = users.create();
    user.set("name", "Alice").unwrap();
    users.insert(&user).await.unwrap();

    let result = users.insert(&user).await;

    assert!(matches!(result, Err(DocumentStoreError::DocumentAlreadyExists(_, _))));
}

#[tokio::test]
async fn find_returns_insertion_order_and_honours_options() {
    let store = store_with(InMemoryStore::new());
    let users = store.collection::<User>();

    for (name, age) in [("Alice", 30), ("Bob", 25), ("Carol", 40)] {
        let user = users.create();
        user.set("name", name).unwrap();
        user.set("age", age).unwrap();
        users.insert(&user).await.unwrap();
    }

    let names = |found: Vec<DocumentRef>| -> Vec<Value> {
        found
            .iter()
            .map(|user| user.get_or("name", Value::Null))
            .collect()
    };

    let all = users.find(doc! {}, FindOptions::new()).await.unwrap();
    assert_eq!(names(all), vec![Value::from("Alice"), Value::from("Bob"), Value::from("Carol")]);

    let youngest = users
        .find(
            doc! {},
            FindOptions::builder()
                .sort("age", SortDirection::Asc)
                .limit(2)
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(names(youngest), vec![Value::from("Bob"), Value::from("Alice")]);

    let none = users.find(doc! { "name": "Dave" }, FindOptions::new()).await.unwrap();
    assert!(none.is_empty());

    let missing = users.find_one(doc! { "name": "Dave" }).await;
    assert!(matches!(missing, Err(DocumentStoreError::NotFound(_, _))));
}

#[tokio::test]
async fn distinct_flattens_sequences_in_first_seen_order() {
    let store = store_with(InMemoryStore::new());
    let users = store.collection::<User>();

    for tags in [vec!["rust", "bson"], vec!["bson", "mongo"]] {
        let user = users.create();
        user.set("tags", tags).unwrap();
        users.insert(&user).await.unwrap();
    }

    let tags = users.distinct("tags").await.unwrap();

    assert_eq!(tags, vec![Value::from("rust"), Value::from("bson"), Value::from("mongo")]);

    let tagged = users.find(doc! { "tags": "mongo" }, FindOptions::new()).await.unwrap();
    assert_eq!(tagged.len(), 1);
}

#[tokio::test]
async fn update_sends_only_changes_since_the_last_write() {
    let spy = SpyBackend::default();
    let store = store_with(spy.clone());
    let users = store.collection::<User>();

    let user = users.create();
    user.set("name", "Alice").unwrap();
    user.set("age", 30).unwrap();
    users.insert(&user).await.unwrap();

    user.set("age", 31).unwrap();
    users.update(&user).await.unwrap();
    assert!(!user.is_dirty());

    user.set("name", "Alicia").unwrap();
    users.update(&user).await.unwrap();

    assert_eq!(
        spy.updated_paths(),
        vec![
            vec!["age".to_string(), "updatedDate".to_string()],
            vec!["name".to_string(), "updatedDate".to_string()],
        ],
    );

    let found = users
        .find_one(doc! { "_id": codec::encode_value(&user.primary_key().unwrap()) })
        .await
        .unwrap();
    assert_eq!(found.get("name"), Some(Value::from("Alicia")));
    assert_eq!(found.get("age"), Some(Value::Int32(31)));
    assert_eq!(found.get("updatedDate"), user.get("updatedDate"));
}

#[tokio::test]
async fn unchanged_documents_are_not_written() {
    let spy = SpyBackend::default();
    let store = store_with(spy.clone());
    let users = store.collection::<User>();

    let user = users.create();
    user.set("name", "Alice").unwrap();
    users.insert(&user).await.unwrap();

    // Same value as before.
    user.set("name", "Alice").unwrap();
    users.update(&user).await.unwrap();

    assert!(spy.updates().is_empty());
    assert!(user.get("updatedDate").is_none());
}

#[tokio::test]
async fn embedded_changes_are_written_as_dotted_paths() {
    let spy = SpyBackend::default();
    let store = store_with(spy.clone());
    let users = store.collection::<User>();

    let address = DocumentRef::of::<Address>();
    address.set("line1", "77 Massachusetts Ave").unwrap();
    address.set("city", "Cambridge").unwrap();

    let user = users.create();
    user.set("name", "Alice").unwrap();
    user.set("address", &address).unwrap();
    users.insert(&user).await.unwrap();

    assert!(address.is_watched_by(&user));
    assert!(address.primary_key().is_none());

    address.set("zip", "02139").unwrap();
    assert!(user.is_field_dirty("address"));

    users.update(&user).await.unwrap();

    assert_eq!(
        spy.updated_paths(),
        vec![vec!["address.zip".to_string(), "updatedDate".to_string()]],
    );
    assert!(!address.is_dirty());

    let raw = spy
        .inner
        .find_one("users", doc! { "name": "Alice" })
        .await
        .unwrap()
        .unwrap();
    let stored_address = raw.get_document("address").unwrap();
    assert_eq!(stored_address.get_str("city").unwrap(), "Cambridge");
    assert_eq!(stored_address.get_str("zip").unwrap(), "02139");
    assert_eq!(stored_address.get_str("embeddedClass").unwrap(), Address::type_name());

    let found = users.find_one(doc! { "address.zip": "02139" }).await.unwrap();
    let Some(Value::Embedded(found_address)) = found.get("address") else {
        panic!("address was not decoded as an embedded document");
    };
    assert_eq!(found_address, address);
    assert!(found_address.is_watched_by(&found));
    assert_eq!(found, user);
}

#[tokio::test]
async fn nested_sequences_round_trip() {
    let store = store_with(InMemoryStore::new());
    let users = store.collection::<User>();

    let user = users.create();
    user.set("scores", vec![vec![1, 2], vec![3]]).unwrap();
    users.insert(&user).await.unwrap();

    let found = users.find_one(doc! {}).await.unwrap();

    assert_eq!(
        found.get("scores"),
        Some(Value::Sequence(vec![
            Value::Sequence(vec![Value::Int32(1), Value::Int32(2)]),
            Value::Sequence(vec![Value::Int32(3)]),
        ])),
    );
}

#[tokio::test]
async fn deleted_documents_reject_further_use() {
    let store = store_with(InMemoryStore::new());
    let users = store.collection::<User>();

    let user = users.create();
    user.set("name", "Alice").unwrap();
    users.insert(&user).await.unwrap();
    users.delete(&user).await.unwrap();

    assert!(user.is_deleted());
    assert!(matches!(user.set("name", "Bob"), Err(DocumentStoreError::DocumentDeleted(_))));
    assert!(matches!(users.update(&user).await, Err(DocumentStoreError::DocumentDeleted(_))));
    assert!(matches!(users.delete(&user).await, Err(DocumentStoreError::DocumentDeleted(_))));
    assert!(matches!(
        users.find_one(doc! { "name": "Alice" }).await,
        Err(DocumentStoreError::NotFound(_, _)),
    ));
}

#[tokio::test]
async fn unstored_documents_cannot_be_updated() {
    let store = store_with(InMemoryStore::new());
    let users = store.collection::<User>();

    let user = users.create();
    user.set("name", "Alice").unwrap();

    let result = users.update(&user).await;

    assert_eq!(result, Err(DocumentStoreError::MissingPrimaryKey(User::type_name().to_string())));
    assert!(user.primary_key().is_none());
}

#[tokio::test]
async fn documents_only_belong_in_their_own_collection() {
    let store = store_with(InMemoryStore::new());

    let user = store.collection::<User>().create();
    let result = store.collection::<Post>().insert(&user).await;

    assert!(matches!(result, Err(DocumentStoreError::InvalidDocument(_))));
    assert!(user.primary_key().is_none());
}

#[tokio::test]
async fn unconfigured_store_fails_without_touching_documents() {
    let store = DocumentStore::default();
    let users = store.collection::<User>();

    let user = users.create();
    user.set("name", "Alice").unwrap();

    assert_eq!(users.insert(&user).await, Err(DocumentStoreError::StorageNotConfigured));
    assert_eq!(users.find(doc! {}, FindOptions::new()).await, Err(DocumentStoreError::StorageNotConfigured));
    assert_eq!(store.list_collections().await, Err(DocumentStoreError::StorageNotConfigured));

    assert!(user.primary_key().is_none());
    assert!(user.get("createdDate").is_none());
    assert!(user.is_field_dirty("name"));

    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn collections_can_be_listed_and_dropped() {
    let store = store_with(InMemoryStore::new());

    for name in ["Alice", "Bob"] {
        let user = store.collection::<User>().create();
        user.set("name", name).unwrap();
        store.collection::<User>().insert(&user).await.unwrap();
    }

    assert_eq!(store.list_collections().await.unwrap(), vec!["users".to_string()]);

    store.drop_collection("users").await.unwrap();

    assert!(store.list_collections().await.unwrap().is_empty());
    assert!(matches!(
        store.drop_collection("users").await,
        Err(DocumentStoreError::CollectionNotFound(_)),
    ));

    store.shutdown().await.unwrap();
}
