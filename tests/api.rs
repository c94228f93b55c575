use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use bookwish::books::Books;
use bookwish::config::App;
use bookwish::db::{Database, Row};
use bookwish::handler::{AppState, LIVENESS_MESSAGE};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn setup() -> (Router, Arc<Database>) {
    setup_with(App::default()).await
}

async fn setup_with(settings: App) -> (Router, Arc<Database>) {
    let db = Arc::new(Database::in_memory().await.unwrap());
    let app = bookwish::app(AppState::new(db.clone(), &settings));
    (app, db)
}

async fn seed_items(db: &Database, count: u32) {
    let sql = "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < ?) \
               INSERT INTO wishlist (name) SELECT 'item ' || i FROM n";
    db.connection()
        .execute(sql, libsql::params![i64::from(count)])
        .await
        .unwrap();
}

async fn seed_book(db: &Database, isbn: &str, title: &str) -> Row {
    let row = json!({"isbn": isbn, "title": title, "author": "Someone", "price": 12.5});
    Books::new(db.connection())
        .insert(row.as_object().cloned().unwrap())
        .await
        .unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn root_reports_liveness() {
    let (app, _db) = setup().await;
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], LIVENESS_MESSAGE.as_bytes());
}

#[tokio::test]
async fn book_lookup_by_isbn() {
    let (app, db) = setup().await;
    let book = seed_book(&db, "9780441013593", "Dune").await;

    let (status, body) = send(&app, "GET", "/books/9780441013593", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Object(book));

    let (status, body) = send(&app, "GET", "/books/0000000000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Book not found"));
    assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn adding_an_item_requires_a_name() {
    let (app, _db) = setup().await;

    let (status, body) = send(&app, "POST", "/items", Some(json!({"price": 3.0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("name is required"));

    let (status, _) = send(&app, "POST", "/items", Some(json!({"name": null}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (app, _db) = setup().await;
    let request = Request::builder()
        .method("POST")
        .uri("/items")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn added_item_omits_unset_fields() {
    let (app, _db) = setup().await;

    let (status, body) = send(&app, "POST", "/items", Some(json!({"name": "X", "price": 9.99}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], json!("X"));
    assert_eq!(body["price"], json!(9.99));
    // table defaults, not explicit nulls from the request
    assert_eq!(body["description"], json!(""));
    assert_eq!(body["url"], Value::Null);
}

#[tokio::test]
async fn removing_items() {
    let (app, _db) = setup().await;
    let (_, created) = send(&app, "POST", "/items", Some(json!({"name": "lamp"}))).await;
    let id = created["id"].as_i64().unwrap();

    let (status, body) = send(&app, "DELETE", &format!("/items/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"deleted_id": id}));

    let (status, _) = send(&app, "DELETE", &format!("/items/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/items/not-a-number", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_items_pages_newest_first() {
    let (app, _db) = setup().await;
    for name in ["first", "second", "third"] {
        send(&app, "POST", "/items", Some(json!({"name": name}))).await;
    }

    let (status, body) = send(&app, "GET", "/items?limit=2&offset=0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(2));
    let names: Vec<_> = body["items"].as_array().unwrap().iter().map(|i| i["name"].clone()).collect();
    assert_eq!(names, vec![json!("third"), json!("second")]);

    let (_, body) = send(&app, "GET", "/items", None).await;
    assert_eq!(body["count"], json!(3));

    let (status, _) = send(&app, "GET", "/items?limit=-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_items_has_no_page_cap_by_default() {
    let (app, db) = setup().await;
    seed_items(&db, 1005).await;

    let (status, body) = send(&app, "GET", "/items?limit=1005", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1005));
    assert_eq!(body["items"].as_array().unwrap().len(), 1005);
}

#[tokio::test]
async fn listing_items_respects_configured_page_cap() {
    let settings = App {
        max_page_size: Some(10),
        ..App::default()
    };
    let (app, db) = setup_with(settings).await;
    seed_items(&db, 25).await;

    let (_, body) = send(&app, "GET", "/items?limit=20", None).await;
    assert_eq!(body["count"], json!(10));
}

#[tokio::test]
async fn database_failures_are_internal_errors() {
    let (app, db) = setup().await;
    db.connection().execute("DROP TABLE books", ()).await.unwrap();

    let (status, body) = send(&app, "GET", "/books/9780441013593", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("internal_error"));
    assert!(body["message"].as_str().unwrap().contains("no such table"));

    let quiet = App {
        expose_errors: false,
        ..App::default()
    };
    let (app, db) = setup_with(quiet).await;
    db.connection().execute("DROP TABLE books", ()).await.unwrap();

    let (status, body) = send(&app, "GET", "/books/9780441013593", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], json!("failed to look up book"));
}

#[tokio::test]
async fn wishlist_lifecycle() {
    let (app, db) = setup().await;
    let dune = seed_book(&db, "111", "Dune").await;
    let emma = seed_book(&db, "222", "Emma").await;
    let dune_id = dune["id"].as_i64().unwrap();
    let emma_id = emma["id"].as_i64().unwrap();

    let (status, wishlist) = send(
        &app,
        "POST",
        "/wishlist",
        Some(json!({"user_id": "u-1", "wishlist_name": "Summer"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(wishlist["user_id"], json!("u-1"));
    assert_eq!(wishlist["name"], json!("Summer"));
    let id = wishlist["id"].as_i64().unwrap();
    let books_uri = format!("/wishlist/{id}/books");

    let (status, body) = send(&app, "GET", &books_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    for book_id in [dune_id, emma_id] {
        let (status, _) = send(&app, "POST", &books_uri, Some(json!({"book_id": book_id}))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = send(&app, "POST", &books_uri, Some(json!({"book_id": dune_id}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "GET", &books_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let books = body.as_array().unwrap();
    assert_eq!(books.len(), 2);
    assert!(books.contains(&Value::Object(dune.clone())));
    assert!(books.contains(&Value::Object(emma)));

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/wishlist/{id}/books/{dune_id}?add_to_cart=true"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"wishlist_id": id, "book_id": dune_id, "added_to_cart": true}));

    let (status, body) = send(&app, "DELETE", &format!("/wishlist/{id}/books/{dune_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Book not in wishlist"));

    let (_, body) = send(&app, "GET", &books_uri, None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn wishlist_creation_rules() {
    let (app, _db) = setup().await;

    let (status, body) = send(&app, "POST", "/wishlist", Some(json!({"user_id": "u-1"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("wishlist_name is required"));

    for name in ["a", "b", "c"] {
        let body = json!({"user_id": "u-1", "wishlist_name": name});
        let (status, _) = send(&app, "POST", "/wishlist", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let duplicate = json!({"user_id": "u-1", "wishlist_name": "a"});
    let (status, _) = send(&app, "POST", "/wishlist", Some(duplicate)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let fourth = json!({"user_id": "u-1", "wishlist_name": "d"});
    let (status, body) = send(&app, "POST", "/wishlist", Some(fourth)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("conflict"));
}

#[tokio::test]
async fn missing_wishlist_and_book_are_not_found() {
    let (app, db) = setup().await;
    let book = seed_book(&db, "111", "Dune").await;
    let book_id = book["id"].as_i64().unwrap();

    let (status, body) = send(&app, "GET", "/wishlist/999/books", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Wishlist not found"));

    let (status, _) = send(&app, "POST", "/wishlist/999/books", Some(json!({"book_id": book_id}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, wishlist) = send(
        &app,
        "POST",
        "/wishlist",
        Some(json!({"user_id": "u-2", "wishlist_name": "Later"})),
    )
    .await;
    let id = wishlist["id"].as_i64().unwrap();

    let (status, body) = send(&app, "POST", &format!("/wishlist/{id}/books"), Some(json!({"book_id": 999}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Book not found"));

    let (status, body) = send(&app, "POST", &format!("/wishlist/{id}/books"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("book_id is required"));

    let (status, body) = send(&app, "DELETE", &format!("/wishlist/999/books/{book_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Wishlist not found"));
}
