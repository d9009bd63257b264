use std::{net::SocketAddr, sync::Arc};

use chatterbox_sqlite::{Database, ManualClock};
use chrono::{DateTime, Duration, TimeZone, Utc};
use eyre::Result;
use hyper::{
    body::{self, Body},
    client::HttpConnector,
    header::CONTENT_TYPE,
    Client, Method, Request, StatusCode,
};
use serde_json::{json, Value};

use crate::{AppState, Server};

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap()
}

struct TestApp {
    addr: SocketAddr,
    client: Client<HttpConnector>,
    clock: Arc<ManualClock>,
}

impl TestApp {
    /// Serves the full router on an ephemeral port with a pinned clock.
    async fn spawn() -> Result<Self> {
        let clock = Arc::new(ManualClock::starting_at(start_time()));
        let db = Database::with_clock("sqlite::memory:", clock.clone()).await?;
        let state = Arc::new(AppState::new(db)?);

        let app = Server::chatterbox_app(Arc::clone(&state));

        let server = axum::Server::bind(&([127, 0, 0, 1], 0).into())
            .serve(app.with_state(state).into_make_service());

        let addr = server.local_addr();
        tokio::spawn(server);

        Ok(Self {
            addr,
            client: Client::new(),
            clock,
        })
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let uri = format!("http://{}{path}", self.addr);
        let builder = Request::builder().method(method).uri(uri);

        let req = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.client.request(req).await.unwrap();
        let status = response.status();

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|value| value.as_bytes().starts_with(b"application/json"))
            .unwrap_or(false);

        let bytes = body::to_bytes(response.into_body()).await.unwrap();

        let value = if is_json {
            serde_json::from_slice(&bytes).unwrap()
        } else {
            Value::Null
        };

        (status, value)
    }

    async fn get_messages(&self) -> (StatusCode, Value) {
        self.request(Method::GET, "/messages", None).await
    }

    async fn post_message(&self, payload: Value) -> (StatusCode, Value) {
        self.request(Method::POST, "/messages", Some(payload)).await
    }

    async fn patch_message(&self, id: i64, payload: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, &format!("/messages/{id}"), Some(payload))
            .await
    }

    async fn delete_message(&self, id: i64) -> (StatusCode, Value) {
        self.request(Method::DELETE, &format!("/messages/{id}"), None)
            .await
    }
}

#[tokio::test]
async fn empty_board_lists_nothing() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app.get_messages().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    Ok(())
}

#[tokio::test]
async fn created_message_is_echoed_and_listed() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, created) = app
        .post_message(json!({ "body": "hello world", "username": "alice" }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["body"], "hello world");
    assert_eq!(created["username"], "alice");
    assert!(created["id"].as_i64().unwrap() > 0);
    assert_eq!(created["created_at"], created["updated_at"]);

    // Timestamps travel as RFC 3339.
    let created_at = created["created_at"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(created_at).is_ok());

    let (status, listed) = app.get_messages().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([created]));

    Ok(())
}

#[tokio::test]
async fn create_requires_body_and_username() -> Result<()> {
    let app = TestApp::spawn().await?;

    let payloads = [
        json!({ "username": "alice" }),
        json!({ "body": "hello" }),
        json!({ "body": "", "username": "alice" }),
        json!({ "body": "hello", "username": "" }),
        json!({ "body": null, "username": "alice" }),
        json!({}),
    ];

    for payload in payloads {
        let (status, body) = app.post_message(payload.clone()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {payload}");
        assert_eq!(
            body,
            json!({ "error": "Both 'body' and 'username' are required" }),
            "payload: {payload}"
        );
    }

    let (_, listed) = app.get_messages().await;
    assert_eq!(listed, json!([]));

    Ok(())
}

#[tokio::test]
async fn messages_list_oldest_first_with_stable_ties() -> Result<()> {
    let app = TestApp::spawn().await?;

    app.post_message(json!({ "body": "one", "username": "alice" }))
        .await;
    app.clock.advance(Duration::seconds(60));
    let (_, second) = app
        .post_message(json!({ "body": "two", "username": "bob" }))
        .await;
    let (_, third) = app
        .post_message(json!({ "body": "three", "username": "carol" }))
        .await;

    assert_eq!(second["created_at"], third["created_at"]);

    let (_, listed) = app.get_messages().await;

    let bodies: Vec<_> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|message| message["body"].as_str().unwrap().to_owned())
        .collect();

    assert_eq!(bodies, ["one", "two", "three"]);

    Ok(())
}

#[tokio::test]
async fn update_replaces_body_and_touches_updated_at() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (_, created) = app
        .post_message(json!({ "body": "draft", "username": "alice" }))
        .await;
    let id = created["id"].as_i64().unwrap();

    app.clock.advance(Duration::seconds(60));

    let (status, reply) = app.patch_message(id, json!({ "body": "final" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        reply,
        json!({
            "message": "Message updated successfully",
            "id": id,
            "body": "final",
        })
    );

    let (_, listed) = app.get_messages().await;
    let message = &listed[0];

    assert_eq!(message["body"], "final");
    assert_eq!(message["username"], "alice");
    assert_eq!(message["created_at"], created["created_at"]);

    let before = DateTime::parse_from_rfc3339(created["updated_at"].as_str().unwrap()).unwrap();
    let after = DateTime::parse_from_rfc3339(message["updated_at"].as_str().unwrap()).unwrap();
    assert!(after > before);

    Ok(())
}

#[tokio::test]
async fn update_without_body_changes_nothing() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (_, created) = app
        .post_message(json!({ "body": "draft", "username": "alice" }))
        .await;
    let id = created["id"].as_i64().unwrap();

    app.clock.advance(Duration::seconds(60));

    for payload in [json!({}), json!({ "body": null }), json!({ "body": "" })] {
        let (status, reply) = app.patch_message(id, payload).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            reply,
            json!({
                "message": "Message updated successfully",
                "id": id,
                "body": "draft",
            })
        );
    }

    // `updated_at` included, the stored row is untouched.
    let (_, listed) = app.get_messages().await;
    assert_eq!(listed, json!([created]));

    Ok(())
}

#[tokio::test]
async fn unknown_ids_are_not_found() -> Result<()> {
    let app = TestApp::spawn().await?;

    let not_found = json!({ "error": "Message not found" });

    let (status, reply) = app.patch_message(999999, json!({ "body": "nope" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(reply, not_found);

    let (status, reply) = app.delete_message(999999).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(reply, not_found);

    Ok(())
}

#[tokio::test]
async fn deleted_messages_are_gone() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (_, first) = app
        .post_message(json!({ "body": "keep", "username": "alice" }))
        .await;
    let (_, second) = app
        .post_message(json!({ "body": "drop", "username": "bob" }))
        .await;
    let id = second["id"].as_i64().unwrap();

    let (status, reply) = app.delete_message(id).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({ "message": "Message deleted successfully" }));

    let (_, listed) = app.get_messages().await;
    assert_eq!(listed, json!([first]));

    let (status, _) = app.delete_message(id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn non_numeric_ids_are_not_found() -> Result<()> {
    let app = TestApp::spawn().await?;

    let not_found = json!({ "error": "Message not found" });

    let (status, reply) = app
        .request(Method::PATCH, "/messages/abc", Some(json!({ "body": "nope" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(reply, not_found);

    let (status, reply) = app.request(Method::DELETE, "/messages/abc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(reply, not_found);

    Ok(())
}

#[tokio::test]
async fn metrics_report_handled_requests() -> Result<()> {
    let app = TestApp::spawn().await?;

    app.get_messages().await;

    let uri = format!("http://{}/metrics", app.addr);
    let response = app.client.get(uri.parse().unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = body::to_bytes(response.into_body()).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("chatterbox_http_requests_total"));
    assert!(text.contains("path=\"/messages\""));

    Ok(())
}

#[tokio::test]
async fn preflight_requests_are_allowed() -> Result<()> {
    let app = TestApp::spawn().await?;

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri(format!("http://{}/messages", app.addr))
        .header("origin", "http://localhost:4000")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.client.request(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let allow_origin = response
        .headers()
        .get("access-control-allow-origin")
        .and_then(|value| value.to_str().ok());

    assert_eq!(allow_origin, Some("*"));

    Ok(())
}
