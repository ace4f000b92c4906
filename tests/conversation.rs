use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use gpt_session::auth::{Authenticator, Credentials, TokenCache};
use gpt_session::{ChatClient, Error};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> Credentials {
    Credentials::new("session", "clearance", "Mozilla/5.0 (Macintosh)")
}

fn snapshot(text: &str) -> String {
    format!("data: {}\n\n", json!({"message": {"content": {"parts": [text]}}}))
}

fn event_stream(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

async fn mount_session(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/auth/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": token})))
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> ChatClient {
    let base = Url::parse(&server.uri()).unwrap();
    ChatClient::new(credentials(), &base, "text-davinci-002-render", Duration::seconds(10)).unwrap()
}

async fn session_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/api/auth/session")
        .count()
}

#[tokio::test]
async fn answer_is_last_snapshot() {
    let server = MockServer::start().await;
    mount_session(&server, "tok").await;

    let client = client(&server);
    Mock::given(method("POST"))
        .and(path("/backend-api/conversation"))
        .and(header("authorization", "Bearer tok"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "action": "next",
            "model": "text-davinci-002-render",
            "parent_message_id": client.thread_id().to_string(),
            "messages": [{"role": "user", "content": {"content_type": "text", "parts": ["Say hello"]}}],
        })))
        .respond_with(event_stream(format!(
            "{}{}data: [DONE]\n\n",
            snapshot("Hel"),
            snapshot("Hello")
        )))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.get_answer("Say hello").await.unwrap(), "Hello");
}

#[tokio::test]
async fn non_success_status_carries_status_and_body() {
    let server = MockServer::start().await;
    mount_session(&server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/backend-api/conversation"))
        .respond_with(ResponseTemplate::new(429).set_body_string("{\"detail\":\"Too many requests\"}"))
        .mount(&server)
        .await;

    let err = client(&server).get_answer("hi").await.unwrap_err();
    match err {
        Error::Transport { ref status, ref body } => {
            assert_eq!(status, "Too Many Requests");
            assert_eq!(body, "{\"detail\":\"Too many requests\"}");
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_payload_rejects_the_call() {
    let server = MockServer::start().await;
    mount_session(&server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/backend-api/conversation"))
        .respond_with(event_stream(format!(
            "{}data: {{oops\n\ndata: [DONE]\n\n",
            snapshot("partial answer")
        )))
        .mount(&server)
        .await;

    let err = client(&server).get_answer("hi").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[tokio::test]
async fn stream_without_sentinel_never_resolves() {
    let server = MockServer::start().await;
    mount_session(&server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/backend-api/conversation"))
        .respond_with(event_stream(snapshot("unfinished")))
        .mount(&server)
        .await;

    let client = client(&server);
    let outcome = tokio::time::timeout(StdDuration::from_millis(300), client.get_answer("hi")).await;
    assert!(outcome.is_err(), "answer resolved without [DONE]: {:?}", outcome);
}

#[tokio::test]
async fn unauthorized_session_fails_before_posting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": null})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/backend-api/conversation"))
        .respond_with(event_stream("data: [DONE]\n\n".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.ensure_auth().await.unwrap_err().is_unauthorized());
    assert!(client.get_answer("hi").await.unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn token_is_reused_across_questions() {
    let server = MockServer::start().await;
    mount_session(&server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/backend-api/conversation"))
        .respond_with(event_stream(format!("{}data: [DONE]\n\n", snapshot("yes"))))
        .expect(3)
        .mount(&server)
        .await;

    let client = client(&server);
    client.ensure_auth().await.unwrap();
    client.get_answer("one").await.unwrap();
    client.get_answer("two").await.unwrap();
    client.get_answer("three").await.unwrap();
    assert_eq!(session_requests(&server).await, 1);
}

#[tokio::test]
async fn concurrent_questions_get_their_own_answers() {
    let server = MockServer::start().await;
    mount_session(&server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/backend-api/conversation"))
        .and(body_string_contains("first question"))
        .respond_with(
            event_stream(format!("{}{}data: [DONE]\n\n", snapshot("fir"), snapshot("first answer")))
                .set_delay(StdDuration::from_millis(50)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/backend-api/conversation"))
        .and(body_string_contains("second question"))
        .respond_with(event_stream(format!(
            "{}{}data: [DONE]\n\n",
            snapshot("sec"),
            snapshot("second answer")
        )))
        .mount(&server)
        .await;

    let client = client(&server);
    let (first, second) = tokio::join!(
        client.get_answer("first question"),
        client.get_answer("second question")
    );
    assert_eq!(first.unwrap(), "first answer");
    assert_eq!(second.unwrap(), "second answer");
    assert_eq!(session_requests(&server).await, 1);

    let parents: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/backend-api/conversation")
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["parent_message_id"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(parents.len(), 2);
    assert!(parents.iter().all(|p| *p == client.thread_id().to_string()));
}

#[tokio::test]
async fn clients_sharing_an_authenticator_share_the_token() {
    let server = MockServer::start().await;
    mount_session(&server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/backend-api/conversation"))
        .respond_with(event_stream(format!("{}data: [DONE]\n\n", snapshot("ok"))))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let cache = Arc::new(TokenCache::with_ttl(Duration::seconds(10)));
    let auth = Authenticator::new(reqwest::Client::new(), cache, &base).unwrap();
    let a = ChatClient::with_authenticator(credentials(), auth.clone(), &base, "m").unwrap();
    let b = ChatClient::with_authenticator(credentials(), auth, &base, "m").unwrap();

    assert_ne!(a.thread_id(), b.thread_id());
    assert_eq!(a.get_answer("q").await.unwrap(), "ok");
    assert_eq!(b.get_answer("q").await.unwrap(), "ok");
    assert_eq!(session_requests(&server).await, 1);
}
