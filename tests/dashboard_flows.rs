//! End-to-end flows through the wired services

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use socialdesk::auth::TokenCipher;
use socialdesk::linker::{AuthorizationRequest, CallbackOutcome, CallbackParams, Confirmation};
use socialdesk::models::{Draft, Topic};
use socialdesk::{Actor, Config, Database, Error, Platform, PostStatus, ScheduledPost, Services};

fn services(dir: &TempDir, server: &MockServer) -> Services {
    let mut config = Config::default();
    config.tiktok.client_key = Some("ck".into());
    config.tiktok.client_secret = Some("cs".into());
    config.tiktok.redirect_uri = Some("https://dash.example.com/settings".into());
    config.tiktok.api_url = server.uri();
    config.meta.graph_url = server.uri();
    config.publisher.backoff_base_ms = 1;

    let db = Database::open_path(
        &dir.path().join("flows.sqlite"),
        TokenCipher::from_key([3u8; 32]),
        true,
    )
    .unwrap();
    Services::with_database(config, db).unwrap()
}

fn mitra() -> Actor {
    Actor::new("uid-mitra", "mitra@example.com", "jwt")
}

fn draft(platform: Platform, image: Option<&str>) -> Draft {
    Draft {
        topic: Topic::Promo,
        platform,
        content: "Promo umrah akhir tahun".into(),
        image_url: image.map(String::from),
    }
}

async fn redirect_state(services: &Services, actor: &Actor) -> String {
    let AuthorizationRequest::Redirect { url } = services
        .linker
        .begin_authorization(actor, Platform::TikTok)
        .await
        .unwrap()
    else {
        panic!("TikTok should use the redirect flow");
    };
    CallbackParams::parse(&url).state.unwrap()
}

#[tokio::test]
async fn tiktok_link_then_publish() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/oauth/token/"))
        .and(body_string_contains("code=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "act.live",
            "open_id": "open-9",
            "scope": "user.info.basic,video.publish",
            "expires_in": 86400
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/post/publish/content/init/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "publish_id": "pub-77" },
            "error": { "code": "ok", "message": "" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let services = services(&dir, &server);
    let actor = mitra();

    let state = redirect_state(&services, &actor).await;
    let callback = format!("https://dash.example.com/settings?tab=social&code=abc123&state={state}");
    let outcome = services
        .linker
        .complete_authorization(&actor, &callback)
        .await
        .unwrap();
    let CallbackOutcome::Linked { integration, clean_url } = outcome else {
        panic!("expected a linked integration");
    };
    assert_eq!(integration.provider_user_id.as_deref(), Some("open-9"));
    assert_eq!(clean_url, "https://dash.example.com/settings?tab=social");

    // Reloading the sanitized URL does nothing
    assert_eq!(
        services
            .linker
            .complete_authorization(&actor, &clean_url)
            .await
            .unwrap(),
        CallbackOutcome::NoOp
    );

    let post = services
        .posts
        .schedule(
            &actor,
            draft(Platform::TikTok, Some("https://img.example.com/p.jpg")),
            Utc::now() + chrono::Duration::minutes(30),
        )
        .await
        .unwrap();

    let result = services
        .functions()
        .call("postToSocial", Some(&actor), json!({ "postId": post.id }))
        .await
        .unwrap();
    assert_eq!(result["success"], json!(true));
    assert_eq!(result["externalId"], json!("pub-77"));
}

#[tokio::test]
async fn mismatched_state_never_exchanges_or_persists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/oauth/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let services = services(&dir, &server);
    let actor = mitra();

    let _ = redirect_state(&services, &actor).await;
    let err = services
        .linker
        .complete_authorization(&actor, "https://dash.example.com/settings?code=abc123&state=S1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CsrfMismatch(Platform::TikTok)));
    assert!(
        services
            .integrations
            .get(&actor.uid, Platform::TikTok)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn scheduled_post_reaches_watcher() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let services = services(&dir, &server);
    let actor = mitra();

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<ScheduledPost>>();
    let _subscription = services
        .posts
        .watch_for_user(&actor, move |posts| {
            let _ = tx.send(posts);
        })
        .await
        .unwrap();

    let initial = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(initial.is_empty());

    let post = services
        .posts
        .schedule(
            &actor,
            draft(Platform::Instagram, None),
            Utc::now() + chrono::Duration::hours(2),
        )
        .await
        .unwrap();

    let updated = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id, post.id);
    assert_eq!(updated[0].status, PostStatus::Scheduled);
}

#[tokio::test]
async fn generate_content_guards() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let services = services(&dir, &server);

    let err = services
        .functions()
        .call(
            "generateContent",
            None,
            json!({ "topic": "PROMO", "platform": "INSTAGRAM" }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, "unauthenticated");

    let err = services
        .functions()
        .call(
            "generateContent",
            Some(&mitra()),
            json!({ "topic": "", "platform": "INSTAGRAM" }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, "invalid-argument");
}

#[tokio::test]
async fn due_facebook_post_is_published_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "page-1", "access_token": "page-token" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/page-1/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "page-1_5" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let services = services(&dir, &server);
    let actor = mitra();

    services
        .linker
        .persist_integration(
            &actor,
            Platform::Facebook,
            &socialdesk::models::TokenPayload::new("user-token"),
        )
        .await
        .unwrap();
    let post = services
        .posts
        .schedule(
            &actor,
            draft(Platform::Facebook, None),
            Utc::now() + chrono::Duration::minutes(5),
        )
        .await
        .unwrap();

    let later = Utc::now() + chrono::Duration::hours(1);
    let reports = services.publisher.publish_due(later).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, PostStatus::Posted);

    // Settled posts are not picked up again
    assert!(services.publisher.publish_due(later).await.unwrap().is_empty());

    let stored = services.posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(stored.external_id.as_deref(), Some("page-1_5"));

    // Unlinking twice is fine
    for _ in 0..2 {
        services
            .linker
            .disconnect(&actor, Platform::Facebook, Confirmation::Confirmed)
            .await
            .unwrap();
    }
}
