//! End-to-end flows against a mocked backend: sign-in, category
//! entitlement, poster browsing, and the composition/share pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use posterkit::auth::SessionStore;
use posterkit::catalog::table_name;
use posterkit::config::ClientOptions;
use posterkit::error::Error;
use posterkit::share::{
    CanvasLayout, PermissionGate, Renderer, ShareOutcome, SharePayload, ShareSheet, ShareState,
    ShareFlow, ShareTarget,
};
use posterkit::PosterKit;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server_uri: &str) -> PosterKit {
    let options = ClientOptions::default()
        .with_identity_base(server_uri)
        .with_images_base(&format!("{}/images", server_uri));
    PosterKit::new_with_options(server_uri, "test_key", options, None)
}

async fn mount_identity(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idToken": "signin_token",
            "refreshToken": "signin_refresh",
            "localId": "uid_1",
            "email": "test@example.com"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id_token": "fresh_token",
            "refresh_token": "fresh_refresh"
        })))
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login_api_app.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "email": "test@example.com",
            "created_at": "2024-01-01",
            "contactbar": "myfirm.png",
            "subscribed_categories": [
                {
                    "id": 1,
                    "category_name": "Tax Professional",
                    "start_date": "2024-01-01",
                    "end_date": "2099-01-01"
                },
                {
                    "id": 3,
                    "category_name": "Real Estate",
                    "start_date": "2019-01-01",
                    "end_date": "2020-01-01"
                }
            ],
            "non_subscribed_categories": [
                { "id": 2, "category_name": "Interior Design" }
            ]
        })))
        .mount(server)
        .await;
}

struct StubRenderer;

#[async_trait]
impl Renderer for StubRenderer {
    async fn capture(&self, _layout: &CanvasLayout) -> Result<Vec<u8>, Error> {
        Ok(vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a])
    }
}

struct StubSheet;

#[async_trait]
impl ShareSheet for StubSheet {
    async fn present(&self, payload: &SharePayload) -> Result<ShareOutcome, Error> {
        match payload {
            SharePayload::InlineData { data_uri } => {
                assert!(data_uri.starts_with("data:image/png;base64,"));
            }
            SharePayload::FileUri { uri } => {
                assert!(uri.starts_with("file://"));
            }
        }
        Ok(ShareOutcome::Completed)
    }
}

struct NoGate;

impl PermissionGate for NoGate {
    fn storage_permission_required(&self) -> bool {
        false
    }

    fn request_storage_permission(&self) -> bool {
        true
    }
}

#[tokio::test]
async fn browse_and_share_an_entitled_poster() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/fetch_posters_types.php"))
        .and(body_string_contains("idToken=fresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "poster_types": [
                { "id": 1, "poster_type_name": "Marketing Posters" },
                { "id": 2, "poster_type_name": "Festival Posters" }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/fetch_posters_list.php"))
        .and(body_string_contains("tableName=tax_professional_posters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "posters": [
                {
                    "id": 10,
                    "poster_name": "GST Deadline",
                    "poster_image_url": "gst_deadline.png",
                    "description": "GST filing deadline reminder",
                    "keywords": "gst,tax,deadline"
                }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/fetch_contactbar.php"))
        .and(body_string_contains("categoryId=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "contactbar": "myfirm.png",
            "watermark": "My Firm"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.auth().sign_in("test@example.com", "password123").await.unwrap();

    let types = client.catalog().poster_types().await.unwrap();
    assert_eq!(types.len(), 2);

    let table = table_name(&types[0].poster_type_name, "Tax Professional");
    assert_eq!(table, "tax_professional_posters");

    let posters = client.catalog().posters(&table).await.unwrap();
    assert_eq!(posters.len(), 1);

    // Category 1 is entitled until 2099, so the poster resolves into the
    // paid pool and the account's own contact bar is used.
    let composition = client
        .composer()
        .composition_for(1, "Tax Professional", &posters[0].poster_image_url)
        .await
        .unwrap();
    assert_eq!(
        composition.poster_image_url,
        format!("{}/posters/paid/gst_deadline.png", server.uri())
    );
    assert_eq!(
        composition.contact_bar_image_url,
        format!("{}/images/myfirm.png", server.uri())
    );
    assert_eq!(composition.watermark_text, "My Firm");

    let renderer = StubRenderer;
    let sheet = StubSheet;
    let gate = NoGate;
    let mut flow = ShareFlow::new(&renderer, &sheet, &gate);
    let outcome = flow.run(&composition, ShareTarget::InlineData).await.unwrap();
    assert_eq!(outcome, ShareState::Shared);
    assert_eq!(flow.state(), ShareState::Idle);
}

#[tokio::test]
async fn lapsed_subscription_resolves_into_the_promotional_pool() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_login(&server).await;

    let client = test_client(&server.uri());
    client.auth().sign_in("test@example.com", "password123").await.unwrap();

    // Category 3 lapsed in 2020: promotional pool, stock contact bar and
    // watermark, and no contact-bar fetch is attempted (none is mocked).
    let composition = client
        .composer()
        .composition_for(3, "Real Estate", "open_house.png")
        .await
        .unwrap();
    assert_eq!(
        composition.poster_image_url,
        format!("{}/posters/notpaid/open_house.png", server.uri())
    );
    assert_eq!(
        composition.contact_bar_image_url,
        format!("{}/images/yourfirmcontactbartaxprofessional.png", server.uri())
    );
    assert_eq!(composition.watermark_text, "OneClick Branding");
}

#[tokio::test]
async fn contact_bar_failure_degrades_to_stock_assets() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/fetch_contactbar.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Fatal error</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.auth().sign_in("test@example.com", "password123").await.unwrap();

    let composition = client
        .composer()
        .composition_for(1, "Tax Professional", "gst_deadline.png")
        .await
        .unwrap();

    // Entitled poster pool, but stock contact bar and watermark
    assert!(composition.poster_image_url.contains("/posters/paid/"));
    assert!(composition
        .contact_bar_image_url
        .ends_with("yourfirmcontactbartaxprofessional.png"));
    assert_eq!(composition.watermark_text, "OneClick Branding");
}

#[tokio::test]
async fn subscription_details_update_the_session() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/subscriptiondetails.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "subscribed_categories": [
                {
                    "id": 2,
                    "category_name": "Interior Design",
                    "start_date": "2025-01-01",
                    "end_date": "2099-01-01"
                }
            ],
            "non_subscribed_categories": []
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.auth().sign_in("test@example.com", "password123").await.unwrap();

    let details = client.subscriptions().subscription_details().await.unwrap();
    assert_eq!(details.subscribed.len(), 1);
    assert_eq!(details.subscribed[0].id, 2);

    let session = client.auth().current_session().unwrap();
    assert_eq!(session.subscribed, details.subscribed);
    assert!(session.non_subscribed.is_empty());
}

#[tokio::test]
async fn subscription_status_applies_stock_defaults() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/subscription_status.php"))
        .and(body_string_contains("categoryId=2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "isSubscribed": false
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.auth().sign_in("test@example.com", "password123").await.unwrap();

    let status = client.subscriptions().subscription_status(2).await.unwrap();
    assert!(!status.is_subscribed);
    assert_eq!(status.contact_bar_image, "yourfirmcontactbartaxprofessional.png");
    assert_eq!(status.watermark, "OneClick Branding");
}

#[tokio::test]
async fn search_sends_term_and_category() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/search_posters.php"))
        .and(body_string_contains("searchTerm=TAX"))
        .and(body_string_contains("categoryName=Tax+Professional"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "posters": [
                {
                    "id": 10,
                    "poster_name": "GST Deadline",
                    "poster_image_url": "gst_deadline.png",
                    "description": "Income tax filing reminder",
                    "keywords": "gst,tax,deadline"
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.auth().sign_in("test@example.com", "password123").await.unwrap();

    let results = client.catalog().search("Tax Professional", "TAX").await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(posterkit::catalog::matches_search(&results[0], "TAX"));
}

#[tokio::test]
async fn backend_failure_messages_surface_verbatim() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/fetch_posters_list.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Table not found: bogus_table"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.auth().sign_in("test@example.com", "password123").await.unwrap();

    let err = client.catalog().posters("bogus_table").await.unwrap_err();
    assert!(matches!(err, Error::Api(msg) if msg == "Table not found: bogus_table"));
}

#[tokio::test]
async fn whitespace_wrapped_faq_body_parses() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_login(&server).await;

    let body = format!(
        "\n\n  {}",
        json!({
            "success": true,
            "faqs": [
                { "question": "How do I share a poster?", "answer": "Tap it." }
            ]
        })
    );
    Mock::given(method("POST"))
        .and(path("/fetch_faqs.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.auth().sign_in("test@example.com", "password123").await.unwrap();

    let faqs = client.profile().faqs().await.unwrap();
    assert_eq!(faqs.len(), 1);
    assert_eq!(faqs[0].question, "How do I share a poster?");
}

#[tokio::test]
async fn profile_endpoint_uses_the_bearer_header() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/latestsubscription.php"))
        .and(header("Authorization", "Bearer fresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "name": "Test User",
            "email": "test@example.com",
            "mobile": "9999999999",
            "photo": "photo.png",
            "created_at": "2024-01-01",
            "contactbar": "myfirm.png",
            "subscribed_categories": []
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.auth().sign_in("test@example.com", "password123").await.unwrap();

    let profile = client.profile().latest_subscription().await.unwrap();
    assert_eq!(profile.name, "Test User");
    assert_eq!(profile.contactbar, "myfirm.png");
}

#[tokio::test]
async fn every_privileged_call_refreshes_the_token() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idToken": "signin_token",
            "refreshToken": "signin_refresh",
            "localId": "uid_1",
            "email": "test@example.com"
        })))
        .mount(&server)
        .await;

    // Counted refresh mock: token refresh is per-call, never coalesced
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id_token": "fresh_token",
            "refresh_token": "fresh_refresh"
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/fetch_posters_types.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "poster_types": []
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.auth().sign_in("test@example.com", "password123").await.unwrap();

    let catalog = client.catalog();
    catalog.poster_types().await.unwrap();
    catalog.poster_types().await.unwrap();
}

#[tokio::test]
async fn sign_up_registers_then_signs_in() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idToken": "signup_token",
            "refreshToken": "signup_refresh",
            "localId": "uid_new",
            "email": "new@example.com"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/register_user.php"))
        .and(body_string_contains("firebase_uid=uid_new"))
        .and(body_string_contains("mobile=9999999999"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User registered successfully"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let session = client
        .auth()
        .sign_up("new@example.com", "password123", "9999999999")
        .await
        .unwrap();

    assert_eq!(session.id_token, "signup_token");
    assert!(client.auth().is_signed_in());
}

/// Session store that counts writes, to check persistence is wired
/// through sign-in and sign-out.
#[derive(Default)]
struct CountingStore {
    inner: posterkit::auth::MemorySessionStore,
    saves: AtomicUsize,
}

impl SessionStore for CountingStore {
    fn load(&self) -> Result<Option<posterkit::auth::Session>, Error> {
        self.inner.load()
    }

    fn save(&self, session: &posterkit::auth::Session) -> Result<(), Error> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(session)
    }

    fn clear(&self) -> Result<(), Error> {
        self.inner.clear()
    }
}

#[tokio::test]
async fn sign_out_leaves_no_session_behind() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_login(&server).await;

    let store = std::sync::Arc::new(CountingStore::default());
    let options = ClientOptions::default().with_identity_base(&server.uri());
    let client =
        PosterKit::new_with_options(&server.uri(), "test_key", options, Some(store.clone()));

    client.auth().sign_in("test@example.com", "password123").await.unwrap();
    assert!(store.saves.load(Ordering::SeqCst) >= 1);
    assert!(store.load().unwrap().is_some());

    client.auth().sign_out().unwrap();
    assert!(client.auth().current_session().is_none());
    assert!(store.load().unwrap().is_none());

    // A new sign-in starts from the login response, not stale state
    client.auth().sign_in("test@example.com", "password123").await.unwrap();
    let session = client.auth().current_session().unwrap();
    assert_eq!(session.subscribed.len(), 2);
}
