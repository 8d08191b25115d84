//! Axum route handlers: HTML pages, form posts, and the JSON RPC API.

use crate::backend::{Services, Session};
use crate::client::{ClientContext, ClientRegistry, NoticeKind};
use crate::config::Config;
use crate::dashboard::{self, AuthMode, DashboardView};
use crate::error::{ForestError, ForestResult};
use crate::events::MemoryEvents;
use crate::feed::FeedState;
use crate::form::{PLANTED_MESSAGE, PlantMemoryForm, today};
use crate::shell::{self, Screen};
use crate::store::ImageFile;
use crate::tree::{TreeScene, TreeState};
use axum::extract::{Multipart, Query, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::Form;
use base64::Engine;
use chrono::NaiveDate;
use memory_forest_types::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub const CLIENT_COOKIE: &str = "forest_client";
pub const TOKEN_COOKIE: &str = "forest_token";

const CONFIRM_EMAIL_MESSAGE: &str = "Check your email to confirm your account!";

pub struct AppState {
    pub config: Config,
    pub services: Services,
    pub events: MemoryEvents,
    pub clients: ClientRegistry,
    pub start_time: Instant,
    pub planted: AtomicU64,
}

// =====================================================
// Cookies
// =====================================================

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn set_cookie(name: &str, value: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age_secs
    )
}

fn clear_cookie(name: &str) -> String {
    set_cookie(name, "", 0)
}

/// The calling browser's client context plus any cookies to set on the reply.
struct Caller {
    client: Arc<ClientContext>,
    cookies: Vec<String>,
}

impl Caller {
    /// A bearer token wins over cookie state and gets a one-request context.
    async fn resolve(state: &AppState, headers: &HeaderMap) -> Self {
        if let Some(token) = bearer_token(headers) {
            let client = state.clients.transient();
            client.resolve_session(Some(&token)).await;
            return Self {
                client,
                cookies: Vec::new(),
            };
        }

        let known = read_cookie(headers, CLIENT_COOKIE);
        let client = state.clients.get_or_create(known.as_deref());
        let mut cookies = Vec::new();
        if known.as_deref() != Some(client.id.as_str()) {
            cookies.push(set_cookie(
                CLIENT_COOKIE,
                &client.id,
                state.config.client_idle_secs,
            ));
        }

        let stored_token = read_cookie(headers, TOKEN_COOKIE);
        client.resolve_session(stored_token.as_deref()).await;
        Self { client, cookies }
    }

    fn respond(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        for cookie in self.cookies {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => log::warn!("[FOREST] Dropping malformed cookie: {}", e),
            }
        }
        response
    }
}

// =====================================================
// Pages
// =====================================================

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub plant: Option<u8>,
}

// GET /
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IndexQuery>,
    headers: HeaderMap,
) -> Response {
    let caller = Caller::resolve(&state, &headers).await;
    let client = caller.client.clone();

    let session = match shell::resolve(&client.session.state()) {
        Screen::Loading => return caller.respond(Html(shell::loading_page())),
        Screen::Entry => return caller.respond(Redirect::to("/auth")),
        Screen::Dashboard => match client.session.session() {
            Some(session) => session,
            None => return caller.respond(Redirect::to("/auth")),
        },
    };

    let board = client.mount_dashboard();
    match query.plant {
        Some(0) => board.form.close(),
        Some(_) => board.form.open(),
        None => {}
    }

    let (feed, tree) = tokio::join!(board.feed.load(&session), board.tree.load(&session));
    let fields = board.form.fields();
    let form_error = board.form.take_error();
    let notice = client.take_notice();

    let page = dashboard::dashboard_page(
        &DashboardView {
            tree: &tree,
            feed: &feed,
            form_open: board.form.is_open(),
            form_loading: board.form.is_loading(),
            fields: &fields,
            form_error: form_error.as_deref(),
        },
        notice.as_ref(),
    );
    caller.respond(Html(page))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub mode: Option<String>,
}

// GET /auth
pub async fn auth_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Response {
    let caller = Caller::resolve(&state, &headers).await;
    if caller.client.session.session().is_some() {
        return caller.respond(Redirect::to("/"));
    }
    let mode = match query.mode.as_deref() {
        Some("signup") => AuthMode::SignUp,
        _ => AuthMode::SignIn,
    };
    let notice = caller.client.take_notice();
    let page = dashboard::entry_page(mode, notice.as_ref());
    caller.respond(Html(page))
}

// POST /auth/sign-in
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(req): Form<CredentialsRequest>,
) -> Response {
    let mut caller = Caller::resolve(&state, &headers).await;
    match caller.client.sign_in(&req.email, &req.password).await {
        Ok(()) => {
            if let Some(session) = caller.client.session.session() {
                caller
                    .cookies
                    .push(set_cookie(TOKEN_COOKIE, &session.access_token, state.config.client_idle_secs));
            }
            caller.respond(Redirect::to("/"))
        }
        Err(e) => {
            log::info!("[FOREST] Sign-in rejected: {}", e);
            caller.client.push_notice(NoticeKind::Error, e.to_string());
            caller.respond(Redirect::to("/auth"))
        }
    }
}

// POST /auth/sign-up
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(req): Form<CredentialsRequest>,
) -> Response {
    let mut caller = Caller::resolve(&state, &headers).await;
    let client = caller.client.clone();
    match client.sign_up(&req.email, &req.password).await {
        Ok(outcome) if outcome.confirmation_required => {
            client.push_notice(NoticeKind::Success, CONFIRM_EMAIL_MESSAGE);
            caller.respond(Redirect::to("/auth"))
        }
        Ok(_) => match client.sign_in(&req.email, &req.password).await {
            Ok(()) => {
                if let Some(session) = client.session.session() {
                    caller.cookies.push(set_cookie(
                        TOKEN_COOKIE,
                        &session.access_token,
                        state.config.client_idle_secs,
                    ));
                }
                caller.respond(Redirect::to("/"))
            }
            Err(e) => {
                client.push_notice(NoticeKind::Error, e.to_string());
                caller.respond(Redirect::to("/auth"))
            }
        },
        Err(e) => {
            log::info!("[FOREST] Sign-up rejected: {}", e);
            client.push_notice(NoticeKind::Error, e.to_string());
            caller.respond(Redirect::to("/auth?mode=signup"))
        }
    }
}

// POST /auth/sign-out
pub async fn sign_out(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let mut caller = Caller::resolve(&state, &headers).await;
    caller.client.sign_out().await;
    caller.cookies.push(clear_cookie(TOKEN_COOKIE));
    caller.respond(Redirect::to("/auth"))
}

// GET /grove
pub async fn grove(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let caller = Caller::resolve(&state, &headers).await;
    if caller.client.session.session().is_none() {
        return caller.respond(Redirect::to("/auth"));
    }
    let notice = caller.client.take_notice();
    let page = dashboard::grove_page(&caller.client.grove, notice.as_ref());
    caller.respond(Html(page))
}

// POST /grove/connect
pub async fn grove_connect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(req): Form<ConnectRequest>,
) -> Response {
    let caller = Caller::resolve(&state, &headers).await;
    if caller.client.session.session().is_none() {
        return caller.respond(Redirect::to("/auth"));
    }
    if let Err(e) = caller.client.grove.connect(&req.name) {
        caller.client.push_notice(NoticeKind::Error, e.to_string());
    }
    caller.respond(Redirect::to("/grove"))
}

// POST /memories/plant
pub async fn plant_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let caller = Caller::resolve(&state, &headers).await;
    let client = caller.client.clone();
    let session = client.session.session();
    let Some(board) = client.dashboard() else {
        return caller.respond(Redirect::to("/auth"));
    };
    let form = &board.form;
    form.open();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                log::warn!("[FOREST] Malformed plant submission: {}", e);
                client.push_notice(NoticeKind::Error, format!("Could not read the form: {}", e));
                return caller.respond(Redirect::to("/?plant=1"));
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(|c| c.to_string());
                match field.bytes().await {
                    // An empty file input means "keep whatever is attached".
                    Ok(bytes) if bytes.is_empty() || file_name.is_empty() => {}
                    Ok(bytes) => form.attach_image(ImageFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    }),
                    Err(e) => {
                        client.push_notice(NoticeKind::Error, format!("Could not read the image: {}", e));
                        return caller.respond(Redirect::to("/?plant=1"));
                    }
                }
            }
            "description" | "emotion" | "memory_date" => {
                let value = field.text().await.unwrap_or_default();
                match name.as_str() {
                    "description" => form.set_description(&value),
                    "emotion" => form.set_emotion(&value),
                    _ => {
                        if let Ok(date) = NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
                            form.set_date(date);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let target = finish_plant(&client, form, session.as_ref()).await;
    caller.respond(Redirect::to(target))
}

/// Submits the dashboard form and picks where to send the browser. A failure
/// is shown by the reopened form itself, so no notice is queued for it.
async fn finish_plant(
    client: &ClientContext,
    form: &PlantMemoryForm,
    session: Option<&Session>,
) -> &'static str {
    match form.submit(session).await {
        Ok(_) => {
            client.push_notice(NoticeKind::Success, PLANTED_MESSAGE);
            "/"
        }
        Err(e) => {
            log::info!("[FOREST] Plant rejected for client {}: {}", client.id, e);
            "/?plant=1"
        }
    }
}

// =====================================================
// RPC
// =====================================================

fn rpc_error<T: Serialize>(e: &ForestError) -> (StatusCode, Json<RpcResponse<T>>) {
    (e.status(), Json(RpcResponse::err(e.to_string())))
}

fn decode_image(upload: ImageUpload) -> Result<ImageFile, ForestError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(upload.data_base64.trim())
        .map_err(|e| ForestError::Validation(format!("Image is not valid base64: {}", e)))?;
    Ok(ImageFile {
        file_name: upload.file_name,
        content_type: upload.content_type,
        bytes,
    })
}

/// Copies a JSON plant request onto the form. Every field is overwritten;
/// a missing date means today.
fn apply_plant_request(form: &PlantMemoryForm, req: PlantMemoryRequest) -> ForestResult<()> {
    let image = req.image.map(decode_image).transpose()?;
    form.set_description(&req.description);
    form.set_emotion(&req.emotion);
    form.set_date(req.memory_date.unwrap_or_else(today));
    match image {
        Some(image) => form.attach_image(image),
        None => form.clear_image(),
    }
    Ok(())
}

// POST /rpc/memories/plant
pub async fn rpc_plant(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PlantMemoryRequest>,
) -> Response {
    let caller = Caller::resolve(&state, &headers).await;
    let client = caller.client.clone();
    let Some(board) = client.dashboard() else {
        return caller.respond(rpc_error::<Memory>(&ForestError::Unauthenticated));
    };

    let form = &board.form;
    if let Err(e) = apply_plant_request(form, req) {
        return caller.respond(rpc_error::<Memory>(&e));
    }

    let result = form.submit(client.session.session().as_ref()).await;
    // Errors are returned in the body; don't replay them on the next page.
    form.take_error();
    match result {
        Ok(memory) => {
            caller.respond((StatusCode::OK, Json(RpcResponse::ok(memory))))
        }
        Err(e) => caller.respond(rpc_error::<Memory>(&e)),
    }
}

// GET /rpc/memories/recent
pub async fn rpc_recent(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let caller = Caller::resolve(&state, &headers).await;
    let client = caller.client.clone();
    let (Some(session), Some(board)) = (client.session.session(), client.dashboard()) else {
        return caller.respond(rpc_error::<FeedState>(&ForestError::Unauthenticated));
    };
    let feed = board.feed.load(&session).await;
    caller.respond((StatusCode::OK, Json(RpcResponse::ok(feed))))
}

// GET /rpc/memories/count
pub async fn rpc_count(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let caller = Caller::resolve(&state, &headers).await;
    let client = caller.client.clone();
    let (Some(session), Some(board)) = (client.session.session(), client.dashboard()) else {
        return caller.respond(rpc_error::<MemoryCount>(&ForestError::Unauthenticated));
    };
    let tree = board.tree.load(&session).await;
    match tree.error {
        Some(e) => caller.respond(rpc_error::<MemoryCount>(&ForestError::Read(e))),
        None => caller.respond((
            StatusCode::OK,
            Json(RpcResponse::ok(MemoryCount { count: tree.count })),
        )),
    }
}

#[derive(Debug, Serialize)]
pub struct TreeSnapshot {
    pub state: TreeState,
    pub caption: String,
    pub scene: TreeScene,
}

// GET /rpc/tree
/// Current tree state. Fetched on first use, then kept current by plant events.
pub async fn rpc_tree(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let caller = Caller::resolve(&state, &headers).await;
    let client = caller.client.clone();
    let (Some(session), Some(board)) = (client.session.session(), client.dashboard()) else {
        return caller.respond(rpc_error::<TreeSnapshot>(&ForestError::Unauthenticated));
    };
    let mut tree = board.tree.state();
    if tree.loading {
        tree = board.tree.load(&session).await;
    }
    let snapshot = TreeSnapshot {
        caption: tree.caption(),
        scene: tree.scene(),
        state: tree,
    };
    caller.respond((StatusCode::OK, Json(RpcResponse::ok(snapshot))))
}

// GET /rpc/session
pub async fn rpc_session(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let caller = Caller::resolve(&state, &headers).await;
    let info = caller.client.session.info();
    caller.respond((StatusCode::OK, Json(RpcResponse::ok(info))))
}

// GET /rpc/status
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RpcResponse<ServiceStatus>>) {
    (
        StatusCode::OK,
        Json(RpcResponse::ok(ServiceStatus {
            running: true,
            uptime_secs: state.start_time.elapsed().as_secs(),
            backend: state.services.name.to_string(),
            active_sessions: state.clients.len(),
            memories_planted_since_start: state.planted.load(Ordering::Relaxed),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ViewOptions;
    use crate::config::ReadErrorPolicy;
    use crate::testing::TestBackend;
    use std::time::Duration;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    fn app_state(backend: &Arc<TestBackend>) -> AppState {
        let config = Config::default();
        AppState {
            clients: ClientRegistry::new(
                backend.services(),
                backend.events.clone(),
                ViewOptions {
                    feed_limit: 20,
                    read_errors: ReadErrorPolicy::Silent,
                    site_url: None,
                },
                Duration::from_secs(60),
            ),
            config,
            services: backend.services(),
            events: backend.events.clone(),
            start_time: Instant::now(),
            planted: AtomicU64::new(0),
        }
    }

    #[test]
    fn test_read_cookie() {
        let h = headers(&[("cookie", "a=1; forest_client=abc; forest_token=")]);
        assert_eq!(read_cookie(&h, CLIENT_COOKIE).as_deref(), Some("abc"));
        assert_eq!(read_cookie(&h, "a").as_deref(), Some("1"));
        assert_eq!(read_cookie(&h, TOKEN_COOKIE), None);
        assert_eq!(read_cookie(&HeaderMap::new(), CLIENT_COOKIE), None);
    }

    #[test]
    fn test_set_cookie_is_http_only() {
        let cookie = set_cookie(TOKEN_COOKIE, "tok", 60);
        assert_eq!(cookie, "forest_token=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=60");
        assert!(clear_cookie(TOKEN_COOKIE).ends_with("Max-Age=0"));
    }

    #[test]
    fn test_decode_image_rejects_bad_base64() {
        let err = decode_image(ImageUpload {
            file_name: "a.png".to_string(),
            content_type: None,
            data_base64: "not base64!".to_string(),
        })
        .unwrap_err();
        assert!(err.is_validation());

        let ok = decode_image(ImageUpload {
            file_name: "a.png".to_string(),
            content_type: Some("image/png".to_string()),
            data_base64: "iVBORw==".to_string(),
        })
        .unwrap();
        assert_eq!(ok.bytes, vec![0x89, 0x50, 0x4e, 0x47]);
    }

    #[tokio::test]
    async fn test_caller_sets_client_cookie_once() {
        let backend = TestBackend::new().await;
        let state = app_state(&backend);

        let first = Caller::resolve(&state, &HeaderMap::new()).await;
        assert_eq!(first.cookies.len(), 1);
        assert!(first.cookies[0].starts_with(&format!("{}={};", CLIENT_COOKIE, first.client.id)));

        let cookie = format!("{}={}", CLIENT_COOKIE, first.client.id);
        let again = Caller::resolve(&state, &headers(&[("cookie", &cookie)])).await;
        assert!(again.cookies.is_empty());
        assert!(Arc::ptr_eq(&first.client, &again.client));
    }

    #[tokio::test]
    async fn test_token_cookie_restores_session() {
        let backend = TestBackend::new().await;
        let session = backend.session().await;
        let state = app_state(&backend);

        let cookie = format!("{}={}", TOKEN_COOKIE, session.access_token);
        let caller = Caller::resolve(&state, &headers(&[("cookie", &cookie)])).await;
        assert_eq!(
            caller.client.session.current_user().map(|u| u.id),
            Some(session.user.id.clone())
        );
        assert!(caller.client.dashboard().is_some());

        let anonymous = Caller::resolve(&state, &HeaderMap::new()).await;
        assert!(anonymous.client.session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_bearer_callers_are_not_registered() {
        let backend = TestBackend::new().await;
        let session = backend.session().await;
        let state = app_state(&backend);
        let auth = format!("Bearer {}", session.access_token);

        for _ in 0..50 {
            let caller = Caller::resolve(&state, &headers(&[("authorization", &auth)])).await;
            assert!(caller.cookies.is_empty());
            assert_eq!(
                caller.client.session.current_user().map(|u| u.id),
                Some(session.user.id.clone())
            );
        }
        assert!(state.clients.is_empty());
        assert_eq!(backend.events.subscriber_count(), 0);

        let form = backend.form();
        form.set_description("Picnic at the lake");
        form.set_emotion("Happy");
        form.submit(Some(&session)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            backend.calls(),
            vec![crate::testing::Call::Insert { image_url: None }]
        );
    }

    #[tokio::test]
    async fn test_bearer_overrides_client_cookie() {
        let backend = TestBackend::new().await;
        let ada = backend.session().await;
        let bob = backend.session().await;
        let state = app_state(&backend);

        let cookie = format!("{}={}", TOKEN_COOKIE, ada.access_token);
        let browser = Caller::resolve(&state, &headers(&[("cookie", &cookie)])).await;
        assert_eq!(
            browser.client.session.current_user().map(|u| u.id),
            Some(ada.user.id.clone())
        );

        let cookie = format!("{}={}", CLIENT_COOKIE, browser.client.id);
        let auth = format!("Bearer {}", bob.access_token);
        let api = Caller::resolve(
            &state,
            &headers(&[("cookie", &cookie), ("authorization", &auth)]),
        )
        .await;
        assert_eq!(
            api.client.session.current_user().map(|u| u.id),
            Some(bob.user.id.clone())
        );
        assert!(!Arc::ptr_eq(&browser.client, &api.client));
    }

    #[tokio::test]
    async fn test_failed_plant_reports_once_through_the_form() {
        let backend = TestBackend::new().await;
        let session = backend.session().await;
        let client = ClientContext::new(
            "c1".to_string(),
            backend.services(),
            backend.events.clone(),
            ViewOptions {
                feed_limit: 20,
                read_errors: ReadErrorPolicy::Silent,
                site_url: None,
            },
        );
        client.resolve_session(Some(&session.access_token)).await;
        let board = client.dashboard().unwrap();
        let current = client.session.session();

        assert_eq!(finish_plant(&client, &board.form, current.as_ref()).await, "/?plant=1");
        assert!(client.take_notice().is_none());
        assert_eq!(
            board.form.take_error().as_deref(),
            Some(crate::form::REQUIRED_FIELDS_MESSAGE)
        );

        board.form.set_description("Picnic at the lake");
        board.form.set_emotion("Happy");
        assert_eq!(finish_plant(&client, &board.form, current.as_ref()).await, "/");
        assert_eq!(
            client.take_notice().map(|n| (n.kind, n.message)),
            Some((NoticeKind::Success, PLANTED_MESSAGE.to_string()))
        );
    }

    #[tokio::test]
    async fn test_json_plant_without_date_means_today() {
        let backend = TestBackend::new().await;
        let form = backend.form();
        form.set_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        form.attach_image(ImageFile {
            file_name: "old.jpg".to_string(),
            content_type: None,
            bytes: vec![1],
        });

        apply_plant_request(
            &form,
            PlantMemoryRequest {
                description: "Picnic".to_string(),
                emotion: "Happy".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        let fields = form.fields();
        assert_eq!(fields.memory_date, today());
        assert!(fields.image.is_none());

        let may_first = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        apply_plant_request(
            &form,
            PlantMemoryRequest {
                memory_date: Some(may_first),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(form.fields().memory_date, may_first);
    }
}
