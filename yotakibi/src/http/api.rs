// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::extract::{Extension, Form, Path, Query};
use axum::headers::UserAgent;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Json, TypedHeader};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::db::errors::SqlStorageError;
use crate::db::traits::EmberStore;
use crate::db::types::{ListScope, PageRequest};
use crate::embers::moderation::{self, ModerationError};
use crate::embers::submit::{Author, Origin, PolicyRejection, SubmitError, Submission};
use crate::embers::{EmberView, Visibility, CONTENT_LENGTH, PASSPHRASE_LENGTH};
use crate::gate::hours::{ClosedReason, CLOSING_HOUR, OPENING_HOUR};
use crate::gate::rate_limit::{MAX_SUBMISSIONS_PER_WINDOW, WINDOW_MINUTES};
use crate::gate::role::Role;
use crate::generator::GeneratorError;
use crate::http::context::HttpServiceContext;
use crate::http::extract::ClientAddress;
use crate::http::middleware::NOT_ALLOWED_MESSAGE;
use crate::http::session::SessionHandle;
use crate::identity::IdentityToken;
use crate::search;
use crate::session::Notice;

/// Header carrying the secret of the generation trigger.
pub const BOT_SECRET_HEADER: &str = "x-bot-secret";

/// Listing or search results as seen by the current role.
#[derive(Debug, Serialize)]
pub struct ListingResponse {
    role: Role,
    page: u32,
    per_page: u32,
    total: u64,
    has_next: bool,
    has_prev: bool,
    embers: Vec<EmberView>,
    notices: Vec<Notice>,
    last_passphrase: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    page: Option<String>,
}

/// Handle requests for the listing of embers.
pub async fn handle_listing(
    Extension(context): Extension<HttpServiceContext>,
    Extension(role): Extension<Role>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<ListingResponse>, EmberHttpError> {
    let scope = if role.is_admin() {
        ListScope::Everything
    } else {
        ListScope::Public
    };

    let page = context
        .store
        .list_embers(scope, PageRequest::parse(query.page.as_deref()))
        .await?;

    let (notices, last_passphrase) =
        session.update(|session| (session.take_notices(), session.last_passphrase.clone()));

    Ok(Json(ListingResponse {
        role,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
        has_next: page.has_next(),
        has_prev: page.has_prev(),
        embers: page
            .items
            .iter()
            .map(|ember| EmberView::for_role(ember, role))
            .collect(),
        notices,
        last_passphrase,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    role: Role,
    query: String,
    embers: Vec<EmberView>,
    notices: Vec<Notice>,
}

/// Handle search requests, blank queries get redirected to the listing.
pub async fn handle_search(
    Extension(context): Extension<HttpServiceContext>,
    Extension(role): Extension<Role>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, EmberHttpError> {
    let query = query.q.unwrap_or_default();

    let embers = match search::search(&context.store, role, &query).await? {
        Some(embers) => embers,
        None => return Ok(Redirect::to("/").into_response()),
    };

    Ok(Json(SearchResponse {
        role,
        query: query.trim().to_owned(),
        embers: embers
            .iter()
            .map(|ember| EmberView::for_role(ember, role))
            .collect(),
        notices: session.update(|session| session.take_notices()),
    })
    .into_response())
}

/// Handle requests for the write form.
pub async fn handle_write_form(
    Extension(role): Extension<Role>,
    Extension(session): Extension<SessionHandle>,
) -> impl IntoResponse {
    let (notices, last_passphrase) =
        session.update(|session| (session.take_notices(), session.last_passphrase.clone()));

    Json(json!({
        "role": role,
        "can_backdate": role.is_admin(),
        "content_length": { "min": CONTENT_LENGTH.0, "max": CONTENT_LENGTH.1 },
        "passphrase_length": { "min": PASSPHRASE_LENGTH.0, "max": PASSPHRASE_LENGTH.1 },
        "last_passphrase": last_passphrase,
        "notices": notices,
    }))
}

/// Fields of the write form. Checkboxes are only sent when ticked.
#[derive(Debug, Default, Deserialize)]
pub struct WriteForm {
    #[serde(default)]
    content: String,

    #[serde(default, alias = "aikotoba")]
    passphrase: String,

    is_timeline_public: Option<String>,

    is_passphrase_public: Option<String>,

    allow_external_share: Option<String>,

    allow_external_share_of_passphrase: Option<String>,

    custom_time: Option<String>,
}

fn is_ticked(value: &Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim),
        Some("on") | Some("true") | Some("1") | Some("yes")
    )
}

impl From<WriteForm> for Submission {
    fn from(form: WriteForm) -> Self {
        Submission {
            visibility: Visibility {
                timeline_public: is_ticked(&form.is_timeline_public),
                passphrase_public: is_ticked(&form.is_passphrase_public),
                external_share: is_ticked(&form.allow_external_share),
                external_share_passphrase: is_ticked(&form.allow_external_share_of_passphrase),
            },
            content: form.content,
            passphrase: form.passphrase,
            custom_time: form.custom_time,
            origin: Origin::Human,
        }
    }
}

/// Handle new embers written by visitors.
pub async fn handle_write(
    Extension(context): Extension<HttpServiceContext>,
    Extension(role): Extension<Role>,
    Extension(session): Extension<SessionHandle>,
    ClientAddress(address): ClientAddress,
    user_agent: Option<TypedHeader<UserAgent>>,
    Form(form): Form<WriteForm>,
) -> Result<Redirect, EmberHttpError> {
    let author = Author {
        role,
        identity_token: address.and_then(|address| {
            IdentityToken::from_address(&address, &context.config.ip_salt)
        }),
        client_signature: user_agent.map(|TypedHeader(user_agent)| user_agent.as_str().to_owned()),
    };

    let mut state = session.snapshot();
    let result = context
        .submitter()
        .submit(Submission::from(form), &author, Some(&mut state))
        .await;
    session.update(|session| *session = state);

    let ember = result?;
    session.update(|session| {
        session.push_notice(Notice::success(format!(
            "Ember #{} is burning now.",
            ember.id
        )))
    });

    Ok(Redirect::to("/"))
}

/// Fields of the memo form.
#[derive(Debug, Deserialize)]
pub struct MemoForm {
    #[serde(default)]
    memo: String,
}

/// Handle requests extinguishing an ember.
pub async fn handle_extinguish(
    Extension(context): Extension<HttpServiceContext>,
    Extension(role): Extension<Role>,
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<i64>,
) -> Result<Redirect, ModerationHttpError> {
    let result = moderation::extinguish(&context.store, id, role, context.clock.now()).await;
    finish_moderation(
        result,
        &session,
        format!("Ember #{} was quietly extinguished.", id),
    )
}

/// Handle requests updating the memo of an ember.
pub async fn handle_memo(
    Extension(context): Extension<HttpServiceContext>,
    Extension(role): Extension<Role>,
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<i64>,
    Form(form): Form<MemoForm>,
) -> Result<Redirect, ModerationHttpError> {
    let result =
        moderation::update_memo(&context.store, id, role, &form.memo, context.clock.now()).await;
    finish_moderation(
        result,
        &session,
        format!("Updated the memo of ember #{}.", id),
    )
}

fn finish_moderation(
    result: Result<(), ModerationError>,
    session: &SessionHandle,
    success: String,
) -> Result<Redirect, ModerationHttpError> {
    let notice = match result {
        Ok(()) => Notice::success(success),
        Err(ModerationError::Unauthorized) => Notice::error(NOT_ALLOWED_MESSAGE),
        Err(ModerationError::NotFound(id)) => return Err(ModerationHttpError::NotFound(id)),
        Err(ModerationError::Store(err)) => return Err(ModerationHttpError::Store(err)),
    };

    session.update(|session| session.push_notice(notice));
    Ok(Redirect::to("/"))
}

#[derive(Debug, Deserialize)]
pub struct SleepingQuery {
    reason: Option<String>,
}

/// Handle requests for the page explaining why the fire is out.
pub async fn handle_sleeping(Query(query): Query<SleepingQuery>) -> impl IntoResponse {
    let reason = match query.reason.as_deref() {
        Some("midnight") => ClosedReason::Midnight,
        _ => ClosedReason::Daytime,
    };

    let message = match reason {
        ClosedReason::Midnight => {
            "The fire went out for tonight. Sleep well, it will be lit again in the evening."
        }
        ClosedReason::Daytime => "The fire is not lit yet. Come back in the evening.",
    };

    Json(json!({
        "reason": reason,
        "message": message,
        "opens_at": format!("{:02}:00", OPENING_HOUR),
        "closes_at": format!("{:02}:00", CLOSING_HOUR),
    }))
}

/// Handle requests for the rules of the board.
pub async fn handle_rules() -> impl IntoResponse {
    Json(json!({
        "opens_at": format!("{:02}:00", OPENING_HOUR),
        "closes_at": format!("{:02}:00", CLOSING_HOUR),
        "content_length": { "min": CONTENT_LENGTH.0, "max": CONTENT_LENGTH.1 },
        "passphrase_length": { "min": PASSPHRASE_LENGTH.0, "max": PASSPHRASE_LENGTH.1 },
        "max_embers_per_window": MAX_SUBMISSIONS_PER_WINDOW,
        "window_minutes": WINDOW_MINUTES,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ManualQuery {
    source: Option<String>,
}

/// Handle requests for the manual, which links back to where the visitor came from.
pub async fn handle_manual(Query(query): Query<ManualQuery>) -> impl IntoResponse {
    let (source, back) = match query.source.as_deref() {
        Some("write") => ("write", "/write"),
        _ => ("index", "/"),
    };

    Json(json!({
        "source": source,
        "back": back,
    }))
}

/// Handle requests asking the generator to throw an ember into the fire.
pub async fn handle_ignite(
    Extension(context): Extension<HttpServiceContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, BotHttpError> {
    let provided = headers
        .get(BOT_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    let authorized = match (provided, context.config.bot_secret.as_deref()) {
        (Some(provided), Some(secret)) if !secret.is_empty() => {
            provided.as_bytes().ct_eq(secret.as_bytes()).into()
        }
        _ => false,
    };

    if !authorized {
        warn!("Refused generation request with missing or wrong secret");
        return Err(BotHttpError::Unauthorized);
    }

    let generator = context
        .generator
        .clone()
        .ok_or(BotHttpError::Unavailable)?;

    let generated = generator.generate().await.map_err(|err| {
        warn!("Generator failed: {}", err);
        BotHttpError::Upstream(err)
    })?;

    let submission = Submission {
        content: generated.content,
        passphrase: generated.passphrase,
        visibility: Visibility::default(),
        custom_time: None,
        origin: Origin::Generated,
    };

    let ember = context
        .submitter()
        .submit(submission, &Author::generator(&context.config.ip_salt), None)
        .await
        .map_err(BotHttpError::Rejected)?;

    info!("Generator ignited ember #{}", ember.id);

    Ok(Json(json!({
        "message": "Fire ignited successfully.",
        "id": ember.id,
        "generated": {
            "content": ember.content,
            "passphrase": ember.passphrase,
        },
    })))
}

#[derive(Debug)]
pub enum EmberHttpError {
    Store(SqlStorageError),
    Submit(SubmitError),
}

impl From<SqlStorageError> for EmberHttpError {
    fn from(err: SqlStorageError) -> Self {
        EmberHttpError::Store(err)
    }
}

impl From<SubmitError> for EmberHttpError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Store(err) => EmberHttpError::Store(err),
            err => EmberHttpError::Submit(err),
        }
    }
}

impl IntoResponse for EmberHttpError {
    fn into_response(self) -> Response {
        match self {
            EmberHttpError::Store(err) => {
                error!("Storage failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Something went wrong with the fire." })),
                )
                    .into_response()
            }
            EmberHttpError::Submit(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "message": err.to_string(),
                    "content": err.preserved_content(),
                })),
            )
                .into_response(),
        }
    }
}

#[derive(Debug)]
pub enum ModerationHttpError {
    NotFound(i64),
    Store(SqlStorageError),
}

impl IntoResponse for ModerationHttpError {
    fn into_response(self) -> Response {
        match self {
            ModerationHttpError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": format!("Could not find ember #{}", id) })),
            )
                .into_response(),
            ModerationHttpError::Store(err) => {
                error!("Moderation failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Something went wrong with the fire." })),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug)]
pub enum BotHttpError {
    Unauthorized,
    Unavailable,
    Upstream(GeneratorError),
    Rejected(SubmitError),
}

impl IntoResponse for BotHttpError {
    fn into_response(self) -> Response {
        match self {
            BotHttpError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
            }
            BotHttpError::Unavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "No API Key configured" })),
            )
                .into_response(),
            BotHttpError::Upstream(err) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("Generation failed: {}", err) })),
            )
                .into_response(),
            BotHttpError::Rejected(SubmitError::Store(err)) => {
                error!("Storing generated ember failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Something went wrong with the fire." })),
                )
                    .into_response()
            }
            BotHttpError::Rejected(err) => {
                let error = match &err {
                    SubmitError::Rejected {
                        source: PolicyRejection::Safety(_),
                        ..
                    } => "Unsafe content generated".to_owned(),
                    err => format!("Generated ember was rejected: {}", err),
                };

                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": error,
                        "content": err.preserved_content(),
                    })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use http::StatusCode;
    use rstest::rstest;
    use serde_json::Value;

    use crate::clock::{Clock, FixedClock};
    use crate::context::Context;
    use crate::db::traits::EmberStore;
    use crate::generator::{EmberGenerator, GeneratedEmber, GeneratorError};
    use crate::safety::SafetyPolicy;
    use crate::test_utils::{
        http_test_client, insert_ember, test_context, test_runner, TestClient, TestNode,
    };
    use crate::Configuration;

    fn secrets(config: &Configuration) -> Configuration {
        Configuration {
            admin_key: Some("open-sesame".into()),
            ticket_key: Some("backstage".into()),
            bot_secret: Some("bot-secret".into()),
            ..config.clone()
        }
    }

    fn client_at(node: &TestNode, hour: u32) -> TestClient {
        let config = secrets(&node.context.config);
        http_test_client(&test_context(node.context.store.clone(), config, hour))
    }

    async fn enter(client: &TestClient, query: &str) {
        let response = client.get(&format!("/?{}", query)).send().await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.location().as_deref(), Some("/"));
    }

    #[rstest]
    #[case::daytime(12, "/sleeping?reason=daytime")]
    #[case::midnight(3, "/sleeping?reason=midnight")]
    fn guests_are_turned_away_when_closed(#[case] hour: u32, #[case] location: &'static str) {
        test_runner(move |node: TestNode| async move {
            let client = client_at(&node, hour);

            for path in ["/", "/write", "/search?q=rain"] {
                let response = client.get(path).send().await;
                assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
                assert_eq!(response.location().as_deref(), Some(location));
            }

            let response = client.get(location).send().await;
            assert_eq!(response.status(), StatusCode::OK);
            let body: Value = response.json().await;
            assert_eq!(body["reason"], location.split('=').last().unwrap());
        })
    }

    #[rstest]
    fn ticket_holders_enter_until_they_leave() {
        test_runner(|node: TestNode| async move {
            let client = client_at(&node, 12);

            // Tokens get stripped from the address
            let response = client.get("/search?q=rain&ticket=backstage").send().await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.location().as_deref(), Some("/search?q=rain"));

            let response = client.get("/").send().await;
            assert_eq!(response.status(), StatusCode::OK);
            let body: Value = response.json().await;
            assert_eq!(body["role"], "ticket_holder");

            enter(&client, "guest=1").await;
            let response = client.get("/").send().await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        })
    }

    #[rstest]
    fn wrong_tokens_change_nothing() {
        test_runner(|node: TestNode| async move {
            let client = client_at(&node, 20);

            let response = client.get("/?admin_key=guess").send().await;
            assert_eq!(response.status(), StatusCode::OK);
            let body: Value = response.json().await;
            assert_eq!(body["role"], "guest");
        })
    }

    #[rstest]
    fn guests_see_public_embers_only() {
        test_runner(|node: TestNode| async move {
            let client = client_at(&node, 20);

            let response = client
                .post("/write")
                .form(&[
                    ("content", "A quiet night by the fire"),
                    ("aikotoba", "雨の匂い"),
                    ("is_timeline_public", "on"),
                ])
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.location().as_deref(), Some("/"));

            client
                .post("/write")
                .form(&[("content", "Only for me"), ("passphrase", "secret")])
                .send()
                .await;

            let body: Value = client.get("/").send().await.json().await;
            assert_eq!(body["total"], 1);
            assert_eq!(body["embers"][0]["content"], "A quiet night by the fire");
            assert!(body["embers"][0].get("passphrase").is_none());
            assert!(body["embers"][0].get("moderation").is_none());
            assert_eq!(body["last_passphrase"], "secret");
            assert_eq!(body["notices"].as_array().unwrap().len(), 2);

            // Notices are shown once
            let body: Value = client.get("/").send().await.json().await;
            assert!(body["notices"].as_array().unwrap().is_empty());

            // Searching by tinder finds private embers too
            let body: Value = client.get("/search?q=secret").send().await.json().await;
            assert_eq!(body["embers"][0]["content"], "Only for me");
        })
    }

    #[rstest]
    fn rejected_writes_keep_the_content() {
        test_runner(|node: TestNode| async move {
            let client = client_at(&node, 20);

            let response = client
                .post("/write")
                .form(&[("content", "abc"), ("passphrase", "tinder")])
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

            let body: Value = response.json().await;
            assert_eq!(body["content"], "abc");
            assert!(body["message"].as_str().unwrap().contains("at least 4"));
            assert!(!body.to_string().contains("tinder"));

            let response = client
                .post("/write")
                .form(&[("content", "An official ember"), ("passphrase", "運営より")])
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        })
    }

    #[rstest]
    fn written_content_is_kept_verbatim() {
        test_runner(|node: TestNode| async move {
            let client = client_at(&node, 20);

            for (content, passphrase) in [(" abc", " 小雨 "), ("  indented poem\n  line two  ", "poem")] {
                let response = client
                    .post("/write")
                    .form(&[
                        ("content", content),
                        ("passphrase", passphrase),
                        ("is_timeline_public", "on"),
                    ])
                    .send()
                    .await;
                assert_eq!(response.status(), StatusCode::SEE_OTHER, "{content}");
            }

            let body: Value = client.get("/").send().await.json().await;
            let contents: Vec<&str> = body["embers"]
                .as_array()
                .unwrap()
                .iter()
                .map(|ember| ember["content"].as_str().unwrap())
                .collect();
            assert!(contents.contains(&" abc"));
            assert!(contents.contains(&"  indented poem\n  line two  "));

            // Tinder is a lookup key, surrounding whitespace is dropped
            let body: Value = client.get("/search?q=小雨").send().await.json().await;
            assert_eq!(body["embers"][0]["content"], " abc");

            let response = client
                .post("/write")
                .form(&[("content", "   \n  "), ("passphrase", "tinder")])
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        })
    }

    #[rstest]
    fn writes_are_limited_per_address() {
        test_runner(|node: TestNode| async move {
            let client = client_at(&node, 20);

            for index in 0..5 {
                let response = client
                    .post("/write")
                    .header("x-forwarded-for", "198.51.100.23")
                    .form(&[("content", format!("Ember {}", index)), ("passphrase", "tinder".into())])
                    .send()
                    .await;
                assert_eq!(response.status(), StatusCode::SEE_OTHER);
            }

            let response = client
                .post("/write")
                .header("x-forwarded-for", "198.51.100.23")
                .form(&[("content", "One ember too many"), ("passphrase", "tinder")])
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

            // Another address is not affected
            let response = client
                .post("/write")
                .header("x-forwarded-for", "198.51.100.24")
                .form(&[("content", "A fresh ember"), ("passphrase", "tinder")])
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        })
    }

    #[rstest]
    fn admins_moderate() {
        test_runner(|node: TestNode| async move {
            let ember = insert_ember(&node.context.store, "Something harmful", "tinder").await;
            let client = client_at(&node, 12);
            enter(&client, "admin_key=open-sesame").await;

            let response = client
                .post(&format!("/extinguish/{}", ember.id))
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.location().as_deref(), Some("/"));

            let response = client
                .post(&format!("/memo/{}", ember.id))
                .form(&[("memo", "checked twice")])
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);

            let stored = node.context.store.get_ember(ember.id).await.unwrap().unwrap();
            assert!(stored.is_hidden);
            assert_eq!(stored.admin_memo.as_deref(), Some("checked twice"));

            // Administrators see extinguished embers with all details
            let body: Value = client.get("/").send().await.json().await;
            assert_eq!(body["role"], "admin");
            assert_eq!(body["embers"][0]["moderation"]["is_hidden"], true);
            assert_eq!(body["embers"][0]["passphrase"], "tinder");
            assert_eq!(body["notices"].as_array().unwrap().len(), 2);

            let response = client.post("/extinguish/999").send().await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        })
    }

    #[rstest]
    fn visitors_can_not_moderate() {
        test_runner(|node: TestNode| async move {
            let ember = insert_ember(&node.context.store, "Leave me burning", "tinder").await;
            let client = client_at(&node, 20);

            let response = client
                .post(&format!("/extinguish/{}", ember.id))
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.location().as_deref(), Some("/"));

            let body: Value = client.get("/").send().await.json().await;
            assert_eq!(body["notices"][0]["level"], "error");
            assert_eq!(body["notices"][0]["message"], "This action is not allowed.");

            let stored = node.context.store.get_ember(ember.id).await.unwrap().unwrap();
            assert!(!stored.is_hidden);
        })
    }

    #[rstest]
    fn blank_search_redirects_to_listing() {
        test_runner(|node: TestNode| async move {
            let client = client_at(&node, 20);
            let response = client.get("/search?q=%20%20").send().await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.location().as_deref(), Some("/"));
        })
    }

    #[rstest]
    fn reading_requires_writing_when_configured() {
        test_runner(|node: TestNode| async move {
            let config = Configuration {
                require_post_before_reading: true,
                ..secrets(&node.context.config)
            };
            let context = test_context(node.context.store.clone(), config, 20);
            let client = http_test_client(&context);

            let response = client.get("/").send().await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.location().as_deref(), Some("/write"));

            client
                .post("/write")
                .form(&[("content", "My first ember"), ("passphrase", "tinder")])
                .send()
                .await;

            let response = client.get("/").send().await;
            assert_eq!(response.status(), StatusCode::OK);
        })
    }

    #[rstest]
    #[case::missing(None)]
    #[case::wrong(Some("guess"))]
    fn bot_needs_secret(#[case] secret: Option<&'static str>) {
        test_runner(move |node: TestNode| async move {
            let client = client_at(&node, 12);

            let mut request = client.post("/api/bot/ignite");
            if let Some(secret) = secret {
                request = request.header("X-Bot-Secret", secret);
            }

            let response = request.send().await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        })
    }

    #[rstest]
    fn bot_needs_generator() {
        test_runner(|node: TestNode| async move {
            let client = client_at(&node, 12);
            let response = client
                .post("/api/bot/ignite")
                .header("X-Bot-Secret", "bot-secret")
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        })
    }

    #[derive(Debug)]
    struct FakeGenerator(Result<GeneratedEmber, GeneratorError>);

    #[async_trait]
    impl EmberGenerator for FakeGenerator {
        async fn generate(&self) -> Result<GeneratedEmber, GeneratorError> {
            match &self.0 {
                Ok(ember) => Ok(ember.clone()),
                Err(_) => Err(GeneratorError::Status(503)),
            }
        }
    }

    fn bot_client(node: &TestNode, generated: Result<GeneratedEmber, GeneratorError>) -> TestClient {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at_hour(12));
        let context = Context::new(
            node.context.store.clone(),
            secrets(&node.context.config),
            clock,
            SafetyPolicy::standard().unwrap(),
            Some(Arc::new(FakeGenerator(generated))),
        );
        http_test_client(&context)
    }

    #[rstest]
    fn bot_ignites_outside_opening_hours() {
        test_runner(|node: TestNode| async move {
            let client = bot_client(
                &node,
                Ok(GeneratedEmber {
                    content: "The moon stopped me on the way home.".into(),
                    passphrase: "MeltingIce".into(),
                }),
            );

            let response = client
                .post("/api/bot/ignite")
                .header("X-Bot-Secret", "bot-secret")
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::OK);

            let body: Value = response.json().await;
            assert_eq!(body["message"], "Fire ignited successfully.");
            assert_eq!(body["generated"]["passphrase"], "MeltingIce");

            let id = body["id"].as_i64().unwrap();
            let ember = node.context.store.get_ember(id).await.unwrap().unwrap();
            assert_eq!(
                ember.client_signature.as_deref(),
                Some("Yotakibi AI FireKeeper/1.0")
            );
        })
    }

    #[rstest]
    fn bot_reports_failures() {
        test_runner(|node: TestNode| async move {
            let client = bot_client(&node, Err(GeneratorError::Status(503)));
            let response = client
                .post("/api/bot/ignite")
                .header("X-Bot-Secret", "bot-secret")
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

            let client = bot_client(
                &node,
                Ok(GeneratedEmber {
                    content: "I am falo, keeper of this fire.".into(),
                    passphrase: "keeper".into(),
                }),
            );
            let response = client
                .post("/api/bot/ignite")
                .header("X-Bot-Secret", "bot-secret")
                .send()
                .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);

            let body: Value = response.json().await;
            assert_eq!(body["error"], "Unsafe content generated");
            assert!(node.context.store.get_ember(1).await.unwrap().is_none());
        })
    }
}
