// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! HTTP surface: JSON API and the server-rendered board

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::db::Database;
use crate::idea::{parse_tags, toggle_tag, Category, Idea, Submission, EXAMPLE_TAGS};
use crate::service::IdeaService;
use crate::validation::MISSING_REQUIRED;
use crate::{IdeaBoardError, Result};

const BOARD_TEMPLATE: &str = "board.html";
const CARD_TAG_LIMIT: usize = 3;

/// Shared application state
pub struct AppState {
    pub service: IdeaService,
    pub config: AppConfig,
    templates: Environment<'static>,
}

impl AppState {
    pub fn new(service: IdeaService, config: AppConfig) -> Result<Self> {
        let mut templates = Environment::new();
        templates.add_template(BOARD_TEMPLATE, include_str!("templates/board.html"))?;
        Ok(Self {
            service,
            config,
            templates,
        })
    }
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        // Pages
        .route("/", get(board_page))
        .route("/submit", post(submit_form))
        // API endpoints
        .route("/api/ideas", get(api_list_ideas).post(api_create_idea))
        .route("/api/moderate", post(api_moderate))
        .route("/api/tags", get(api_tags))
        .route("/api/categories", get(api_categories))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Key used to throttle a client
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Error body for API failures; internal details stay in the logs
fn api_error(err: IdeaBoardError, context: &'static str) -> Response {
    match err {
        IdeaBoardError::Validation(errors) => {
            let message = if errors.len() == 1 && errors[0] == MISSING_REQUIRED {
                MISSING_REQUIRED
            } else {
                "Please fix the following issues"
            };
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message, "errors": errors })),
            )
                .into_response()
        }
        IdeaBoardError::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": IdeaBoardError::RateLimited.to_string() })),
        )
            .into_response(),
        IdeaBoardError::ContentRejected { warning } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "Content rejected", "warning": warning })),
        )
            .into_response(),
        other => {
            error!("{}: {}", context, other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": context })),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize, Default)]
struct TagQuery {
    tags: Option<String>,
}

impl TagQuery {
    fn selected(&self) -> Vec<String> {
        self.tags.as_deref().map(parse_tags).unwrap_or_default()
    }
}

// === API Handlers ===

async fn api_list_ideas(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TagQuery>,
) -> Response {
    match state.service.list(&query.selected()) {
        Ok(ideas) => Json(ideas).into_response(),
        Err(e) => api_error(e, "Failed to fetch ideas"),
    }
}

async fn api_create_idea(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<Submission>, JsonRejection>,
) -> Response {
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid request body", "detail": rejection.body_text() })),
            )
                .into_response();
        }
    };

    let client = client_key(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        state.config.web.trust_forwarded_for,
    );

    match state.service.submit(&client, submission).await {
        Ok(idea) => (StatusCode::CREATED, Json(idea)).into_response(),
        Err(e) => api_error(e, "Failed to create idea"),
    }
}

async fn api_moderate(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    let content = payload
        .ok()
        .and_then(|Json(body)| body.get("content").and_then(Value::as_str).map(String::from))
        .filter(|content| !content.is_empty());

    match content {
        Some(content) => Json(state.service.moderate(&content).await).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Content is required" })),
        )
            .into_response(),
    }
}

async fn api_tags(State(state): State<Arc<AppState>>) -> Response {
    match state.service.tags() {
        Ok(tags) => Json(tags).into_response(),
        Err(e) => api_error(e, "Failed to fetch tags"),
    }
}

async fn api_categories() -> Json<Value> {
    Json(json!({
        "categories": Category::names(),
        "exampleTags": EXAMPLE_TAGS,
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// === Page Handlers ===

#[derive(Deserialize, Default)]
struct BoardQuery {
    tags: Option<String>,
    submitted: Option<String>,
}

/// Submission form fields, echoed back when a submission fails
#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(default)]
struct SubmissionForm {
    title: String,
    description: String,
    category: String,
    tags: String,
    author_name: String,
}

impl SubmissionForm {
    fn to_submission(&self) -> Submission {
        Submission {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            tags: parse_tags(&self.tags),
            author_name: Some(self.author_name.clone()),
        }
    }
}

#[derive(Serialize)]
struct TagChip {
    name: String,
    selected: bool,
    /// Filter value after clicking this chip
    toggle: String,
}

#[derive(Serialize)]
struct IdeaCard {
    title: String,
    description: String,
    category: String,
    date: String,
    tags: Vec<String>,
    more_tags: usize,
    author: String,
}

impl From<&Idea> for IdeaCard {
    fn from(idea: &Idea) -> Self {
        Self {
            title: idea.title.clone(),
            description: idea.description.clone(),
            category: idea.category.clone(),
            date: idea.created_at.format("%Y-%m-%d").to_string(),
            tags: idea.tags.iter().take(CARD_TAG_LIMIT).cloned().collect(),
            more_tags: idea.tags.len().saturating_sub(CARD_TAG_LIMIT),
            author: idea
                .author_name
                .clone()
                .unwrap_or_else(|| "Anonymous".to_string()),
        }
    }
}

#[derive(Default)]
struct BoardFeedback {
    notice: Option<&'static str>,
    errors: Vec<String>,
    warning: Option<String>,
}

fn render_board(
    state: &AppState,
    selected: &[String],
    form: &SubmissionForm,
    feedback: BoardFeedback,
) -> Result<String> {
    let visible = state.service.list(&[])?;
    let total = visible.len();

    let chips: Vec<TagChip> = crate::idea::all_tags(&visible)
        .into_iter()
        .map(|name| TagChip {
            selected: selected.contains(&name),
            toggle: toggle_tag(selected, &name).join(","),
            name,
        })
        .collect();

    let shown: Vec<IdeaCard> = crate::idea::filter_by_tags(visible, selected)
        .iter()
        .map(IdeaCard::from)
        .collect();

    let template = state.templates.get_template(BOARD_TEMPLATE)?;
    let html = template.render(minijinja::context! {
        notice => feedback.notice,
        errors => feedback.errors,
        warning => feedback.warning,
        form => form,
        categories => Category::names(),
        example_tags => EXAMPLE_TAGS,
        tags => chips,
        selected => selected,
        shown => shown.len(),
        total => total,
        ideas => shown,
    })?;
    Ok(html)
}

fn page(status: StatusCode, rendered: Result<String>) -> Response {
    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to render board: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

async fn board_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BoardQuery>,
) -> Response {
    let selected = query.tags.as_deref().map(parse_tags).unwrap_or_default();
    let feedback = BoardFeedback {
        notice: query
            .submitted
            .is_some()
            .then_some("Idea submitted! It is now on the board."),
        ..BoardFeedback::default()
    };
    page(
        StatusCode::OK,
        render_board(&state, &selected, &SubmissionForm::default(), feedback),
    )
}

async fn submit_form(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Form(form): Form<SubmissionForm>,
) -> Response {
    let client = client_key(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        state.config.web.trust_forwarded_for,
    );

    let (status, feedback) = match state.service.submit(&client, form.to_submission()).await {
        Ok(_) => return Redirect::to("/?submitted=1").into_response(),
        Err(IdeaBoardError::Validation(errors)) => (
            StatusCode::BAD_REQUEST,
            BoardFeedback { errors, ..BoardFeedback::default() },
        ),
        Err(IdeaBoardError::RateLimited) => (
            StatusCode::TOO_MANY_REQUESTS,
            BoardFeedback {
                errors: vec![IdeaBoardError::RateLimited.to_string()],
                ..BoardFeedback::default()
            },
        ),
        Err(IdeaBoardError::ContentRejected { warning }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            BoardFeedback { warning: Some(warning), ..BoardFeedback::default() },
        ),
        Err(e) => {
            error!("Failed to create idea: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                BoardFeedback {
                    warning: Some("Submission failed. Please try again later.".to_string()),
                    ..BoardFeedback::default()
                },
            )
        }
    };

    page(status, render_board(&state, &[], &form, feedback))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}

/// Start the web server with config and database
pub async fn start_server(config: AppConfig, db: Database) -> Result<()> {
    let service = IdeaService::from_config(&config, db)?;
    let state = Arc::new(AppState::new(service, config.clone())?);

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Idea board available at http://{}", addr);

    let router = create_router(state);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| IdeaBoardError::Config(format!("Server error: {}", e)))?;

    info!("Idea board stopped.");
    Ok(())
}
