use std::sync::{Arc, Mutex};

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use flavors_shared::constants::{VOICE_INGREDIENTS, VOICE_LANGUAGE};
use flavors_shared::error::require;
use flavors_shared::{Coordinates, ValidationError};
use flavors_store::{
    CredentialStore, Database, RecipeId, RecipeInput, RecipeSummary, SubmitOutcome,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, DUPLICATE_RECIPE};
use crate::forms::SubmissionForm;
use crate::geo::{DisabledGeoLocator, GeoLocator, IpGeoLocator};
use crate::media::{guess_content_type, MediaKind};
use crate::session::{bearer_token, CurrentUser, SessionStore};
use crate::transcribe::{DisabledTranscriber, HttpTranscriber, Transcriber};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub credentials: Arc<CredentialStore>,
    pub sessions: SessionStore,
    pub geo: Arc<dyn GeoLocator>,
    pub transcriber: Arc<dyn Transcriber>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Open the stores and wire up the external services named in `config`.
    pub fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let db = Database::open_at(&config.database_path)?;
        let credentials = CredentialStore::open(config.users_file.clone());
        let sessions = SessionStore::new(config.session_ttl);

        let geo: Arc<dyn GeoLocator> =
            match parse_endpoint("GEO_LOOKUP_URL", config.geo_lookup_url.as_deref()) {
                Some(url) => Arc::new(IpGeoLocator::new(url, config.collaborator_timeout)?),
                None => Arc::new(DisabledGeoLocator),
            };
        let transcriber: Arc<dyn Transcriber> =
            match parse_endpoint("TRANSCRIBE_URL", config.transcribe_url.as_deref()) {
                Some(url) => Arc::new(HttpTranscriber::new(url, config.collaborator_timeout)?),
                None => Arc::new(DisabledTranscriber),
            };

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            credentials: Arc::new(credentials),
            sessions,
            geo,
            transcriber,
            config: Arc::new(config),
        })
    }

    /// Run a closure against the recipe database on the blocking pool.
    async fn with_db<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&mut Database) -> flavors_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = db
                .lock()
                .map_err(|e| ServerError::Internal(format!("Lock poisoned: {e}")))?;
            f(&mut *guard).map_err(ServerError::from)
        })
        .await?
    }

    /// Run a closure against the credential file on the blocking pool.
    async fn with_credentials<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&CredentialStore) -> flavors_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || f(credentials.as_ref()).map_err(ServerError::from))
            .await?
    }
}

fn parse_endpoint(setting: &str, value: Option<&str>) -> Option<Url> {
    let value = value?;
    match Url::parse(value) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(setting, value, error = %e, "Invalid service URL, feature disabled");
            None
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(current_session))
        .route("/recipes", post(submit_recipe))
        .route("/recipes/voice", post(submit_voice_recipe))
        .route("/recipes/search", get(search_recipes))
        .route("/recipes/:id", get(get_recipe))
        .route("/recipes/:id/:media", get(get_recipe_media))
        .layer(DefaultBodyLimit::max(state.config.max_upload_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Responses ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    recipes: u64,
    geolocation: bool,
    transcription: bool,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    username: String,
    name: String,
}

#[derive(Serialize)]
struct SessionResponse {
    username: String,
    name: String,
}

#[derive(Serialize)]
struct SubmitResponse {
    id: RecipeId,
    message: &'static str,
    location: Option<Coordinates>,
}

#[derive(Serialize)]
struct SearchResponse {
    count: usize,
    recipes: Vec<RecipeSummary>,
}

// ─── Requests ───

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    #[serde(default)]
    name: String,
    password: String,
    confirm_password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    dish: String,
}

// ─── Handlers ───

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(
    State(state): State<AppState>,
) -> Result<Json<ServerInfoResponse>, ServerError> {
    let recipes = state.with_db(|db| db.count_recipes()).await?;
    Ok(Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        recipes,
        geolocation: state.geo.is_enabled(),
        transcription: state.transcriber.is_enabled(),
    }))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ServerError> {
    let Json(req) = payload?;
    require("username", &req.username)?;
    require("password", &req.password)?;
    if req.password != req.confirm_password {
        return Err(ValidationError::PasswordMismatch.into());
    }

    let username = req.username.trim().to_string();
    let registered = state
        .with_credentials(move |c| c.register(&username, &req.name, &req.password))
        .await?;

    if !registered {
        return Err(ServerError::Conflict("Username already exists.".into()));
    }
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered! Please login.",
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ServerError> {
    let Json(req) = payload?;
    let username = req.username.trim().to_string();

    let lookup = username.clone();
    let name = state
        .with_credentials(move |c| {
            if c.verify(&lookup, &req.password)? {
                c.display_name(&lookup)
            } else {
                Ok(None)
            }
        })
        .await?;

    let Some(name) = name else {
        warn!(username = %username, "login rejected");
        return Err(ServerError::Unauthorized("Invalid username or password.".into()));
    };

    let token = state.sessions.create(&username, &name).await;
    info!(username = %username, "user logged in");
    Ok(Json(LoginResponse {
        token,
        username,
        name,
    }))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<MessageResponse> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token).await;
    }
    Json(MessageResponse {
        message: "Logged out successfully.",
    })
}

async fn current_session(CurrentUser(session): CurrentUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        username: session.username,
        name: session.display_name,
    })
}

/// Text/media submission.
///
/// Order: validate, reject known duplicates, then call out to the
/// transcription and geolocation services, then insert (re-checking the
/// pair inside the write transaction).
async fn submit_recipe(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ServerError> {
    let form = SubmissionForm::from_multipart(multipart?).await?;

    let dish = form.dish.unwrap_or_default();
    let language = form.language.unwrap_or_default();
    require("dish", &dish)?;
    require("language", &language)?;

    let can_transcribe = form.transcribe && form.audio.is_some() && state.transcriber.is_enabled();
    if form.instructions.is_none() && !can_transcribe {
        return Err(ValidationError::MissingField("instructions").into());
    }

    ensure_new(&state, &session.username, &dish).await?;

    let instructions = match (form.instructions, &form.audio) {
        (Some(text), _) => text,
        (None, Some(audio)) => state.transcriber.transcribe(audio).await,
        (None, None) => return Err(ValidationError::MissingField("instructions").into()),
    };

    let mut input = RecipeInput {
        name: session.username,
        festival: form.festival,
        dish,
        language,
        ingredients: form.ingredients,
        instructions,
        image: form.image,
        video: form.video,
        audio: form.audio,
        latitude: form.latitude,
        longitude: form.longitude,
    };
    if form.auto_locate {
        let location = state.geo.lookup_current_location().await;
        input = input.with_location(location);
    }

    store_submission(&state, input).await
}

/// Voice submission: an audio recording with a festival and dish name.
/// The description, if left blank, is taken from the transcript.
async fn submit_voice_recipe(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ServerError> {
    let form = SubmissionForm::from_multipart(multipart?).await?;

    let Some(audio) = form.audio else {
        return Err(ServerError::BadRequest("Please upload an audio file.".into()));
    };
    let festival = form.festival.unwrap_or_default();
    let dish = form.dish.unwrap_or_default();
    require("festival", &festival)?;
    require("dish", &dish)?;
    if form.description.is_none() && !state.transcriber.is_enabled() {
        return Err(ValidationError::MissingField("description").into());
    }

    ensure_new(&state, &session.username, &dish).await?;

    let instructions = match form.description {
        Some(text) => text,
        None => state.transcriber.transcribe(&audio).await,
    };

    let input = RecipeInput {
        name: session.username,
        festival: Some(festival),
        dish,
        language: VOICE_LANGUAGE.to_string(),
        ingredients: Some(VOICE_INGREDIENTS.to_string()),
        instructions,
        audio: Some(audio),
        ..Default::default()
    };

    store_submission(&state, input).await
}

async fn ensure_new(state: &AppState, username: &str, dish: &str) -> Result<(), ServerError> {
    let (name, dish) = (username.to_string(), dish.to_string());
    if state.with_db(move |db| db.exists(&name, &dish)).await? {
        return Err(ServerError::Conflict(DUPLICATE_RECIPE.into()));
    }
    Ok(())
}

async fn store_submission(
    state: &AppState,
    input: RecipeInput,
) -> Result<(StatusCode, Json<SubmitResponse>), ServerError> {
    let location = Coordinates::from_parts(input.latitude, input.longitude);
    match state.with_db(move |db| db.submit_recipe(&input)).await? {
        SubmitOutcome::Created(id) => Ok((
            StatusCode::CREATED,
            Json(SubmitResponse {
                id,
                message: "Recipe submitted successfully!",
                location,
            }),
        )),
        SubmitOutcome::AlreadyExists => Err(ServerError::Conflict(DUPLICATE_RECIPE.into())),
    }
}

async fn search_recipes(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ServerError> {
    let Query(params) = params?;
    let query = params.dish.trim().to_string();
    if query.is_empty() {
        return Err(ServerError::BadRequest("Please enter a dish name.".into()));
    }

    let recipes = state
        .with_db(move |db| db.search_summaries_by_dish(&query))
        .await?;
    Ok(Json(SearchResponse {
        count: recipes.len(),
        recipes,
    }))
}

async fn get_recipe(
    State(state): State<AppState>,
    path: Result<Path<RecipeId>, PathRejection>,
) -> Result<Json<RecipeSummary>, ServerError> {
    let Path(id) = path?;
    let recipe = state.with_db(move |db| db.get_recipe(id)).await?;
    Ok(Json(RecipeSummary::from(&recipe)))
}

async fn get_recipe_media(
    State(state): State<AppState>,
    path: Result<Path<(RecipeId, String)>, PathRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let Path((id, media)) = path?;
    let kind: MediaKind = media
        .parse()
        .map_err(|_| ServerError::NotFound(format!("Unknown media type: {media}")))?;

    let recipe = state.with_db(move |db| db.get_recipe(id)).await?;
    let data = match kind {
        MediaKind::Image => recipe.image,
        MediaKind::Video => recipe.video,
        MediaKind::Audio => recipe.audio,
    }
    .ok_or_else(|| ServerError::NotFound(format!("Recipe {id} has no {kind}")))?;

    let content_type = guess_content_type(&data);
    Ok(([(header::CONTENT_TYPE, content_type)], data))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
