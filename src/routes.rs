use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::get,
    Json, Router,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    render,
    store::{Experiment, ExperimentStore},
    upstream::Upstream,
    Error, Result,
};

/// State shared by every handler. Created once at startup and dropped when the server stops.
pub struct AppState {
    pub store: ExperimentStore,
    pub upstream: Upstream,
}

impl AppState {
    pub fn new(upstream: Upstream) -> Self {
        Self {
            store: ExperimentStore::new(),
            upstream,
        }
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Serialize, Deserialize, Debug)]
pub struct ExperimentsResponse {
    pub experiments: Vec<Experiment>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreateResponse {
    pub status: String,
    pub experiment: Experiment,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route(
            "/api/experiments",
            get(list_experiments).post(create_experiment),
        )
        .route("/refresh", get(refresh))
        .route("/status", get(status))
        .with_state(state)
}

/// Renders every stored experiment as an HTML table.
pub async fn index(State(state): State<SharedState>) -> Html<String> {
    let experiments = state.store.list().await;
    Html(render::render_page(&experiments, None))
}

/// Returns every stored experiment as `{"experiments": [...]}`.
pub async fn list_experiments(
    State(state): State<SharedState>,
) -> Json<ExperimentsResponse> {
    let experiments = state.store.list().await;
    Json(ExperimentsResponse { experiments })
}

/// Stores the JSON object in the request body as a new experiment.
///
/// The body is parsed here rather than through the [`Json`] extractor so that every malformed
/// body, including an empty one or one without a JSON content type, is answered with a 400.
pub async fn create_experiment(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateResponse>)> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        Error::ValidationError(format!("Request body is not valid JSON: {e}"))
    })?;

    let experiment = state.store.append(value).await?;
    debug!("Stored experiment {:?}", experiment.get("name"));

    Ok((
        StatusCode::CREATED,
        Json(CreateResponse {
            status: "success".to_string(),
            experiment,
        }),
    ))
}

/// Pulls the experiment list from the upstream and renders it.
///
/// The store is only replaced after a successful fetch of a non-empty list. On any failure the
/// current experiments are rendered along with a warning, so a broken upstream never empties the
/// page.
pub async fn refresh(State(state): State<SharedState>) -> Html<String> {
    let url = state.upstream.url();

    let warning = match state.upstream.fetch().await {
        Ok(experiments) => {
            let fetched = experiments.len();
            if state.store.replace(experiments).await {
                info!("Refreshed {fetched} experiments from {url}");
                None
            } else {
                warn!("{url} returned no experiments, keeping the current list");
                Some(format!(
                    "{url} returned no experiments; showing the current list."
                ))
            }
        }
        Err(e) => {
            warn!("Refresh from {url} failed: {e}");
            Some(format!("Unable to refresh experiments: {e}"))
        }
    };

    let experiments = state.store.list().await;
    Html(render::render_page(&experiments, warning.as_deref()))
}

/// A plain-text summary of the store size and where refreshes come from.
pub async fn status(State(state): State<SharedState>) -> String {
    format!(
        "Experiments: {}\nUpstream: {}\n",
        state.store.len().await,
        state.upstream.url()
    )
}
