use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::artifact::{render_block, DEFAULT_MARKER};
use crate::http::server::AppState;
use crate::masking::{InternalLayout, MaskSnapshot, PathConfig, RawPaths, ReplacementEntry};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub generation: u64,
    pub masking_enabled: bool,
    pub table_entries: usize,
    pub route_rules: usize,
    pub artifact: Option<String>,
}

#[derive(Serialize)]
pub struct PathsView {
    pub generation: u64,
    pub paths: PathConfig,
    pub layout: InternalLayout,
}

impl PathsView {
    fn of(snapshot: &MaskSnapshot) -> Self {
        Self {
            generation: snapshot.generation(),
            paths: snapshot.paths().clone(),
            layout: snapshot.layout().clone(),
        }
    }
}

#[derive(Serialize)]
pub struct RouteView {
    pub name: String,
    pub origin: &'static str,
    pub rule: String,
}

#[derive(Serialize)]
pub struct RulesView {
    pub marker: String,
    /// `None` when no role is masked.
    pub block: Option<String>,
    pub table: Vec<ReplacementEntry>,
    pub routes: Vec<RouteView>,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub errors: Vec<String>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let snapshot = state.control.snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        generation: snapshot.generation(),
        masking_enabled: state.runtime().masking_enabled,
        table_entries: snapshot.table().entries().len(),
        route_rules: snapshot.routes().rules().len(),
        artifact: state
            .control
            .artifact()
            .map(|a| a.path().display().to_string()),
    })
}

pub async fn get_paths(State(state): State<AppState>) -> Json<PathsView> {
    Json(PathsView::of(&state.control.snapshot()))
}

/// Save raw segments. Collisions are rejected with 422 and nothing changes.
pub async fn put_paths(
    State(state): State<AppState>,
    Json(raw): Json<RawPaths>,
) -> Result<Json<PathsView>, (StatusCode, Json<ErrorBody>)> {
    match state.control.save_paths(&raw) {
        Ok(snapshot) => Ok(Json(PathsView::of(&snapshot))),
        Err(errors) => {
            tracing::warn!(?errors, "Rejected path mask save");
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody {
                    errors: errors.iter().map(|e| e.to_string()).collect(),
                }),
            ))
        }
    }
}

pub async fn get_rules(State(state): State<AppState>) -> Json<RulesView> {
    let snapshot = state.control.snapshot();
    let marker = state
        .control
        .artifact()
        .map(|a| a.marker().to_string())
        .unwrap_or_else(|| DEFAULT_MARKER.to_string());

    Json(RulesView {
        block: render_block(snapshot.paths(), snapshot.layout(), &marker),
        marker,
        table: snapshot.table().entries().to_vec(),
        routes: snapshot
            .routes()
            .rules()
            .iter()
            .map(|rule| RouteView {
                name: rule.name.clone(),
                origin: rule.origin.label(),
                rule: rule.describe(),
            })
            .collect(),
    })
}
