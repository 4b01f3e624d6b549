//! Read-only HTTP surface: health, reconciliation stats, eligibility lookups,
//! and application tracking.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::domain::{ApplicationId, ProfileId};
use crate::eligibility::EligibilityEngine;
use crate::scheduler::{HealthStatus, ReconciliationScheduler};
use crate::store::{ProfileFilter, RecordStore, StoreError};

#[derive(Clone)]
pub struct PortalState {
    pub store: Arc<dyn RecordStore>,
    pub engine: Arc<EligibilityEngine>,
    pub scheduler: Arc<ReconciliationScheduler>,
}

pub fn portal_router(state: PortalState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/v1/stats", get(stats_handler))
        .route(
            "/api/v1/profiles/:profile_id/eligible-schemes",
            get(eligible_schemes_handler),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler),
        )
        .with_state(state)
}

async fn health_handler(State(state): State<PortalState>) -> Response {
    match state.scheduler.health() {
        HealthStatus::Healthy { counts } => {
            let payload = json!({
                "status": "ok",
                "profiles": counts.profiles,
                "schemes": counts.schemes,
                "applications": counts.applications,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        HealthStatus::Degraded { reason } => {
            let payload = json!({ "status": "degraded", "reason": reason });
            (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
        }
        HealthStatus::Unknown => {
            let payload = json!({ "status": "initializing" });
            (StatusCode::OK, Json(payload)).into_response()
        }
    }
}

async fn stats_handler(State(state): State<PortalState>) -> Response {
    (StatusCode::OK, Json(state.scheduler.stats())).into_response()
}

async fn eligible_schemes_handler(
    State(state): State<PortalState>,
    Path(profile_id): Path<String>,
) -> Response {
    let profile = match state
        .store
        .find_profiles(&ProfileFilter::by_id(ProfileId(profile_id.clone())))
    {
        Ok(profiles) => match profiles.into_iter().next() {
            Some(profile) => profile,
            None => {
                let payload = json!({ "error": "profile not found" });
                return (StatusCode::NOT_FOUND, Json(payload)).into_response();
            }
        },
        Err(err) => return store_error_response(err),
    };

    match state.engine.find_eligible_schemes(&profile) {
        Ok(ranked) => (StatusCode::OK, Json(ranked)).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn application_handler(
    State(state): State<PortalState>,
    Path(application_id): Path<String>,
) -> Response {
    match state.store.application(&ApplicationId(application_id)) {
        Ok(Some(application)) => (StatusCode::OK, Json(application)).into_response(),
        Ok(None) => {
            let payload = json!({ "error": "application not found" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(err) => store_error_response(err),
    }
}

fn store_error_response(err: StoreError) -> Response {
    let status = match err {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
