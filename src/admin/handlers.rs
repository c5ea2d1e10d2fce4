use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::target::{ResolvedTarget, TargetError};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub target: ResolvedTarget,
}

/// Form fields of `POST /admin/config`.
#[derive(Debug, Deserialize)]
pub struct ConfigUpdateForm {
    pub action: Option<String>,
    pub new_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminResponse {
    pub status: String,
    pub message: String,
}

impl AdminResponse {
    fn success(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                status: "success".to_string(),
                message: message.into(),
            }),
        )
    }

    fn error(code: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            code,
            Json(Self {
                status: "error".to_string(),
                message: message.into(),
            }),
        )
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let inner = state.inner.load_full();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        target: inner.engine.resolver().resolve_detailed().await,
    })
}

pub async fn update_config(
    State(state): State<AppState>,
    form: Result<Form<ConfigUpdateForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            metrics::record_target_update("rejected");
            let code = match rejection.status() {
                StatusCode::UNSUPPORTED_MEDIA_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                _ => StatusCode::BAD_REQUEST,
            };
            return AdminResponse::error(code, rejection.body_text()).into_response();
        }
    };

    if form.action.as_deref() != Some("update_url") {
        metrics::record_target_update("rejected");
        return AdminResponse::error(StatusCode::BAD_REQUEST, "Unknown or missing action")
            .into_response();
    }

    let Some(new_url) = form.new_url else {
        metrics::record_target_update("rejected");
        return AdminResponse::error(StatusCode::BAD_REQUEST, "No URL provided").into_response();
    };

    let inner = state.inner.load_full();
    match inner.engine.resolver().update(&new_url).await {
        Ok(record) => {
            metrics::record_target_update("success");
            tracing::info!(url = %record.url, "Target URL updated via admin API");
            AdminResponse::success("URL updated successfully").into_response()
        }
        Err(e @ (TargetError::InvalidConfig(_) | TargetError::ReadOnly)) => {
            metrics::record_target_update("rejected");
            tracing::warn!(error = %e, "Target URL update rejected");
            AdminResponse::error(StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            metrics::record_target_update("failed");
            tracing::error!(error = %e, "Target URL update failed");
            AdminResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to persist URL")
                .into_response()
        }
    }
}
