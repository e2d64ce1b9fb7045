use std::sync::Arc;

use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use crate::app::dto::{self, Body};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    principal: Option<Extension<PrincipalContext>>,
    Body(body): Body<dto::RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = principal.as_ref().map(|Extension(p)| p);
    let user = services.register_user(actor, body)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::LoginRequest>,
) -> Result<Json<dto::LoginResponse>, ApiError> {
    Ok(Json(services.login(body)?))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    let user = services.user(&principal.user_id())?;
    let permissions: Vec<String> = principal
        .principal()
        .permissions
        .iter()
        .map(|p| p.as_str().to_string())
        .collect();
    Ok(Json(serde_json::json!({
        "user": user,
        "permissions": permissions,
    })))
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<dto::ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    services.change_password(&principal, body)?;
    Ok(StatusCode::NO_CONTENT)
}
