use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    routing::{get, patch, post},
};

use invenhub_auth::{Permission, UserId};
use invenhub_infra::projections::UserReadModel;

use super::parse_id;
use crate::app::dto::{self, Body, Items};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(super::auth::register))
        .route("/:id/role", patch(change_role))
        .route("/:id/deactivate", post(deactivate_user))
        .route("/:id/activate", post(activate_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<Items<UserReadModel>>, ApiError> {
    authz::require(&principal, &Permission::USERS_MANAGE)?;
    Ok(Json(services.users().into()))
}

pub async fn change_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<dto::ChangeRoleRequest>,
) -> Result<Json<UserReadModel>, ApiError> {
    authz::require(&principal, &Permission::USERS_MANAGE)?;
    let user_id: UserId = parse_id(&id)?;
    Ok(Json(services.change_role(&principal, user_id, body.role)?))
}

pub async fn deactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<UserReadModel>, ApiError> {
    authz::require(&principal, &Permission::USERS_MANAGE)?;
    let user_id: UserId = parse_id(&id)?;
    Ok(Json(services.deactivate_user(&principal, user_id)?))
}

pub async fn activate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<UserReadModel>, ApiError> {
    authz::require(&principal, &Permission::USERS_MANAGE)?;
    let user_id: UserId = parse_id(&id)?;
    Ok(Json(services.activate_user(user_id)?))
}
