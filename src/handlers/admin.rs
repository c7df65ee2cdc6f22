use crate::helpers::responses::{HandlerError, admin_error, database_error, error_response};
use crate::schemas::{ApiResponse, AppState, CachedData, ErrorResponse};
use admin::changelist::{self, ChangeListParams, RoleFacet};
use admin::forms::{AddUserForm, ChangeUserForm};
use admin::options::Fieldset;
use admin::{ActionInfo, ActionOutcome, UserAdmin};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::account::BaseAccount;
use model::entities::user::{self, UserType};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::ToSchema;

use super::users::UserResponse;

const ROLE_FACETS_KEY: &str = "role_facets";

/// Selection submitted with a bulk action
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ActionRequest {
    /// IDs of the selected users
    pub ids: Vec<i32>,
}

/// One row of the change list, holding the `list_display` columns
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub user_type: UserType,
    pub is_verified: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<user::Model> for UserRow {
    fn from(model: user::Model) -> Self {
        Self {
            full_name: model.full_name(),
            id: model.id,
            username: model.username,
            email: model.email,
            user_type: model.user_type,
            is_verified: model.is_verified,
            is_active: model.is_active,
            date_joined: model.date_joined,
        }
    }
}

/// A page of the change list with the per-role counts shown beside it
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangeListResponse {
    pub results: Vec<UserRow>,
    /// Number of users matching the filters
    pub count: u64,
    pub page: u64,
    pub num_pages: u64,
    pub per_page: u64,
    pub facets: Vec<RoleFacet>,
}

/// Detail view of one user, laid out by the console fieldsets
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangeViewResponse {
    pub user: UserResponse,
    pub has_usable_password: bool,
    pub fieldsets: Vec<Fieldset>,
    pub readonly_fields: Vec<String>,
}

async fn cached_role_facets(state: &AppState) -> Result<Vec<RoleFacet>, HandlerError> {
    if let Some(CachedData::RoleFacets(facets)) = state.cache.get(ROLE_FACETS_KEY).await {
        debug!("Role facets served from cache");
        return Ok(facets);
    }

    let facets = changelist::role_facets(&state.db)
        .await
        .map_err(|e| database_error(&e))?;
    state
        .cache
        .insert(ROLE_FACETS_KEY.to_string(), CachedData::RoleFacets(facets.clone()))
        .await;
    Ok(facets)
}

fn change_view(state: &AppState, user_model: user::Model) -> ChangeViewResponse {
    ChangeViewResponse {
        has_usable_password: user_model.has_usable_password(),
        user: UserResponse::from(user_model),
        fieldsets: state.admin.fieldsets.clone(),
        readonly_fields: state.admin.readonly_fields.clone(),
    }
}

/// Get the console configuration of the user model
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/config",
    tag = "admin",
    responses(
        (status = 200, description = "Console configuration retrieved successfully", body = ApiResponse<UserAdmin>)
    )
)]
#[instrument(skip(state))]
pub async fn get_admin_config(State(state): State<AppState>) -> Json<ApiResponse<UserAdmin>> {
    trace!("Serving user console configuration");
    Json(ApiResponse::ok(
        state.admin.as_ref().clone(),
        "Console configuration retrieved successfully",
    ))
}

/// List users with the console filters, search, ordering and pagination
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "admin",
    params(ChangeListParams),
    responses(
        (status = 200, description = "Change list retrieved successfully", body = ApiResponse<ChangeListResponse>),
        (status = 400, description = "Invalid filter, ordering or page", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_change_list(
    State(state): State<AppState>,
    Query(params): Query<ChangeListParams>,
) -> Result<Json<ApiResponse<ChangeListResponse>>, HandlerError> {
    debug!("Building change list");

    let page = changelist::fetch(&state.db, &state.admin, &params, Utc::now())
        .await
        .map_err(|e| {
            warn!("Change list request rejected: {}", e);
            admin_error(e)
        })?;
    let facets = cached_role_facets(&state).await?;

    info!("Change list page {} of {} ({} users)", page.page, page.num_pages, page.count);
    Ok(Json(ApiResponse::ok(
        ChangeListResponse {
            results: page.results.into_iter().map(UserRow::from).collect(),
            count: page.count,
            page: page.page,
            num_pages: page.num_pages,
            per_page: page.per_page,
            facets,
        },
        "Change list retrieved successfully",
    )))
}

/// Create a user from the console add form
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    tag = "admin",
    request_body = AddUserForm,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<ChangeViewResponse>),
        (status = 400, description = "Invalid form", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn add_user(
    State(state): State<AppState>,
    Json(form): Json<AddUserForm>,
) -> Result<(StatusCode, Json<ApiResponse<ChangeViewResponse>>), HandlerError> {
    trace!("Saving console add form");

    let created = form.save(&state.db).await.map_err(admin_error)?;
    state.cache.invalidate_all();

    info!("Console created user {} with ID {}", created, created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(change_view(&state, created), "User created successfully")),
    ))
}

/// Get the change view of a user
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{user_id}",
    tag = "admin",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<ChangeViewResponse>),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_change_view(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ChangeViewResponse>>, HandlerError> {
    debug!("Fetching change view for user ID: {}", user_id);

    match user::Entity::find_by_id(user_id).one(&state.db).await {
        Ok(Some(user_model)) => Ok(Json(ApiResponse::ok(
            change_view(&state, user_model),
            "User retrieved successfully",
        ))),
        Ok(None) => {
            warn!("User with ID {} not found", user_id);
            Err(error_response(
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                format!("User with ID {} not found", user_id),
            ))
        }
        Err(db_error) => {
            error!("Failed to retrieve user with ID {}: {}", user_id, db_error);
            Err(database_error(&db_error))
        }
    }
}

/// Save the change form of a user
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{user_id}",
    tag = "admin",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    request_body = ChangeUserForm,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<ChangeViewResponse>),
        (status = 400, description = "Invalid form or read-only field submitted", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, form))]
pub async fn change_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Json(form): Json<ChangeUserForm>,
) -> Result<Json<ApiResponse<ChangeViewResponse>>, HandlerError> {
    debug!("Saving change form fields: {}", form.submitted_fields().join(", "));

    let updated = form
        .apply(&state.db, &state.admin, user_id, Utc::now())
        .await
        .map_err(|e| {
            warn!("Change form for user {} rejected: {}", user_id, e);
            admin_error(e)
        })?;
    state.cache.invalidate_all();

    info!("User with ID {} updated from console", user_id);
    Ok(Json(ApiResponse::ok(
        change_view(&state, updated),
        "User updated successfully",
    )))
}

/// List the bulk actions offered on the change list
#[utoipa::path(
    get,
    path = "/api/v1/admin/actions",
    tag = "admin",
    responses(
        (status = 200, description = "Actions retrieved successfully", body = ApiResponse<Vec<ActionInfo>>)
    )
)]
#[instrument(skip(state))]
pub async fn list_actions(State(state): State<AppState>) -> Json<ApiResponse<Vec<ActionInfo>>> {
    Json(ApiResponse::ok(
        state.actions.describe(),
        "Actions retrieved successfully",
    ))
}

/// Run a bulk action over the selected users
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/actions/{action}",
    tag = "admin",
    params(
        ("action" = String, Path, description = "Action name, e.g. approve_agents"),
    ),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Action completed", body = ApiResponse<ActionOutcome>),
        (status = 404, description = "Unknown action", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(selected = request.ids.len()))]
pub async fn run_action(
    Path(action): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ApiResponse<ActionOutcome>>, HandlerError> {
    trace!("Running bulk action '{}'", action);

    let outcome = state
        .actions
        .run(&action, &state.db, &request.ids)
        .await
        .map_err(|e| {
            warn!("Bulk action '{}' failed: {}", action, e);
            admin_error(e)
        })?;
    if outcome.updated > 0 {
        state.cache.invalidate_all();
    }

    let message = outcome.message.clone();
    Ok(Json(ApiResponse::ok(outcome, message)))
}
