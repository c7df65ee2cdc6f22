use std::sync::Arc;

use admin::changelist::{ChangeListParams, DateJoinedFilter, RoleFacet};
use admin::forms::{AddUserForm, ChangeUserForm};
use admin::options::{Choice, Fieldset};
use admin::{ActionInfo, ActionOutcome, ActionRegistry, UserAdmin};
use model::entities::user::UserType;
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::handlers::admin::{ActionRequest, ChangeListResponse, ChangeViewResponse, UserRow};
use crate::handlers::users::{CreateUserRequest, UpdateUserRequest, UserResponse};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache for list-view aggregates, cleared on every user write
    pub cache: Cache<String, CachedData>,
    /// Declarative console configuration
    pub admin: Arc<UserAdmin>,
    /// Bulk actions offered on the change list
    pub actions: Arc<ActionRegistry>,
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    RoleFacets(Vec<RoleFacet>),
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

impl ErrorResponse {
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
            success: false,
        }
    }
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::create_user,
        crate::handlers::users::get_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::admin::get_admin_config,
        crate::handlers::admin::get_change_list,
        crate::handlers::admin::add_user,
        crate::handlers::admin::get_change_view,
        crate::handlers::admin::change_user,
        crate::handlers::admin::list_actions,
        crate::handlers::admin::run_action,
    ),
    components(
        schemas(
            ApiResponse<UserResponse>,
            ApiResponse<Vec<UserResponse>>,
            ApiResponse<ChangeListResponse>,
            ApiResponse<ChangeViewResponse>,
            ApiResponse<ActionOutcome>,
            ApiResponse<UserAdmin>,
            ErrorResponse,
            HealthResponse,
            UserType,
            UserResponse,
            CreateUserRequest,
            UpdateUserRequest,
            UserAdmin,
            Fieldset,
            Choice,
            ActionInfo,
            ActionOutcome,
            ActionRequest,
            AddUserForm,
            ChangeUserForm,
            ChangeListParams,
            DateJoinedFilter,
            ChangeListResponse,
            ChangeViewResponse,
            UserRow,
            RoleFacet,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "User registration and profile endpoints"),
        (name = "admin", description = "Administrative console for user records"),
    ),
    info(
        title = "HousePark Users API",
        description = "HousePark real-estate listing accounts - buyers, agents and administrators",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
