use crate::helpers::responses::{HandlerError, database_error, error_response};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::user::{self, UserType};
use model::password::hash_password;
use model::upload::profile_picture_path;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for registering a new user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    /// Username (must be unique, stored lower-cased)
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    /// Raw password, stored hashed
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(length(max = 15))]
    pub phone_number: Option<String>,
    /// Buyer or agent; defaults to buyer
    pub user_type: Option<UserType>,
    #[validate(length(max = 50))]
    pub license_number: Option<String>,
    #[validate(length(max = 100))]
    pub agency_name: Option<String>,
    pub years_experience: Option<u32>,
    pub bio: Option<String>,
}

/// Request body for a user editing their own profile
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    /// Username (must be unique, stored lower-cased)
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(length(max = 15))]
    pub phone_number: Option<String>,
    /// Uploaded picture file name; empty string removes the picture
    pub profile_picture: Option<String>,
    #[validate(length(max = 50))]
    pub license_number: Option<String>,
    #[validate(length(max = 100))]
    pub agency_name: Option<String>,
    pub years_experience: Option<u32>,
    pub bio: Option<String>,
}

/// User response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub user_type: UserType,
    pub is_verified: bool,
    pub is_approved_agent: bool,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub phone_number: String,
    pub license_number: String,
    pub agency_name: String,
    pub years_experience: i32,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            full_name: model.full_name(),
            is_approved_agent: model.is_approved_agent(),
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            user_type: model.user_type,
            is_verified: model.is_verified,
            is_active: model.is_active,
            is_staff: model.is_staff,
            is_superuser: model.is_superuser,
            phone_number: model.phone_number,
            license_number: model.license_number,
            agency_name: model.agency_name,
            years_experience: model.years_experience,
            bio: model.bio,
            profile_picture: model.profile_picture,
            last_login: model.last_login,
            date_joined: model.date_joined,
            updated_at: model.updated_at,
        }
    }
}

fn years_experience(years: u32) -> Result<i32, HandlerError> {
    i32::try_from(years).map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_YEARS_EXPERIENCE",
            format!("years_experience {} is out of range", years),
        )
    })
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn create_user(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateUserRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), HandlerError> {
    trace!("Entering create_user function");

    let user_type = request.user_type.unwrap_or_default();
    if user_type == UserType::Admin {
        warn!("Rejected self-registration as administrator");
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "ROLE_NOT_ALLOWED",
            "Administrators can only be created from the admin console",
        ));
    }

    let password = hash_password(&request.password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "PASSWORD_ERROR",
            "Failed to store password",
        )
    })?;

    let new_user = user::ActiveModel {
        username: Set(request.username.clone()),
        password: Set(password),
        email: Set(request.email.unwrap_or_default()),
        first_name: Set(request.first_name.unwrap_or_default()),
        last_name: Set(request.last_name.unwrap_or_default()),
        phone_number: Set(request.phone_number.unwrap_or_default()),
        user_type: Set(user_type),
        license_number: Set(request.license_number.unwrap_or_default()),
        agency_name: Set(request.agency_name.unwrap_or_default()),
        years_experience: Set(years_experience(request.years_experience.unwrap_or(0))?),
        bio: Set(request.bio.unwrap_or_default()),
        ..Default::default()
    };

    trace!("Attempting to insert new user into database");
    let user_model = new_user.insert(&state.db).await.map_err(|e| {
        error!("Failed to create user '{}': {}", request.username, e);
        database_error(&e)
    })?;
    state.cache.invalidate_all();

    info!("User created successfully with ID: {}, username: {}", user_model.id, user_model.username);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UserResponse::from(user_model), "User created successfully")),
    ))
}

/// Get all users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, HandlerError> {
    debug!("Fetching all users from database");

    let users = user::Entity::find()
        .order_by_desc(user::Column::DateJoined)
        .all(&state.db)
        .await
        .map_err(|e| database_error(&e))?;

    info!("Successfully retrieved {} users", users.len());
    Ok(Json(ApiResponse::ok(
        users.into_iter().map(UserResponse::from).collect(),
        "Users retrieved successfully",
    )))
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UserResponse>>, HandlerError> {
    debug!("Fetching user with ID: {}", user_id);

    match user::Entity::find_by_id(user_id).one(&state.db).await {
        Ok(Some(user_model)) => {
            info!("Successfully retrieved user {}", user_model);
            Ok(Json(ApiResponse::ok(
                UserResponse::from(user_model),
                "User retrieved successfully",
            )))
        }
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

/// Update the profile of a user
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateUserRequest>>,
) -> Result<Json<ApiResponse<UserResponse>>, HandlerError> {
    trace!("Looking up existing user with ID: {}", user_id);
    let existing_user = match user::Entity::find_by_id(user_id).one(&state.db).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("User with ID {} not found for update", user_id);
            return Err(error_response(
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                format!("User with ID {} not found", user_id),
            ));
        }
        Err(db_error) => {
            error!("Failed to lookup user with ID {} for update: {}", user_id, db_error);
            return Err(database_error(&db_error));
        }
    };

    let mut user_active = existing_user.into_active_model();
    let mut updated_fields = Vec::new();

    if let Some(username) = request.username {
        user_active.username = Set(username);
        updated_fields.push("username");
    }
    if let Some(email) = request.email {
        user_active.email = Set(email);
        updated_fields.push("email");
    }
    if let Some(first_name) = request.first_name {
        user_active.first_name = Set(first_name);
        updated_fields.push("first_name");
    }
    if let Some(last_name) = request.last_name {
        user_active.last_name = Set(last_name);
        updated_fields.push("last_name");
    }
    if let Some(phone_number) = request.phone_number {
        user_active.phone_number = Set(phone_number);
        updated_fields.push("phone_number");
    }
    if let Some(file_name) = request.profile_picture {
        let path = if file_name.is_empty() {
            None
        } else {
            let path = profile_picture_path(&file_name, Utc::now()).ok_or_else(|| {
                error_response(
                    StatusCode::BAD_REQUEST,
                    "INVALID_FILE_NAME",
                    format!("Invalid file name '{}'", file_name),
                )
            })?;
            Some(path)
        };
        user_active.profile_picture = Set(path);
        updated_fields.push("profile_picture");
    }
    if let Some(license_number) = request.license_number {
        user_active.license_number = Set(license_number);
        updated_fields.push("license_number");
    }
    if let Some(agency_name) = request.agency_name {
        user_active.agency_name = Set(agency_name);
        updated_fields.push("agency_name");
    }
    if let Some(years) = request.years_experience {
        user_active.years_experience = Set(years_experience(years)?);
        updated_fields.push("years_experience");
    }
    if let Some(bio) = request.bio {
        user_active.bio = Set(bio);
        updated_fields.push("bio");
    }

    if updated_fields.is_empty() {
        debug!("No fields to update for user ID: {}", user_id);
    } else {
        debug!("Updating fields: {}", updated_fields.join(", "));
    }

    let updated_user = user_active.update(&state.db).await.map_err(|e| {
        error!("Failed to update user with ID {}: {}", user_id, e);
        database_error(&e)
    })?;
    state.cache.invalidate_all();

    info!("User with ID {} updated successfully", user_id);
    Ok(Json(ApiResponse::ok(
        UserResponse::from(updated_user),
        "User updated successfully",
    )))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, HandlerError> {
    debug!("Attempting to delete user with ID: {}", user_id);

    let delete_result = user::Entity::delete_by_id(user_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error(&e))?;

    if delete_result.rows_affected == 0 {
        warn!("User with ID {} not found for deletion (no rows affected)", user_id);
        return Err(error_response(
            StatusCode::NOT_FOUND,
            "USER_NOT_FOUND",
            format!("User with ID {} not found", user_id),
        ));
    }
    state.cache.invalidate_all();

    info!("User with ID {} deleted successfully", user_id);
    Ok(Json(ApiResponse::ok(
        format!("User {} deleted", user_id),
        "User deleted successfully",
    )))
}
