//! Add and change forms of the user console.
//!
//! Both forms write through `ActiveModel::insert`/`update`, so the save hook
//! of the user entity (admin verification, username case) always runs.

use chrono::{DateTime, Utc};
use model::entities::user::{self, UserType};
use model::password::hash_password;
use model::upload::profile_picture_path;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AdminError;
use crate::options::UserAdmin;

/// Form of the console's "add user" view.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AddUserForm {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1))]
    pub password1: String,
    /// Must repeat `password1`
    #[validate(must_match(other = "password1"))]
    pub password2: String,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(length(max = 15))]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub user_type: UserType,
}

impl AddUserForm {
    #[instrument(skip(self, db), fields(username = %self.username))]
    pub async fn save<C>(self, db: &C) -> Result<user::Model, AdminError>
    where
        C: ConnectionTrait,
    {
        self.validate()?;

        let password = hash_password(&self.password1)?;
        let new_user = user::ActiveModel {
            username: Set(self.username),
            password: Set(password),
            email: Set(self.email.unwrap_or_default()),
            first_name: Set(self.first_name.unwrap_or_default()),
            last_name: Set(self.last_name.unwrap_or_default()),
            phone_number: Set(self.phone_number.unwrap_or_default()),
            user_type: Set(self.user_type),
            ..Default::default()
        };

        let created = new_user.insert(db).await?;
        info!("Created user {} with ID {}", created, created.id);
        Ok(created)
    }
}

/// Form of the console's "change user" view.
///
/// Every field is optional; only the ones present are written. A new raw
/// `password` replaces the stored hash.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ChangeUserForm {
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    #[validate(length(min = 1))]
    pub password: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 15))]
    pub phone_number: Option<String>,
    /// Uploaded file name, stored under the date-partitioned picture
    /// directory. An empty string clears the picture.
    pub profile_picture: Option<String>,
    pub user_type: Option<UserType>,
    pub is_verified: Option<bool>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    #[validate(length(max = 50))]
    pub license_number: Option<String>,
    #[validate(length(max = 100))]
    pub agency_name: Option<String>,
    pub years_experience: Option<u32>,
    pub bio: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    /// Read-only, rejected when present
    pub date_joined: Option<DateTime<Utc>>,
    /// Read-only, rejected when present
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChangeUserForm {
    /// Names of the fields carried by this form.
    pub fn submitted_fields(&self) -> Vec<&'static str> {
        let present = [
            ("username", self.username.is_some()),
            ("password", self.password.is_some()),
            ("first_name", self.first_name.is_some()),
            ("last_name", self.last_name.is_some()),
            ("email", self.email.is_some()),
            ("phone_number", self.phone_number.is_some()),
            ("profile_picture", self.profile_picture.is_some()),
            ("user_type", self.user_type.is_some()),
            ("is_verified", self.is_verified.is_some()),
            ("is_active", self.is_active.is_some()),
            ("is_staff", self.is_staff.is_some()),
            ("is_superuser", self.is_superuser.is_some()),
            ("license_number", self.license_number.is_some()),
            ("agency_name", self.agency_name.is_some()),
            ("years_experience", self.years_experience.is_some()),
            ("bio", self.bio.is_some()),
            ("last_login", self.last_login.is_some()),
            ("date_joined", self.date_joined.is_some()),
            ("updated_at", self.updated_at.is_some()),
        ];
        present
            .into_iter()
            .filter_map(|(name, is_present)| is_present.then_some(name))
            .collect()
    }

    /// Apply the form to user `user_id` and return the saved row.
    #[instrument(skip(self, db, admin))]
    pub async fn apply<C>(
        self,
        db: &C,
        admin: &UserAdmin,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<user::Model, AdminError>
    where
        C: ConnectionTrait,
    {
        if let Some(field) = self
            .submitted_fields()
            .into_iter()
            .find(|field| admin.is_readonly(field))
        {
            return Err(AdminError::ReadOnlyField(field.to_string()));
        }
        let editable = admin.editable_fields();
        if let Some(field) = self
            .submitted_fields()
            .into_iter()
            .find(|field| !editable.contains(field))
        {
            return Err(AdminError::Validation(format!(
                "Field '{}' is not shown on the change view",
                field
            )));
        }
        self.validate()?;

        let existing = user::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or(AdminError::NotFound(user_id))?;

        let mut active = existing.into_active_model();

        if let Some(username) = self.username {
            active.username = Set(username);
        }
        if let Some(raw) = self.password.as_deref() {
            active.password = Set(hash_password(raw)?);
        }
        if let Some(first_name) = self.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = self.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(email) = self.email {
            active.email = Set(email);
        }
        if let Some(phone_number) = self.phone_number {
            active.phone_number = Set(phone_number);
        }
        if let Some(file_name) = self.profile_picture.as_deref() {
            let path = if file_name.is_empty() {
                None
            } else {
                Some(profile_picture_path(file_name, now).ok_or_else(|| {
                    AdminError::Validation(format!("Invalid file name '{}'", file_name))
                })?)
            };
            active.profile_picture = Set(path);
        }
        if let Some(user_type) = self.user_type {
            active.user_type = Set(user_type);
        }
        if let Some(is_verified) = self.is_verified {
            active.is_verified = Set(is_verified);
        }
        if let Some(is_active) = self.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(is_staff) = self.is_staff {
            active.is_staff = Set(is_staff);
        }
        if let Some(is_superuser) = self.is_superuser {
            active.is_superuser = Set(is_superuser);
        }
        if let Some(license_number) = self.license_number {
            active.license_number = Set(license_number);
        }
        if let Some(agency_name) = self.agency_name {
            active.agency_name = Set(agency_name);
        }
        if let Some(years) = self.years_experience {
            let years = i32::try_from(years).map_err(|_| {
                AdminError::Validation(format!("years_experience {} is out of range", years))
            })?;
            active.years_experience = Set(years);
        }
        if let Some(bio) = self.bio {
            active.bio = Set(bio);
        }
        if let Some(last_login) = self.last_login {
            active.last_login = Set(Some(last_login));
        }

        let updated = active.update(db).await?;
        debug!("Saved change form for user {}", updated.id);
        Ok(updated)
    }
}

/// Create an active staff superuser with the administrator role.
#[instrument(skip(db, password))]
pub async fn create_superuser<C>(
    db: &C,
    username: &str,
    email: &str,
    password: &str,
) -> Result<user::Model, AdminError>
where
    C: ConnectionTrait,
{
    if username.trim().is_empty() {
        return Err(AdminError::Validation("Username must not be empty".to_string()));
    }
    if password.is_empty() {
        return Err(AdminError::Validation("Password must not be empty".to_string()));
    }

    let superuser = user::ActiveModel {
        username: Set(username.trim().to_string()),
        password: Set(hash_password(password)?),
        email: Set(email.to_string()),
        user_type: Set(UserType::Admin),
        is_staff: Set(true),
        is_superuser: Set(true),
        is_active: Set(true),
        ..Default::default()
    };

    let created = superuser.insert(db).await?;
    info!("Superuser '{}' created with ID {}", created.username, created.id);
    Ok(created)
}
