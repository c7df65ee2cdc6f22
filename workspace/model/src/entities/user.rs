use std::fmt;

use sea_orm::ActiveValue;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role of a user in the listing application.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    #[sea_orm(string_value = "buyer")]
    Buyer,
    #[sea_orm(string_value = "agent")]
    Agent,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl UserType {
    /// Stored value, as written to the `user_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            UserType::Buyer => "buyer",
            UserType::Agent => "agent",
            UserType::Admin => "admin",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            UserType::Buyer => "Property Buyer",
            UserType::Agent => "Real Estate Agent",
            UserType::Admin => "Administrator",
        }
    }
}

/// Represents an account of the HousePark listing application.
///
/// Buyers browse listings, agents publish them once an administrator has
/// verified their license, and administrators run the console. The
/// credential part of the record is exposed through
/// [`crate::account::BaseAccount`].
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Always stored lower-cased.
    #[sea_orm(unique)]
    pub username: String,
    /// PHC hash string produced by [`crate::password::hash_password`].
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub last_login: Option<DateTimeUtc>,
    pub is_superuser: bool,
    pub is_staff: bool,
    /// Designates whether the user may log in.
    pub is_active: bool,
    /// Stamped on insert, never rewritten.
    pub date_joined: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub user_type: UserType,
    pub phone_number: String,
    /// For agents this means administrator approval.
    pub is_verified: bool,
    // Agent profile. Kept blank for other roles but never checked against the role.
    pub license_number: String,
    pub agency_name: String,
    pub years_experience: i32,
    #[sea_orm(column_type = "Text")]
    pub bio: String,
    /// Storage path under `profile_pics/YYYY/MM/DD/`.
    pub profile_picture: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Model {
    /// First and last name joined by a space, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_buyer(&self) -> bool {
        self.user_type == UserType::Buyer
    }

    pub fn is_agent(&self) -> bool {
        self.user_type == UserType::Agent
    }

    pub fn is_administrator(&self) -> bool {
        self.user_type == UserType::Admin
    }

    /// An agent whose credentials have been approved by an administrator.
    pub fn is_approved_agent(&self) -> bool {
        self.is_agent() && self.is_verified
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.user_type.label())
    }
}

fn default_if_unset<V>(field: &mut ActiveValue<V>, value: V)
where
    V: Into<Value>,
{
    if matches!(field, ActiveValue::NotSet) {
        *field = ActiveValue::Set(value);
    }
}

fn current<V>(field: &ActiveValue<V>) -> Option<&V>
where
    V: Into<Value>,
{
    match field {
        ActiveValue::Set(value) | ActiveValue::Unchanged(value) => Some(value),
        ActiveValue::NotSet => None,
    }
}

impl ActiveModel {
    fn fill_defaults(&mut self) {
        default_if_unset(&mut self.password, String::new());
        default_if_unset(&mut self.email, String::new());
        default_if_unset(&mut self.first_name, String::new());
        default_if_unset(&mut self.last_name, String::new());
        default_if_unset(&mut self.last_login, None);
        default_if_unset(&mut self.is_superuser, false);
        default_if_unset(&mut self.is_staff, false);
        default_if_unset(&mut self.is_active, true);
        default_if_unset(&mut self.user_type, UserType::default());
        default_if_unset(&mut self.phone_number, String::new());
        default_if_unset(&mut self.is_verified, false);
        default_if_unset(&mut self.license_number, String::new());
        default_if_unset(&mut self.agency_name, String::new());
        default_if_unset(&mut self.years_experience, 0);
        default_if_unset(&mut self.bio, String::new());
        default_if_unset(&mut self.profile_picture, None);
    }

    /// Role the row will have once written. Falls back to the stored row
    /// when an update leaves `user_type` untouched.
    async fn effective_user_type<C>(&self, db: &C) -> Result<Option<UserType>, DbErr>
    where
        C: ConnectionTrait,
    {
        if let Some(user_type) = current(&self.user_type) {
            return Ok(Some(*user_type));
        }
        match current(&self.id) {
            Some(id) => Ok(Entity::find_by_id(*id)
                .one(db)
                .await?
                .map(|stored| stored.user_type)),
            None => Ok(None),
        }
    }

    fn normalize_username(&mut self) {
        let lowered = match current(&self.username) {
            Some(name) if !name.is_empty() => {
                let lowered = name.to_lowercase();
                (lowered != *name).then_some(lowered)
            }
            _ => None,
        };
        if let Some(lowered) = lowered {
            self.username = ActiveValue::Set(lowered);
        }
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();

        if insert {
            self.fill_defaults();
            self.date_joined = ActiveValue::Set(now);
        } else if self.date_joined.is_set() {
            tracing::debug!("Ignoring change to date_joined on update");
            self.date_joined = ActiveValue::NotSet;
        }

        if self.effective_user_type(db).await? == Some(UserType::Admin) {
            self.is_verified = ActiveValue::Set(true);
        }

        self.normalize_username();
        self.updated_at = ActiveValue::Set(now);

        Ok(self)
    }
}
