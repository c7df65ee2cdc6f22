//! Bulk actions offered on the user change list.
//!
//! Each action is a single `UPDATE` over the selected primary keys. Like
//! any batch statement it bypasses the per-row save hook.

use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;
use model::entities::user::{self, UserType};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;

use crate::error::AdminError;
use crate::i18n::gettext;

/// Result of running a bulk action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActionOutcome {
    /// Name the action is registered under
    pub action: String,
    /// Number of rows actually changed
    pub updated: u64,
    /// Confirmation shown to the administrator
    pub message: String,
}

/// Public description of a registered action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActionInfo {
    pub name: String,
    pub description: String,
}

#[async_trait]
pub trait BulkAction: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> Cow<'static, str>;

    async fn run(
        &self,
        db: &DatabaseConnection,
        selection: &[i32],
    ) -> Result<ActionOutcome, AdminError>;
}

/// Mark every unverified agent in the selection as verified.
///
/// Buyers, administrators and already verified agents are skipped.
#[instrument(skip(db))]
pub async fn approve_agents<C>(db: &C, selection: &[i32]) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    if selection.is_empty() {
        debug!("Empty selection, nothing to approve");
        return Ok(0);
    }

    let result = user::Entity::update_many()
        .col_expr(user::Column::IsVerified, Expr::value(true))
        .filter(user::Column::Id.is_in(selection.iter().copied()))
        .filter(user::Column::UserType.eq(UserType::Agent))
        .filter(user::Column::IsVerified.eq(false))
        .exec(db)
        .await?;

    debug!("Approved {} of {} selected users", result.rows_affected, selection.len());
    Ok(result.rows_affected)
}

/// Deactivate every selected user.
///
/// There is no role filter: administrators, including the one running the
/// action, are deactivated too.
#[instrument(skip(db))]
pub async fn deactivate_users<C>(db: &C, selection: &[i32]) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    if selection.is_empty() {
        debug!("Empty selection, nothing to deactivate");
        return Ok(0);
    }

    let result = user::Entity::update_many()
        .col_expr(user::Column::IsActive, Expr::value(false))
        .filter(user::Column::Id.is_in(selection.iter().copied()))
        .exec(db)
        .await?;

    debug!("Deactivated {} of {} selected users", result.rows_affected, selection.len());
    Ok(result.rows_affected)
}

pub struct ApproveAgents;

#[async_trait]
impl BulkAction for ApproveAgents {
    fn name(&self) -> &'static str {
        "approve_agents"
    }

    fn description(&self) -> Cow<'static, str> {
        gettext("Approve selected agents")
    }

    async fn run(
        &self,
        db: &DatabaseConnection,
        selection: &[i32],
    ) -> Result<ActionOutcome, AdminError> {
        let updated = approve_agents(db, selection).await?;
        Ok(ActionOutcome {
            action: self.name().to_string(),
            updated,
            message: format!("{} agents approved successfully.", updated),
        })
    }
}

pub struct DeactivateUsers;

#[async_trait]
impl BulkAction for DeactivateUsers {
    fn name(&self) -> &'static str {
        "deactivate_users"
    }

    fn description(&self) -> Cow<'static, str> {
        gettext("Deactivate selected users")
    }

    async fn run(
        &self,
        db: &DatabaseConnection,
        selection: &[i32],
    ) -> Result<ActionOutcome, AdminError> {
        let updated = deactivate_users(db, selection).await?;
        Ok(ActionOutcome {
            action: self.name().to_string(),
            updated,
            message: format!("{} users deactivated successfully.", updated),
        })
    }
}

/// Ordered set of bulk actions, looked up by name.
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<Box<dyn BulkAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The actions offered on the user change list.
    pub fn user_actions() -> Self {
        Self::new().register(ApproveAgents).register(DeactivateUsers)
    }

    /// Add an action. A later registration under an existing name replaces it.
    pub fn register(mut self, action: impl BulkAction + 'static) -> Self {
        self.actions.retain(|existing| existing.name() != action.name());
        self.actions.push(Box::new(action));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn BulkAction> {
        self.actions
            .iter()
            .find(|action| action.name() == name)
            .map(|action| action.as_ref())
    }

    pub fn describe(&self) -> Vec<ActionInfo> {
        self.actions
            .iter()
            .map(|action| ActionInfo {
                name: action.name().to_string(),
                description: action.description().into_owned(),
            })
            .collect()
    }

    #[instrument(skip(self, db))]
    pub async fn run(
        &self,
        name: &str,
        db: &DatabaseConnection,
        selection: &[i32],
    ) -> Result<ActionOutcome, AdminError> {
        trace!("Looking up action '{}'", name);
        let action = self
            .get(name)
            .ok_or_else(|| AdminError::UnknownAction(name.to_string()))?;

        let outcome = action.run(db, selection).await?;
        info!("{}", outcome.message);
        Ok(outcome)
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.actions.iter().map(|action| action.name()))
            .finish()
    }
}
