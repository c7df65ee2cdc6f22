//! The user change list: filtering, search, ordering and pagination.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use model::entities::user::{self, UserType};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, Iterable, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Select,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use utoipa::{IntoParams, ToSchema};

use crate::error::AdminError;
use crate::i18n::gettext;
use crate::options::UserAdmin;

/// Preset ranges for the `date_joined` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DateJoinedFilter {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "past_7_days")]
    Past7Days,
    #[serde(rename = "this_month")]
    ThisMonth,
    #[serde(rename = "this_year")]
    ThisYear,
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

fn first_of_year(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.ordinal0()))
}

impl DateJoinedFilter {
    /// Half-open `[start, end)` range relative to `now`.
    pub fn bounds(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = now.date_naive();
        let tomorrow = today + Duration::days(1);
        let (start, end) = match self {
            DateJoinedFilter::Today => (today, tomorrow),
            DateJoinedFilter::Past7Days => (today - Duration::days(7), tomorrow),
            DateJoinedFilter::ThisMonth => {
                let start = first_of_month(today);
                (start, first_of_month(start + Duration::days(32)))
            }
            DateJoinedFilter::ThisYear => {
                let start = first_of_year(today);
                (start, first_of_year(start + Duration::days(366)))
            }
        };
        (midnight(start), midnight(end))
    }
}

/// Query string of the change list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChangeListParams {
    /// Filter by role
    pub user_type: Option<UserType>,
    /// Filter by verification status
    pub is_verified: Option<bool>,
    /// Filter by active status
    pub is_active: Option<bool>,
    /// Filter by staff status
    pub is_staff: Option<bool>,
    /// Filter by join date range
    pub date_joined: Option<DateJoinedFilter>,
    /// Search terms, every term must match one of the search fields
    pub q: Option<String>,
    /// Comma separated ordering, `-` prefix for descending (e.g. `-date_joined`)
    pub o: Option<String>,
    /// Page number, starting at 1
    pub p: Option<u64>,
}

/// One page of the change list.
#[derive(Debug, Clone)]
pub struct ChangeList {
    pub results: Vec<user::Model>,
    /// Rows matching the filters, across all pages
    pub count: u64,
    pub page: u64,
    pub num_pages: u64,
    pub per_page: u64,
}

/// Number of users per role, shown next to the role filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleFacet {
    pub user_type: UserType,
    pub label: String,
    pub count: u64,
}

fn ensure_filter(admin: &UserAdmin, field: &str) -> Result<(), AdminError> {
    if admin.list_filter.iter().any(|f| f == field) {
        Ok(())
    } else {
        Err(AdminError::Validation(format!(
            "Filtering on '{}' is not allowed",
            field
        )))
    }
}

fn column(field: &str) -> Result<user::Column, AdminError> {
    user::Column::from_str(field)
        .map_err(|_| AdminError::Validation(format!("Unknown field '{}'", field)))
}

fn sort_columns(admin: &UserAdmin, field: &str) -> Result<Vec<user::Column>, AdminError> {
    let sortable = admin.list_display.iter().any(|f| f == field)
        || admin
            .ordering
            .iter()
            .any(|o| o.trim_start_matches('-') == field);
    if !sortable {
        return Err(AdminError::Validation(format!(
            "Cannot order by '{}'",
            field
        )));
    }
    match field {
        "full_name" => Ok(vec![user::Column::FirstName, user::Column::LastName]),
        other => Ok(vec![column(other)?]),
    }
}

/// Escape `LIKE` wildcards so a search term only matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the filtered and ordered change-list query without running it.
pub fn build_query(
    admin: &UserAdmin,
    params: &ChangeListParams,
    now: DateTime<Utc>,
) -> Result<Select<user::Entity>, AdminError> {
    let mut select = user::Entity::find();

    if let Some(user_type) = params.user_type {
        ensure_filter(admin, "user_type")?;
        select = select.filter(user::Column::UserType.eq(user_type));
    }
    if let Some(is_verified) = params.is_verified {
        ensure_filter(admin, "is_verified")?;
        select = select.filter(user::Column::IsVerified.eq(is_verified));
    }
    if let Some(is_active) = params.is_active {
        ensure_filter(admin, "is_active")?;
        select = select.filter(user::Column::IsActive.eq(is_active));
    }
    if let Some(is_staff) = params.is_staff {
        ensure_filter(admin, "is_staff")?;
        select = select.filter(user::Column::IsStaff.eq(is_staff));
    }
    if let Some(range) = params.date_joined {
        ensure_filter(admin, "date_joined")?;
        let (start, end) = range.bounds(now);
        trace!("date_joined range {} .. {}", start, end);
        select = select
            .filter(user::Column::DateJoined.gte(start))
            .filter(user::Column::DateJoined.lt(end));
    }

    if let Some(q) = params.q.as_deref() {
        let columns = admin
            .search_fields
            .iter()
            .map(|field| column(field))
            .collect::<Result<Vec<_>, _>>()?;
        for term in q.split_whitespace() {
            let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
            let mut any = Condition::any();
            for col in &columns {
                any = any.add(
                    Expr::expr(Func::lower(Expr::col((user::Entity, *col))))
                        .like(LikeExpr::new(pattern.clone()).escape('\\')),
                );
            }
            select = select.filter(any);
        }
    }

    let ordering: Vec<String> = match params.o.as_deref().map(str::trim) {
        Some(o) if !o.is_empty() => o.split(',').map(|key| key.trim().to_string()).collect(),
        _ => admin.ordering.clone(),
    };
    for key in &ordering {
        let (field, order) = match key.strip_prefix('-') {
            Some(field) => (field, Order::Desc),
            None => (key.as_str(), Order::Asc),
        };
        for col in sort_columns(admin, field)? {
            select = select.order_by(col, order.clone());
        }
    }
    // Newest row first among equal sort keys, so pages are stable.
    select = select.order_by_desc(user::Column::Id);

    Ok(select)
}

/// Run the change-list query and fetch the requested page.
///
/// The user table has no foreign keys, so each page is one query plus the
/// count query; no per-row lookups happen.
#[instrument(skip(db, admin))]
pub async fn fetch<C>(
    db: &C,
    admin: &UserAdmin,
    params: &ChangeListParams,
    now: DateTime<Utc>,
) -> Result<ChangeList, AdminError>
where
    C: ConnectionTrait,
{
    let page = params.p.unwrap_or(1);
    if page == 0 {
        return Err(AdminError::Validation("Page numbers start at 1".to_string()));
    }

    let paginator = build_query(admin, params, now)?.paginate(db, admin.list_per_page);
    let totals = paginator.num_items_and_pages().await?;
    // An empty list still has one (empty) page.
    if page > totals.number_of_pages.max(1) {
        return Err(AdminError::Validation(format!(
            "Page {} is out of range (last page is {})",
            page,
            totals.number_of_pages.max(1)
        )));
    }
    let results = paginator.fetch_page(page - 1).await?;

    debug!(
        "Change list page {}/{} with {} rows ({} total)",
        page,
        totals.number_of_pages,
        results.len(),
        totals.number_of_items
    );

    Ok(ChangeList {
        results,
        count: totals.number_of_items,
        page,
        num_pages: totals.number_of_pages,
        per_page: admin.list_per_page,
    })
}

/// Count users per role.
#[instrument(skip(db))]
pub async fn role_facets<C>(db: &C) -> Result<Vec<RoleFacet>, DbErr>
where
    C: ConnectionTrait,
{
    let mut facets = Vec::new();
    for user_type in UserType::iter() {
        let count = user::Entity::find()
            .filter(user::Column::UserType.eq(user_type))
            .count(db)
            .await?;
        facets.push(RoleFacet {
            user_type,
            label: gettext(user_type.label()).into_owned(),
            count,
        });
    }
    Ok(facets)
}
