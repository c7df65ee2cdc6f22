use model::entities::user::UserType;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::actions::{ActionInfo, ActionRegistry};
use crate::i18n::gettext;

/// A titled group of fields on the add or change view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Fieldset {
    /// Section title, `None` for the untitled leading section
    pub name: Option<String>,
    pub fields: Vec<String>,
    /// Presentation hints such as `collapse` or `wide`
    pub classes: Vec<String>,
}

impl Fieldset {
    fn new(name: Option<&'static str>, fields: &[&str], classes: &[&str]) -> Self {
        Self {
            name: name.map(|n| gettext(n).into_owned()),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// A selectable value for a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// Declarative description of the user console: which columns the change
/// list shows, how it filters, searches and orders, how the add and change
/// views are laid out, and which bulk actions are offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserAdmin {
    pub list_display: Vec<String>,
    pub list_filter: Vec<String>,
    pub search_fields: Vec<String>,
    /// Default ordering; a leading `-` means descending
    pub ordering: Vec<String>,
    pub fieldsets: Vec<Fieldset>,
    pub add_fieldsets: Vec<Fieldset>,
    pub readonly_fields: Vec<String>,
    pub list_per_page: u64,
    pub user_type_choices: Vec<Choice>,
    pub actions: Vec<ActionInfo>,
}

impl UserAdmin {
    /// Console configuration for the user table with the default actions.
    pub fn default_config() -> Self {
        Self::with_actions(&ActionRegistry::user_actions())
    }

    pub fn with_actions(registry: &ActionRegistry) -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            list_display: strings(&[
                "username",
                "email",
                "full_name",
                "user_type",
                "is_verified",
                "is_active",
                "date_joined",
            ]),
            list_filter: strings(&["user_type", "is_verified", "is_active", "is_staff", "date_joined"]),
            search_fields: strings(&[
                "username",
                "email",
                "first_name",
                "last_name",
                "phone_number",
                "agency_name",
            ]),
            ordering: strings(&["-date_joined"]),
            fieldsets: vec![
                Fieldset::new(None, &["username", "password"], &[]),
                Fieldset::new(
                    Some("Personal info"),
                    &["first_name", "last_name", "email", "phone_number", "profile_picture"],
                    &[],
                ),
                Fieldset::new(
                    Some("Role and Status"),
                    &["user_type", "is_verified", "is_active", "is_staff", "is_superuser"],
                    &[],
                ),
                Fieldset::new(
                    Some("Agent Information"),
                    &["license_number", "agency_name", "years_experience", "bio"],
                    &["collapse"],
                ),
                Fieldset::new(
                    Some("Important dates"),
                    &["last_login", "date_joined", "updated_at"],
                    &[],
                ),
            ],
            add_fieldsets: vec![Fieldset::new(
                None,
                &[
                    "username",
                    "email",
                    "password1",
                    "password2",
                    "first_name",
                    "last_name",
                    "phone_number",
                    "user_type",
                ],
                &["wide"],
            )],
            readonly_fields: strings(&["date_joined", "updated_at"]),
            list_per_page: 100,
            user_type_choices: UserType::iter()
                .map(|t| Choice {
                    value: t.as_str().to_string(),
                    label: gettext(t.label()).into_owned(),
                })
                .collect(),
            actions: registry.describe(),
        }
    }

    pub fn is_readonly(&self, field: &str) -> bool {
        self.readonly_fields.iter().any(|f| f == field)
    }

    /// Fields editable on the change view, in fieldset order.
    pub fn editable_fields(&self) -> Vec<&str> {
        self.fieldsets
            .iter()
            .flat_map(|set| set.fields.iter())
            .map(String::as_str)
            .filter(|field| !self.is_readonly(field))
            .collect()
    }
}
