use admin::{ActionRegistry, UserAdmin};
use anyhow::Result;

use crate::cli::ConfigFormat;

/// Render the console configuration of the user model.
pub fn show_admin_config(format: ConfigFormat) -> Result<String> {
    let admin = UserAdmin::with_actions(&ActionRegistry::user_actions());
    let rendered = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&admin)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&admin)?,
    };
    Ok(rendered)
}
