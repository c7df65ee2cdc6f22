use anyhow::Result;
use sea_orm::Database;
use tracing::{debug, error, info};

pub async fn create_superuser(
    database_url: &str,
    username: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    debug!("Database URL: {}", database_url);
    let db = Database::connect(database_url).await?;

    match admin::forms::create_superuser(&db, username, email, password).await {
        Ok(user) => {
            info!("Superuser {} created with ID {}", user, user.id);
            println!("Superuser '{}' created successfully.", user.username);
        }
        Err(e) => {
            error!("Failed to create superuser '{}': {}", username, e);
            return Err(e.into());
        }
    }

    db.close().await?;
    Ok(())
}
