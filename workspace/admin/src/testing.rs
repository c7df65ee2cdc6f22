use migration::{Migrator, MigratorTrait};
use model::entities::user::{self, UserType};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

/// Create an in-memory SQLite database with the schema applied
pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub async fn seed_user(
    db: &DatabaseConnection,
    username: &str,
    user_type: UserType,
    is_verified: bool,
) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        user_type: Set(user_type),
        is_verified: Set(is_verified),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed user")
}
