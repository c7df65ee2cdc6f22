use anyhow::Result;
use tracing::{debug, info, trace};

use super::initdb::connect_and_migrate;
use super::serve::serve;
use crate::config::Settings;

pub async fn migrate_and_serve(database_url: &str, bind_address: &str, settings: &Settings) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");

    let db = connect_and_migrate(database_url).await?;
    db.close().await?;
    debug!("Migration connection closed");

    serve(database_url, bind_address, settings).await
}
