use mongodb::{bson::doc, Client, Database};
use tracing::{info, warn};

use crate::errors::Result;

pub async fn get_db_client(database_url: &str, db_name: &str) -> Result<Database> {
    let client = Client::with_uri_str(database_url).await?;
    let db = client.database(db_name);

    match db.run_command(doc! { "ping": 1 }).await {
        Ok(_) => info!("Connected to database: {}", db_name),
        Err(e) => warn!("Database '{}' is not answering yet: {}", db_name, e),
    }

    Ok(db)
}

pub async fn ping(db: &Database) -> bool {
    db.run_command(doc! { "ping": 1 }).await.is_ok()
}
