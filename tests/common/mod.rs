use sea_orm::{Database, DatabaseConnection};
use migration::MigratorTrait;
use std::env;

/// Connect to the test database named by TEST_DATABASE_URL and run
/// migrations. Returns None (and logs a skip) when the variable is unset, so
/// the suite passes on machines without a database.
pub async fn setup_test_db() -> Option<DatabaseConnection> {
    dotenvy::dotenv().ok();
    let url = match env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set - skipping database-backed test");
            return None;
        }
    };

    let db = Database::connect(&url)
        .await
        .expect("Failed to connect to test database");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations on test database");
    Some(db)
}
