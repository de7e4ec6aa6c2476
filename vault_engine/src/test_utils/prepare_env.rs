use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    db_types::NewSavingsPlan,
    AccountManagement,
    AuthApi,
    CredentialStore,
    NewUserRequest,
    SqliteDatabase,
};

/// Creates a fresh, migrated database at `url`, replacing anything already there.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
    db
}

pub fn random_db_path() -> String {
    format!("sqlite://../data/test_vault_{}.db", rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("Error dropping database {url}: {e:?}");
        }
    }
    if let Some(dir) = url.strip_prefix("sqlite://").and_then(|p| std::path::Path::new(p).parent()) {
        let _ = std::fs::create_dir_all(dir);
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

/// Registers a verified user and returns their id.
pub async fn seed_user(db: &SqliteDatabase, email: &str, password: &str) -> i64 {
    let api = AuthApi::new(db.clone());
    let request = NewUserRequest {
        first_name: "Test".into(),
        last_name: "User".into(),
        email: email.into(),
        password: password.into(),
    };
    let id = api.register_user(request).await.expect("Error registering test user");
    db.mark_email_verified(id).await.expect("Error verifying test user");
    id
}

pub async fn seed_family_plan(db: &SqliteDatabase, creator_id: i64, name: &str) -> i64 {
    let plan = NewSavingsPlan { name: name.into(), ..Default::default() };
    db.create_family_vault_plan(creator_id, plan).await.expect("Error creating family vault plan")
}

pub async fn seed_target_plan(db: &SqliteDatabase, user_id: i64, name: &str, goal: i64) -> i64 {
    let plan = NewSavingsPlan { name: name.into(), goal: Some(goal.into()), ..Default::default() };
    db.create_target_savings_plan(user_id, plan).await.expect("Error creating target savings plan")
}
