use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};


pub mod models;
pub mod queries;

pub use models::*;
pub use queries::{ConversationQueries, InsuranceQueries, SettingsQueries};

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    pub async fn initialize_from_config_dir(config_dir: &Path) -> Result<Self> {
        let db_path = config_dir.join("tripsure.db");

        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Self::new(&db_path).await
    }

    // Insurance plan operations
    pub async fn create_insurance(&self, new_insurance: NewInsurance) -> Result<Insurance> {
        InsuranceQueries::create(&self.pool, new_insurance).await
    }

    pub async fn get_insurance(&self, id: &str) -> Result<Option<Insurance>> {
        InsuranceQueries::get_by_id(&self.pool, id).await
    }

    pub async fn list_insurances(&self) -> Result<Vec<Insurance>> {
        InsuranceQueries::list_all(&self.pool).await
    }

    pub async fn update_insurance(
        &self,
        id: &str,
        update: InsuranceUpdate,
    ) -> Result<Option<Insurance>> {
        InsuranceQueries::update(&self.pool, id, update).await
    }

    pub async fn delete_insurance(&self, id: &str) -> Result<bool> {
        InsuranceQueries::delete(&self.pool, id).await
    }

    // Settings operations
    pub async fn settings_with_defaults(&self) -> BotSettings {
        SettingsQueries::get_with_defaults(&self.pool).await
    }

    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<BotSettings> {
        SettingsQueries::upsert(&self.pool, update).await
    }

    // Conversation mirror operations
    pub async fn append_turn(
        &self,
        conversation_id: &str,
        role: TurnRole,
        content: &str,
    ) -> Result<()> {
        ConversationQueries::append(&self.pool, conversation_id, role, content).await
    }

    pub async fn list_turns(&self, conversation_id: &str) -> Result<Vec<ConversationTurn>> {
        ConversationQueries::list_for_conversation(&self.pool, conversation_id).await
    }
}
