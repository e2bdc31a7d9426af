
use super::models::*;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

pub struct InsuranceQueries;

impl InsuranceQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_insurance: NewInsurance) -> Result<Insurance> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            "INSERT INTO insurances \
             (id, name, description, price_per_day, currency, amount_covered, region, created_date) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new_insurance.name)
        .bind(&new_insurance.description)
        .bind(new_insurance.price_per_day)
        .bind(new_insurance.currency)
        .bind(new_insurance.amount_covered)
        .bind(new_insurance.region)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create insurance")?;

        Self::get_by_id(pool, &id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created insurance"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Insurance>> {
        let result = sqlx::query_as::<_, Insurance>(
            "SELECT id, name, description, price_per_day, currency, amount_covered, region, \
             created_date, updated_date \
             FROM insurances WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get insurance by id")?;

        Ok(result)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Insurance>> {
        let result = sqlx::query_as::<_, Insurance>(
            "SELECT id, name, description, price_per_day, currency, amount_covered, region, \
             created_date, updated_date \
             FROM insurances ORDER BY created_date, id",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list insurances")?;

        Ok(result)
    }

    /// Applies an update and returns the new row, or `None` when the id is
    /// unknown. Last write wins; no cross-request ordering is guaranteed.
    #[inline]
    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        update: InsuranceUpdate,
    ) -> Result<Option<Insurance>> {
        let Some(existing) = Self::get_by_id(pool, id).await? else {
            return Ok(None);
        };

        let name = update.name.unwrap_or(existing.name);
        let description = update.description.unwrap_or(existing.description);
        let price_per_day = update.price_per_day.unwrap_or(existing.price_per_day);
        let currency = update.currency.unwrap_or(existing.currency);
        let amount_covered = update.amount_covered.unwrap_or(existing.amount_covered);
        let region = update.region.unwrap_or(existing.region);
        let now = Utc::now().naive_utc();

        sqlx::query(
            "UPDATE insurances \
             SET name = ?, description = ?, price_per_day = ?, currency = ?, \
                 amount_covered = ?, region = ?, updated_date = ? \
             WHERE id = ?",
        )
        .bind(&name)
        .bind(&description)
        .bind(price_per_day)
        .bind(currency)
        .bind(amount_covered)
        .bind(region)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update insurance")?;

        Self::get_by_id(pool, id).await
    }

    #[inline]
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM insurances WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete insurance")?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct SettingsQueries;

impl SettingsQueries {
    #[inline]
    pub async fn get(pool: &SqlitePool) -> Result<Option<SettingsRow>> {
        let result = sqlx::query_as::<_, SettingsRow>(
            "SELECT bot_name, tone, company_slogan, company_name, company_industry, temperature \
             FROM settings WHERE id = 1",
        )
        .fetch_optional(pool)
        .await
        .context("Failed to get settings")?;

        Ok(result)
    }

    /// Resolved settings with defaults substituted. A store failure here
    /// also degrades to defaults so the chat path keeps answering.
    #[inline]
    pub async fn get_with_defaults(pool: &SqlitePool) -> BotSettings {
        match Self::get(pool).await {
            Ok(row) => BotSettings::from_row(row),
            Err(e) => {
                warn!("Failed to read settings, using defaults: {}", e);
                BotSettings::default()
            }
        }
    }

    #[inline]
    pub async fn upsert(pool: &SqlitePool, update: SettingsUpdate) -> Result<BotSettings> {
        let existing = Self::get(pool).await?;

        let current = BotSettings::from_row(existing);
        let tone = update.tone.unwrap_or(current.tone);
        let tone_json =
            serde_json::to_string(&tone).context("Failed to serialize tone list")?;
        let bot_name = update.bot_name.unwrap_or(current.bot_name);
        let company_slogan = update.company_slogan.unwrap_or(current.company_slogan);
        let company_name = update.company_name.unwrap_or(current.company_name);
        let company_industry = update.company_industry.unwrap_or(current.company_industry);
        let temperature = update.temperature.unwrap_or(current.temperature);

        sqlx::query(
            "INSERT INTO settings \
             (id, bot_name, tone, company_slogan, company_name, company_industry, temperature) \
             VALUES (1, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET \
                 bot_name = excluded.bot_name, \
                 tone = excluded.tone, \
                 company_slogan = excluded.company_slogan, \
                 company_name = excluded.company_name, \
                 company_industry = excluded.company_industry, \
                 temperature = excluded.temperature",
        )
        .bind(&bot_name)
        .bind(&tone_json)
        .bind(&company_slogan)
        .bind(&company_name)
        .bind(&company_industry)
        .bind(temperature)
        .execute(pool)
        .await
        .context("Failed to upsert settings")?;

        Ok(BotSettings {
            bot_name,
            tone,
            company_slogan,
            company_name,
            company_industry,
            temperature,
        })
    }
}

pub struct ConversationQueries;

impl ConversationQueries {
    #[inline]
    pub async fn append(
        pool: &SqlitePool,
        conversation_id: &str,
        role: TurnRole,
        content: &str,
    ) -> Result<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            "INSERT INTO conversation_turns (conversation_id, role, content, created_date) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(role)
        .bind(content)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to append conversation turn")?;

        Ok(())
    }

    #[inline]
    pub async fn list_for_conversation(
        pool: &SqlitePool,
        conversation_id: &str,
    ) -> Result<Vec<ConversationTurn>> {
        let result = sqlx::query_as::<_, ConversationTurn>(
            "SELECT id, conversation_id, role, content, created_date \
             FROM conversation_turns WHERE conversation_id = ? ORDER BY id",
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await
        .context("Failed to list conversation turns")?;

        Ok(result)
    }
}
