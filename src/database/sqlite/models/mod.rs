#[cfg(test)]
mod tests;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Insurance {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price_per_day: f64,
    pub currency: Currency,
    pub amount_covered: f64,
    pub region: Region,
    pub created_date: NaiveDateTime,
    pub updated_date: Option<NaiveDateTime>,
}

impl Insurance {
    /// Render the plan as the fixed-format text block used both for
    /// embedding candidates and for the retrieval context.
    #[inline]
    pub fn candidate_text(&self) -> String {
        [
            format!("Plan: {}", self.name),
            format!("Region: {}", self.region),
            format!("Medical Coverage: {} {}", self.amount_covered, self.currency),
            format!("Price/Day: {} {}", self.price_per_day, self.currency),
            format!("Details: {}", self.description),
        ]
        .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT")]
pub enum Currency {
    #[serde(rename = "EUR")]
    #[sqlx(rename = "EUR")]
    Eur,
    #[serde(rename = "USD")]
    #[sqlx(rename = "USD")]
    Usd,
}

impl std::fmt::Display for Currency {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Currency::Eur => write!(f, "EUR"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT")]
pub enum Region {
    Europe,
    Worldwide,
    #[serde(rename = "Latin America")]
    #[sqlx(rename = "Latin America")]
    LatinAmerica,
}

impl std::fmt::Display for Region {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Region::Europe => write!(f, "Europe"),
            Region::Worldwide => write!(f, "Worldwide"),
            Region::LatinAmerica => write!(f, "Latin America"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInsurance {
    pub name: String,
    pub description: String,
    pub price_per_day: f64,
    pub currency: Currency,
    pub amount_covered: f64,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_per_day: Option<f64>,
    pub currency: Option<Currency>,
    pub amount_covered: Option<f64>,
    pub region: Option<Region>,
}

impl InsuranceUpdate {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price_per_day.is_none()
            && self.currency.is_none()
            && self.amount_covered.is_none()
            && self.region.is_none()
    }
}

/// Raw settings row. Tone is stored as a JSON array string so ordering of
/// the style descriptors survives the round trip.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SettingsRow {
    pub bot_name: Option<String>,
    pub tone: Option<String>,
    pub company_slogan: Option<String>,
    pub company_name: Option<String>,
    pub company_industry: Option<String>,
    pub temperature: Option<f64>,
}

/// Tenant settings with defaults substituted for any missing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotSettings {
    pub bot_name: String,
    pub tone: Vec<String>,
    pub company_slogan: String,
    pub company_name: String,
    pub company_industry: String,
    pub temperature: f64,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            bot_name: "Raul".to_string(),
            tone: vec!["formal".to_string()],
            company_slogan: "Your Journey, Fully Protected.".to_string(),
            company_name: "TravelAssistance".to_string(),
            company_industry: "Travel Insurance".to_string(),
            temperature: 0.7,
        }
    }
}

impl BotSettings {
    #[inline]
    pub fn from_row(row: Option<SettingsRow>) -> Self {
        let defaults = Self::default();
        let Some(row) = row else {
            return defaults;
        };

        let tone = row
            .tone
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            .filter(|tone| !tone.is_empty())
            .unwrap_or(defaults.tone);

        Self {
            bot_name: row.bot_name.unwrap_or(defaults.bot_name),
            tone,
            company_slogan: row.company_slogan.unwrap_or(defaults.company_slogan),
            company_name: row.company_name.unwrap_or(defaults.company_name),
            company_industry: row.company_industry.unwrap_or(defaults.company_industry),
            temperature: row.temperature.unwrap_or(defaults.temperature),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub bot_name: Option<String>,
    pub tone: Option<Vec<String>>,
    pub company_slogan: Option<String>,
    pub company_name: Option<String>,
    pub company_industry: Option<String>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl std::fmt::Display for TurnRole {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ConversationTurn {
    pub id: i64,
    pub conversation_id: String,
    pub role: TurnRole,
    pub content: String,
    pub created_date: NaiveDateTime,
}
