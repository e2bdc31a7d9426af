use super::*;
use chrono::Utc;

fn sample_insurance() -> Insurance {
    Insurance {
        id: "abc123".to_string(),
        name: "Premium".to_string(),
        description: "Full medical and sports coverage".to_string(),
        price_per_day: 4.5,
        currency: Currency::Eur,
        amount_covered: 100000.0,
        region: Region::Europe,
        created_date: Utc::now().naive_utc(),
        updated_date: None,
    }
}

#[test]
fn candidate_text_renders_fixed_block() {
    let text = sample_insurance().candidate_text();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "Plan: Premium");
    assert_eq!(lines[1], "Region: Europe");
    assert_eq!(lines[2], "Medical Coverage: 100000 EUR");
    assert_eq!(lines[3], "Price/Day: 4.5 EUR");
    assert_eq!(lines[4], "Details: Full medical and sports coverage");
}

#[test]
fn region_serde_uses_wire_names() {
    assert_eq!(
        serde_json::to_string(&Region::LatinAmerica).expect("serializes"),
        "\"Latin America\""
    );
    assert_eq!(
        serde_json::from_str::<Region>("\"Worldwide\"").expect("parses"),
        Region::Worldwide
    );
    assert_eq!(
        serde_json::to_string(&Currency::Usd).expect("serializes"),
        "\"USD\""
    );
    assert!(serde_json::from_str::<Currency>("\"GBP\"").is_err());
}

#[test]
fn settings_defaults_substituted_per_field() {
    let resolved = BotSettings::from_row(Some(SettingsRow {
        bot_name: Some("Iris".to_string()),
        tone: None,
        company_slogan: None,
        company_name: Some("Globetrotter".to_string()),
        company_industry: None,
        temperature: Some(0.2),
    }));

    assert_eq!(resolved.bot_name, "Iris");
    assert_eq!(resolved.tone, vec!["formal".to_string()]);
    assert_eq!(resolved.company_slogan, "Your Journey, Fully Protected.");
    assert_eq!(resolved.company_name, "Globetrotter");
    assert_eq!(resolved.company_industry, "Travel Insurance");
    assert_eq!(resolved.temperature, 0.2);
}

#[test]
fn settings_missing_row_yields_defaults() {
    assert_eq!(BotSettings::from_row(None), BotSettings::default());
}

#[test]
fn settings_tone_order_preserved() {
    let resolved = BotSettings::from_row(Some(SettingsRow {
        bot_name: None,
        tone: Some("[\"warm\",\"playful\",\"direct\"]".to_string()),
        company_slogan: None,
        company_name: None,
        company_industry: None,
        temperature: None,
    }));

    assert_eq!(resolved.tone, vec!["warm", "playful", "direct"]);
}

#[test]
fn insurance_update_emptiness() {
    assert!(InsuranceUpdate::default().is_empty());

    let update = InsuranceUpdate {
        price_per_day: Some(9.0),
        ..Default::default()
    };
    assert!(!update.is_empty());
}
