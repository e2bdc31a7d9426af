use super::*;

fn tone() -> Vec<String> {
    vec!["formal".to_string(), "warm".to_string()]
}

#[test]
fn persona_substitutes_all_fields() {
    let persona = bot_persona(
        "Raul",
        &tone(),
        "TravelAssistance",
        "Travel Insurance",
        "Your Journey, Fully Protected.",
    );

    assert!(persona.contains("**Raul**"));
    assert!(persona.contains("formal, warm"));
    assert!(persona.contains("Name: TravelAssistance"));
    assert!(persona.contains("Industry: Travel Insurance"));
    assert!(persona.contains("Slogan: Your Journey, Fully Protected."));
}

#[test]
fn classifier_prompt_carries_three_cases_and_rules() {
    let prompt = classifier_prompt(
        "Raul",
        &tone(),
        "Your Journey, Fully Protected.",
        "Travel Insurance",
        "TravelAssistance",
    );

    assert!(prompt.contains("CASE 1"));
    assert!(prompt.contains("CASE 2"));
    assert!(prompt.contains("CASE 3"));
    assert!(prompt.contains("\"reply\": \"string\""));
    assert!(prompt.contains("\"query\": \"string\""));
    assert!(prompt.contains("destination=Europe; amountCovered=100000; tripType=vacation"));
    assert!(prompt.contains("destinationRegion > amountCovered > tripType"));
    assert!(prompt.contains(BOT_RULES));
}

#[test]
fn welcome_prompt_pins_locale_and_length() {
    let prompt = welcome_prompt(
        "Raul",
        &tone(),
        "Your Journey, Fully Protected.",
        "es",
        DEFAULT_WELCOME_MAX_CHARS,
    );

    assert!(prompt.contains("**es**"));
    assert!(prompt.contains("max 170 characters"));
    assert!(prompt.contains("Respond only in es."));
    assert!(prompt.contains("**Raul**"));
}

#[test]
fn grounded_answer_prompt_constrains_to_context() {
    let persona = bot_persona("Raul", &tone(), "A", "B", "C");
    let prompt = grounded_answer_prompt(&persona, "Plan: Premium\nRegion: Europe");

    assert!(prompt.contains("Use ONLY the provided context"));
    assert!(prompt.contains("Plan: Premium"));
    assert!(prompt.starts_with(&persona));
}
