//! crates/bedtijd_core/src/i18n.rs
//!
//! Static translation lookup for the Dutch/English UI strings. This is a
//! pure function over a fixed catalog: no state, no I/O. Missing keys fall
//! back to the key itself; a missing translation falls back to Dutch.

use crate::domain::Language;

/// The translation catalog: (key, nl, en).
const CATALOG: &[(&str, &str, &str)] = &[
    ("login.title", "Inloggen", "Login"),
    ("login.email", "E-mailadres", "Email address"),
    ("login.sendMagicLink", "Stuur magic link", "Send magic link"),
    ("login.orSignup", "of registreer je", "or sign up"),
    ("login.signupButton", "Registreer", "Sign up"),
    ("signup.title", "Registreer", "Sign up"),
    ("signup.email", "E-mailadres", "Email address"),
    ("signup.password", "Wachtwoord", "Password"),
    ("signup.submit", "Maak account", "Create account"),
    (
        "signup.loginInstead",
        "Heb je al een account? Inloggen",
        "Already have an account? Log in",
    ),
    ("home.welcome", "Welkom!", "Welcome!"),
    (
        "home.loginPrompt",
        "Log in om aan de slag te gaan.",
        "Log in to get started.",
    ),
    ("home.goToLogin", "Ga naar inloggen", "Go to login"),
    ("home.title", "Slaap zacht, praatjeskracht", "Sleep tight, chat power"),
    (
        "home.progress",
        "{count} / {total} vragen voltooid",
        "{count} / {total} questions completed",
    ),
    ("home.settings", "Instellingen", "Settings"),
    ("home.admin", "Admin", "Admin"),
    ("home.questions", "Vragen", "Questions"),
    ("home.disclaimer", "Disclaimer", "Disclaimer"),
    ("home.about", "Over ons", "About"),
    ("settings.title", "Instellingen", "Settings"),
    ("settings.bedtime", "Bedtijd (HH:MM)", "Bedtime (HH:MM)"),
    ("settings.notifyBedtime", "Herinnering bij bedtijd", "Bedtime reminder"),
    (
        "settings.notifyNew",
        "Melding bij nieuwe vragen",
        "Notification for new questions",
    ),
    ("settings.save", "Opslaan", "Save"),
    ("settings.saved", "Instellingen opgeslagen", "Settings saved"),
    ("settings.language", "Taal", "Language"),
    ("language.nl", "Nederlands", "Dutch"),
    ("language.en", "Engels", "English"),
    ("admin.title", "Admin beheer", "Admin management"),
    ("admin.newQuestion", "Nieuwe vraag toevoegen", "Add new question"),
    ("admin.existingQuestions", "Bestaande vragen", "Existing questions"),
    ("admin.dayNo", "Dag nummer", "Day number"),
    ("admin.titleLabel", "Titel", "Title"),
    ("admin.main", "Hoofdvraag / opdracht", "Main question / task"),
    (
        "admin.deep",
        "Verdiepingsvragen (één per regel)",
        "Deep questions (one per line)",
    ),
    ("admin.photo", "Foto mogelijk", "Photo possible"),
    ("admin.publish", "Publiceren", "Publish"),
    ("admin.add", "Toevoegen", "Add"),
    ("admin.edit", "Bewerk", "Edit"),
    ("admin.save", "Opslaan", "Save"),
    ("admin.cancel", "Annuleren", "Cancel"),
    ("admin.publishYes", "Ja", "Yes"),
    ("admin.publishNo", "Nee", "No"),
    ("admin.added", "Vraag toegevoegd", "Question added"),
    ("admin.savedMsg", "Wijzigingen opgeslagen", "Changes saved"),
    (
        "questions.labelPossibleDeep",
        "Mogelijke verdiepingsvragen:",
        "Possible deep questions:",
    ),
    ("questions.notes", "Antwoord / notities", "Answer / notes"),
    ("questions.save", "Opslaan", "Save"),
    ("questions.skip", "Overslaan", "Skip"),
    ("questions.flag", "Markeer als ongepast", "Flag as inappropriate"),
    ("questions.statusSaved", "Opgeslagen", "Saved"),
    ("questions.statusSkipped", "Overgeslagen", "Skipped"),
    ("questions.statusFlagged", "Gemarkeerd", "Flagged"),
    ("questions.open", "Openen", "Open"),
    (
        "questions.promptFlagReason",
        "Waarom vind je deze vraag ongepast of niet passend?",
        "Why do you find this question inappropriate or unsuitable?",
    ),
    ("about.title", "Over ons", "About us"),
    (
        "about.content",
        "Deze applicatie helpt ouders en kinderen om samen te praten voor het slapengaan.",
        "This app helps parents and children connect before bedtime.",
    ),
    ("disclaimer.title", "Disclaimer", "Disclaimer"),
    (
        "disclaimer.content",
        "De inhoud van deze applicatie is bedoeld ter inspiratie en is geen vervanging voor professioneel advies.",
        "The content of this application is for inspiration and is not a substitute for professional advice.",
    ),
];

/// Returns the translated string for the given key and language. If the key
/// is missing, the key itself is returned.
pub fn translate<'a>(key: &'a str, lang: Language) -> &'a str {
    match CATALOG.iter().find(|(k, _, _)| *k == key) {
        Some((_, nl, en)) => match lang {
            Language::Nl => nl,
            Language::En => en,
        },
        None => key,
    }
}

/// Like [`translate`], but replaces `{name}` placeholders with the provided
/// parameter values.
pub fn translate_with(key: &str, lang: Language, params: &[(&str, &str)]) -> String {
    let mut out = translate(key, lang).to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{}}}", name), value);
    }
    out
}
