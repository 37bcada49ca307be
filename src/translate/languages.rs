// src/translate/languages.rs
// Speech-engine language codes -> translation-engine dialect

/// Source code meaning "let the translation engine detect the language"
pub const AUTO_DETECT: &str = "auto";

const SPEECH_TO_TRANSLATION: &[(&str, &str)] = &[
    ("zh", "zh-CN"),
    ("zh-cn", "zh-CN"),
    ("zh-tw", "zh-TW"),
    ("ko", "ko"),
    ("ja", "ja"),
    ("en", "en"),
    ("fr", "fr"),
    ("de", "de"),
    ("es", "es"),
    ("it", "it"),
    ("pt", "pt"),
    ("nl", "nl"),
    ("ru", "ru"),
    ("ar", "ar"),
    ("hi", "hi"),
    ("tr", "tr"),
    ("pl", "pl"),
    ("auto", AUTO_DETECT),
];

/// Target languages offered for translation: (code, display name)
pub const TARGET_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("fr", "French"),
    ("es", "Spanish"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("nl", "Dutch"),
    ("pl", "Polish"),
    ("ru", "Russian"),
    ("tr", "Turkish"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh-CN", "Chinese (Simplified)"),
    ("zh-TW", "Chinese (Traditional)"),
];

/// Look up the translation-engine code for a speech-engine language code.
pub fn map_speech_code(code: &str) -> Option<&'static str> {
    let needle = code.trim().to_lowercase();
    SPEECH_TO_TRANSLATION
        .iter()
        .find(|(speech, _)| *speech == needle)
        .map(|(_, translation)| *translation)
}

/// Source language to request from the engine; unmapped codes fall back to detection.
pub fn resolve_source(code: &str) -> &'static str {
    map_speech_code(code).unwrap_or(AUTO_DETECT)
}

pub fn is_known_target(code: &str) -> bool {
    TARGET_LANGUAGES
        .iter()
        .any(|(known, _)| known.eq_ignore_ascii_case(code.trim()))
}
