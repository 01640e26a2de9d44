//! Fixed table between human-readable language names and their codes.
//!
//! The same table serves three callers: the detector (code to display label),
//! the translator (name to code before calling the engine) and the chat
//! options (validating the output-language choice).

/// Supported languages as `(name, code, label)`.
pub const LANGUAGES: [(&str, &str, &str); 12] = [
    ("english", "en", "English"),
    ("spanish", "es", "Spanish"),
    ("french", "fr", "French"),
    ("german", "de", "German"),
    ("italian", "it", "Italian"),
    ("portuguese", "pt", "Portuguese"),
    ("russian", "ru", "Russian"),
    ("chinese", "zh", "Chinese"),
    ("japanese", "ja", "Japanese"),
    ("korean", "ko", "Korean"),
    ("arabic", "ar", "Arabic"),
    ("hindi", "hi", "Hindi"),
];

/// Code of the pivot language every backend is prompted in.
pub const PIVOT: &str = "en";

/// Output-language choice that leaves replies untranslated.
pub const AUTO: &str = "auto";

/// Code for a language name, e.g. `"spanish"` -> `"es"`.
pub fn code_of(name: &str) -> Option<&'static str> {
    let name = name.trim().to_lowercase();
    LANGUAGES
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, code, _)| *code)
}

/// Language name for a code, e.g. `"es"` -> `"spanish"`.
pub fn name_of(code: &str) -> Option<&'static str> {
    let code = normalize_code(code);
    LANGUAGES
        .iter()
        .find(|(_, c, _)| *c == code)
        .map(|(name, _, _)| *name)
}

/// Display label for a code. Codes outside the table come back upper-cased.
pub fn label_of(code: &str) -> String {
    let normalized = normalize_code(code);
    LANGUAGES
        .iter()
        .find(|(_, c, _)| *c == normalized)
        .map(|(_, _, label)| label.to_string())
        .unwrap_or_else(|| code.trim().to_uppercase())
}

/// Resolve a name or code to the code handed to a translation engine.
/// Unknown values pass through verbatim.
pub fn resolve(name_or_code: &str) -> String {
    match code_of(name_or_code) {
        Some(code) => code.to_string(),
        None => name_or_code.to_string(),
    }
}

/// Whether `choice` is one of the recognized output-language options.
pub fn is_output_choice(choice: &str) -> bool {
    choice.trim().eq_ignore_ascii_case(AUTO) || code_of(choice).is_some()
}

/// Whether replies for this output-language choice stay in the pivot language.
pub fn keeps_pivot(choice: &str) -> bool {
    let choice = choice.trim();
    choice.eq_ignore_ascii_case(AUTO) || code_of(choice) == Some(PIVOT)
}

// Regional variants reported by detectors ("zh-cn", "pt-BR") share the base code
fn normalize_code(code: &str) -> String {
    let code = code.trim().to_lowercase();
    match code.split(['-', '_']).next() {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_code_roundtrip() {
        for (name, code, _) in LANGUAGES {
            assert_eq!(code_of(name), Some(code));
            assert_eq!(name_of(code), Some(name));
            assert_eq!(code_of(name_of(code).unwrap()), Some(code));
        }
    }

    #[test]
    fn test_code_of_is_case_insensitive() {
        assert_eq!(code_of("Spanish"), Some("es"));
        assert_eq!(code_of(" FRENCH "), Some("fr"));
        assert_eq!(code_of("klingon"), None);
    }

    #[test]
    fn test_label_of() {
        assert_eq!(label_of("es"), "Spanish");
        assert_eq!(label_of("zh-cn"), "Chinese");
        assert_eq!(label_of("nl"), "NL");
        assert_eq!(label_of("ukr"), "UKR");
    }

    #[test]
    fn test_resolve_passes_unknown_through() {
        assert_eq!(resolve("german"), "de");
        assert_eq!(resolve("de"), "de");
        assert_eq!(resolve("Dutch"), "Dutch");
    }

    #[test]
    fn test_output_choices() {
        assert!(is_output_choice("auto"));
        assert!(is_output_choice("hindi"));
        assert!(!is_output_choice("klingon"));

        assert!(keeps_pivot("auto"));
        assert!(keeps_pivot("english"));
        assert!(!keeps_pivot("french"));
        assert!(!keeps_pivot("klingon"));
    }
}
