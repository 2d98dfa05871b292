//! Pulling structured fields out of free-text model responses.

use once_cell::sync::Lazy;
use regex::Regex;

static NARRATIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Type of narrative: ([^;]+);").unwrap());
static CHARACTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Type of main characters: ([^.]+)\.").unwrap());

/// Extract the narrative-type and main-character labels from a guidance
/// response. Either match may be missing; the caller must record nothing
/// for a missing label rather than a placeholder.
pub fn extract_type_and_characters(response: &str) -> (Option<String>, Option<String>) {
    let narrative = NARRATIVE_RE
        .captures(response)
        .map(|c| c[1].trim().to_owned());
    let characters = CHARACTER_RE
        .captures(response)
        .map(|c| c[1].trim().to_owned());
    (narrative, characters)
}

/// Yes/no gate responses count as affirmative if "yes" appears anywhere,
/// case-insensitively. Models pad these answers ("Yes, the text is...").
pub fn is_affirmative(response: &str) -> bool {
    response.to_lowercase().contains("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_both_labels() {
        let response = "1. A summary.\n\
                        2. Type of narrative: Diary; Type of main characters: Author themselves.\n\
                        3. Analysis: ...";
        let (narrative, characters) = extract_type_and_characters(response);
        assert_eq!(narrative.as_deref(), Some("Diary"));
        assert_eq!(characters.as_deref(), Some("Author themselves"));
    }

    #[test]
    fn missing_fields_yield_none() {
        let (narrative, characters) = extract_type_and_characters("no structure here");
        assert!(narrative.is_none());
        assert!(characters.is_none());

        let (narrative, characters) =
            extract_type_and_characters("Type of narrative: Prose; and nothing else");
        assert_eq!(narrative.as_deref(), Some("Prose"));
        assert!(characters.is_none());
    }

    #[test]
    fn labels_are_trimmed() {
        let (narrative, _) = extract_type_and_characters("Type of narrative:  Novel ;");
        assert_eq!(narrative.as_deref(), Some("Novel"));
    }

    #[test]
    fn affirmative_detection() {
        assert!(is_affirmative("Yes."));
        assert!(is_affirmative("yes, it has enough content"));
        assert!(is_affirmative("YES"));
        assert!(!is_affirmative("No."));
        assert!(!is_affirmative("not feasible"));
    }
}
