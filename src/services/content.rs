use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::AppError;

const IMAGE_DATA_PREFIX: &str = "data:image/";

/// Case-insensitive substring check against the configured banned words.
/// `banned_words` is expected to be lowercased already.
pub fn contains_banned_word(text: &str, banned_words: &[String]) -> bool {
    if banned_words.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    banned_words.iter().any(|word| lower.contains(word.as_str()))
}

pub fn ensure_clean_text(fields: &[&str], banned_words: &[String]) -> Result<(), AppError> {
    if fields
        .iter()
        .any(|field| contains_banned_word(field, banned_words))
    {
        return Err(AppError::ValidationError(
            "Inappropriate content detected.".to_string(),
        ));
    }
    Ok(())
}

/// Accepts `data:image/<subtype>[;params],<base64 payload>`.
pub fn is_valid_base64_image(data: &str) -> bool {
    let Some(rest) = data.strip_prefix(IMAGE_DATA_PREFIX) else {
        return false;
    };
    let Some((_, payload)) = rest.split_once(',') else {
        return false;
    };
    STANDARD.decode(payload.trim()).is_ok()
}

pub fn ensure_valid_images(images: &[String]) -> Result<(), AppError> {
    if let Some(position) = images.iter().position(|image| !is_valid_base64_image(image)) {
        return Err(AppError::ValidationError(format!(
            "Invalid image format in base64 (image #{})",
            position + 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banned(words: &[&str]) -> Vec<String> {
        words.iter().map(|word| word.to_string()).collect()
    }

    #[test]
    fn banned_word_match_ignores_case() {
        let words = banned(&["spam"]);
        assert!(contains_banned_word("This is SPAM content", &words));
        assert!(contains_banned_word("spammy", &words));
        assert!(!contains_banned_word("Rumah layak huni", &words));
    }

    #[test]
    fn empty_list_bans_nothing() {
        assert!(!contains_banned_word("anything", &[]));
    }

    #[test]
    fn ensure_clean_text_checks_every_field() {
        let words = banned(&["scam"]);
        let result = ensure_clean_text(&["Budi", "This looks like a SCAM"], &words);
        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert!(ensure_clean_text(&["Budi", "Atap bocor"], &words).is_ok());
    }

    #[test]
    fn accepts_well_formed_data_uri() {
        assert!(is_valid_base64_image("data:image/png;base64,aGVsbG8="));
        assert!(is_valid_base64_image("data:image/jpeg;base64,"));
    }

    #[test]
    fn rejects_missing_prefix_or_bad_payload() {
        assert!(!is_valid_base64_image("aGVsbG8="));
        assert!(!is_valid_base64_image("data:text/plain;base64,aGVsbG8="));
        assert!(!is_valid_base64_image("data:image/png;base64"));
        assert!(!is_valid_base64_image("data:image/png;base64,not base64!"));
    }

    #[test]
    fn reports_first_invalid_image() {
        let images = vec![
            "data:image/png;base64,aGVsbG8=".to_string(),
            "https://example.com/a.png".to_string(),
            "also bad".to_string(),
        ];
        match ensure_valid_images(&images) {
            Err(AppError::ValidationError(message)) => assert!(message.contains("#2")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
