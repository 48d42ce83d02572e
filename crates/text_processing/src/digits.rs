//! Spoken-digit translation
//!
//! STT engines routinely spell digits out ("तीन शून्य पांच",
//! "three zero five") and emit digit runs split by spaces. This pass
//! rewrites both into contiguous ASCII digits so the extraction regexes see
//! "305001" no matter how the caller said it. It runs before pattern
//! matching and only ever touches digit material.

use dhvani_core::Language;

/// Convert Devanagari numerals to their ASCII equivalents
pub fn devanagari_to_ascii(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '०' => '0',
            '१' => '1',
            '२' => '2',
            '३' => '3',
            '४' => '4',
            '५' => '5',
            '६' => '6',
            '७' => '7',
            '८' => '8',
            '९' => '9',
            _ => c,
        })
        .collect()
}

/// Map a single spoken word to a digit, if it is one
///
/// The Hindi table accepts Devanagari, romanized Hindi and English words;
/// Hinglish transcripts mix all three freely. The English table stays
/// English-only.
fn word_digit(word: &str, language: Language) -> Option<char> {
    let english = |w: &str| match w {
        "zero" => Some('0'),
        "one" => Some('1'),
        "two" => Some('2'),
        "three" => Some('3'),
        "four" => Some('4'),
        "five" => Some('5'),
        "six" => Some('6'),
        "seven" => Some('7'),
        "eight" => Some('8'),
        "nine" => Some('9'),
        _ => None,
    };

    match language {
        Language::English => english(word),
        Language::Hindi => english(word).or(match word {
            "शून्य" | "जीरो" | "shunya" | "jeero" => Some('0'),
            "एक" | "ek" => Some('1'),
            "दो" | "do" => Some('2'),
            "तीन" | "teen" | "tin" => Some('3'),
            "चार" | "char" | "chaar" => Some('4'),
            "पांच" | "पाँच" | "panch" | "paanch" => Some('5'),
            "छह" | "छः" | "छे" | "chhe" | "cheh" | "chheh" => Some('6'),
            "सात" | "saat" | "sat" => Some('7'),
            "आठ" | "aath" | "ath" => Some('8'),
            "नौ" | "nau" => Some('9'),
            _ => None,
        }),
    }
}

/// Translate spoken digits and collapse spaced digit runs.
///
/// "my pincode is 3 0 5 0 0 1" -> "my pincode is 305001"
/// "पिनकोड तीन शून्य पांच शून्य शून्य एक है" -> "पिनकोड 305001 है"
pub fn translate_spoken_digits(text: &str, language: Language) -> String {
    let ascii = devanagari_to_ascii(text);

    let mut out: Vec<String> = Vec::new();
    for token in ascii.split_whitespace() {
        let trimmed = token.trim_matches(|c: char| c.is_ascii_punctuation());
        let lowered = trimmed.to_lowercase();

        let piece = if let Some(d) = word_digit(&lowered, language) {
            d.to_string()
        } else {
            token.to_string()
        };

        let is_digits = !piece.is_empty() && piece.chars().all(|c| c.is_ascii_digit());
        match out.last_mut() {
            Some(last)
                if is_digits && !last.is_empty() && last.chars().all(|c| c.is_ascii_digit()) =>
            {
                last.push_str(&piece);
            }
            _ => out.push(piece),
        }
    }

    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devanagari_numerals() {
        assert_eq!(devanagari_to_ascii("३०५००१"), "305001");
        assert_eq!(devanagari_to_ascii("pin ५०"), "pin 50");
    }

    #[test]
    fn test_spaced_digit_run_collapses() {
        assert_eq!(
            translate_spoken_digits("my pincode is 3 0 5 0 0 1", Language::Hindi),
            "my pincode is 305001"
        );
    }

    #[test]
    fn test_hindi_digit_words() {
        assert_eq!(
            translate_spoken_digits("पिनकोड तीन शून्य पांच शून्य शून्य एक", Language::Hindi),
            "पिनकोड 305001"
        );
    }

    #[test]
    fn test_english_digit_words() {
        assert_eq!(
            translate_spoken_digits("nine eight seven six five four three two one zero", Language::English),
            "9876543210"
        );
    }

    #[test]
    fn test_romanized_hindi_digits() {
        assert_eq!(
            translate_spoken_digits("teen shunya panch", Language::Hindi),
            "305"
        );
    }

    #[test]
    fn test_english_locale_ignores_hindi_words() {
        assert_eq!(
            translate_spoken_digits("teen zero", Language::English),
            "teen 0"
        );
    }

    #[test]
    fn test_non_digit_text_untouched() {
        assert_eq!(
            translate_spoken_digits("mera naam Rahul hai", Language::Hindi),
            "mera naam Rahul hai"
        );
    }
}
