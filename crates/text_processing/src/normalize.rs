//! Speech verbalization
//!
//! TTS engines mangle digit strings and currency shorthand ("50L", "₹500"),
//! so controller output is rewritten into fully spelled words before
//! synthesis. Uses the Indian thousand/lakh/crore numbering scale in both
//! target locales. Hindi 21-99 are irregular forms that cannot be composed
//! from tens+ones, hence the full lookup table. Never applied to caller
//! input.

use once_cell::sync::Lazy;
use regex::Regex;

use dhvani_core::Language;

/// Hindi cardinals 0-99. Irregular throughout; composition would produce
/// words no native speaker says.
#[rustfmt::skip]
const HINDI_0_99: [&str; 100] = [
    "शून्य", "एक", "दो", "तीन", "चार", "पांच", "छह", "सात", "आठ", "नौ",
    "दस", "ग्यारह", "बारह", "तेरह", "चौदह", "पंद्रह", "सोलह", "सत्रह", "अठारह", "उन्नीस",
    "बीस", "इक्कीस", "बाईस", "तेईस", "चौबीस", "पच्चीस", "छब्बीस", "सत्ताईस", "अट्ठाईस", "उनतीस",
    "तीस", "इकतीस", "बत्तीस", "तैंतीस", "चौंतीस", "पैंतीस", "छत्तीस", "सैंतीस", "अड़तीस", "उनतालीस",
    "चालीस", "इकतालीस", "बयालीस", "तैंतालीस", "चौवालीस", "पैंतालीस", "छियालीस", "सैंतालीस", "अड़तालीस", "उनचास",
    "पचास", "इक्यावन", "बावन", "तिरपन", "चौवन", "पचपन", "छप्पन", "सत्तावन", "अट्ठावन", "उनसठ",
    "साठ", "इकसठ", "बासठ", "तिरसठ", "चौंसठ", "पैंसठ", "छियासठ", "सड़सठ", "अड़सठ", "उनहत्तर",
    "सत्तर", "इकहत्तर", "बहत्तर", "तिहत्तर", "चौहत्तर", "पचहत्तर", "छिहत्तर", "सतहत्तर", "अठहत्तर", "उन्यासी",
    "अस्सी", "इक्यासी", "बयासी", "तिरासी", "चौरासी", "पचासी", "छियासी", "सत्तासी", "अट्ठासी", "नवासी",
    "नब्बे", "इक्यानवे", "बानवे", "तिरानवे", "चौरानवे", "पंचानवे", "छियानवे", "सत्तानवे", "अट्ठानवे", "निन्यानवे",
];

const ENGLISH_ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const ENGLISH_TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

/// Scale units of the Indian numbering system, largest first
const SCALES: [(u64, &str, &str); 4] = [
    (10_000_000, "करोड़", "crore"),
    (100_000, "लाख", "lakh"),
    (1_000, "हज़ार", "thousand"),
    (100, "सौ", "hundred"),
];

// "₹500" / "Rs. 500" / "INR 500" -> "500 rupees" so one main pass handles
// marker-before and marker-after alike
static CURRENCY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:₹|\b(?i:rs|inr)\.?)\s*(\d[\d,]*(?:\.\d+)?)").unwrap());

// number, optional currency marker, optional scale suffix, in that spoken
// order ("75 rupees लाख" keeps its scale after the marker). Leading
// whitespace lives inside the optional groups so a bare number match
// consumes nothing past its own digits.
static MONEY_OR_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        (?P<num>\d[\d,]*(?:\.\d+)?)
        (?P<cur>\s*(?:rupees?|rupaye|रुपये|रुपए))?
        (?P<scale>\s*(?:crores?|cr|करोड़|करोड|lakhs?|lac|l|लाख|thousand|hazaa?r|k|हज़ार|हजार))?\b",
    )
    .unwrap()
});

/// Number and currency verbalizer
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbalizer;

impl Verbalizer {
    pub fn new() -> Self {
        Self
    }

    /// Rewrite numeric and currency expressions in controller output.
    pub fn normalize(&self, text: &str, language: Language) -> String {
        let text = CURRENCY_PREFIX.replace_all(text, "$1 rupees");

        let result = MONEY_OR_NUMBER.replace_all(&text, |caps: &regex::Captures| {
            let number = caps["num"].replace(',', "");
            let currency = caps.name("cur").is_some();
            let scale = caps.name("scale").map(|m| canonical_scale(m.as_str().trim()));

            let spoken_number = if scale.is_none() && !currency && digit_by_digit(&number) {
                spell_digits(&number, language)
            } else {
                spell_number(&number, language)
            };

            let mut parts = vec![spoken_number];
            if let Some(scale) = scale {
                parts.push(scale_word(scale, language).to_string());
            }
            // A scale suffix implies money in this domain: "50L" is an
            // amount, not a volume
            if currency || scale.is_some() {
                parts.push(rupees_word(language).to_string());
            }
            parts.join(" ")
        });

        result.into_owned()
    }

    /// Spell a whole number in the Indian scale.
    pub fn number_to_words(n: u64, language: Language) -> String {
        if n < 100 {
            return under_hundred(n, language);
        }

        let mut parts = Vec::new();
        let mut rest = n;
        for (unit, hindi, english) in SCALES {
            if rest >= unit {
                let count = rest / unit;
                rest %= unit;
                // Scale counts are themselves < 100 by construction
                parts.push(format!(
                    "{} {}",
                    under_hundred(count, language),
                    match language {
                        Language::Hindi => hindi,
                        Language::English => english,
                    }
                ));
            }
        }
        if rest > 0 {
            parts.push(under_hundred(rest, language));
        }

        parts.join(" ")
    }
}

fn under_hundred(n: u64, language: Language) -> String {
    debug_assert!(n < 100);
    match language {
        Language::Hindi => HINDI_0_99[n as usize].to_string(),
        Language::English => {
            if n < 20 {
                ENGLISH_ONES[n as usize].to_string()
            } else {
                let tens = ENGLISH_TENS[(n / 10) as usize];
                if n % 10 == 0 {
                    tens.to_string()
                } else {
                    format!("{}-{}", tens, ENGLISH_ONES[(n % 10) as usize])
                }
            }
        }
    }
}

/// Long bare digit strings (pincodes, phone numbers) read digit-by-digit
fn digit_by_digit(number: &str) -> bool {
    number.len() >= 6 && number.chars().all(|c| c.is_ascii_digit())
}

fn spell_digits(number: &str, language: Language) -> String {
    number
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| under_hundred(d as u64, language))
        .collect::<Vec<_>>()
        .join(" ")
}

fn spell_number(number: &str, language: Language) -> String {
    match number.split_once('.') {
        Some((int, frac)) => {
            let point = match language {
                Language::Hindi => "दशमलव",
                Language::English => "point",
            };
            format!(
                "{} {} {}",
                Verbalizer::number_to_words(int.parse().unwrap_or(0), language),
                point,
                spell_digits(frac, language)
            )
        }
        None => Verbalizer::number_to_words(number.parse().unwrap_or(0), language),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    Crore,
    Lakh,
    Thousand,
}

fn canonical_scale(raw: &str) -> Scale {
    match raw.to_lowercase().as_str() {
        "crore" | "crores" | "cr" | "करोड़" | "करोड" => Scale::Crore,
        "lakh" | "lakhs" | "lac" | "l" | "लाख" => Scale::Lakh,
        _ => Scale::Thousand,
    }
}

fn scale_word(scale: Scale, language: Language) -> &'static str {
    match (scale, language) {
        (Scale::Crore, Language::Hindi) => "करोड़",
        (Scale::Crore, Language::English) => "crore",
        (Scale::Lakh, Language::Hindi) => "लाख",
        (Scale::Lakh, Language::English) => "lakh",
        (Scale::Thousand, Language::Hindi) => "हज़ार",
        (Scale::Thousand, Language::English) => "thousand",
    }
}

fn rupees_word(language: Language) -> &'static str {
    match language {
        Language::Hindi => "रुपये",
        Language::English => "rupees",
    }
}
