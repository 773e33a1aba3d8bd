use crate::types::Drivetrain;

// ---------------------------------------------------------------------------
// Platform class
// ---------------------------------------------------------------------------

/// Nameplates that span distinct platforms and must not cross-match.
/// Matched by model prefix, most specific entry first.
const PLATFORM_OVERRIDES: &[(&str, &str, &str)] = &[
    ("TOYOTA", "LANDCRUISER PRADO", "TOYOTA:PRADO"),
    ("TOYOTA", "LANDCRUISER 70", "TOYOTA:LC70"),
    ("TOYOTA", "LANDCRUISER 76", "TOYOTA:LC70"),
    ("TOYOTA", "LANDCRUISER 79", "TOYOTA:LC70"),
    ("TOYOTA", "LANDCRUISER", "TOYOTA:LC300"),
    ("TOYOTA", "PRADO", "TOYOTA:PRADO"),
    ("MITSUBISHI", "PAJERO SPORT", "MITSUBISHI:PAJERO_SPORT"),
    ("MITSUBISHI", "PAJERO", "MITSUBISHI:PAJERO"),
];

/// Canonical platform class for a make/model pair. None when either side is
/// missing — such a listing is unmatchable.
pub fn platform_class(make: &str, model: &str) -> Option<String> {
    let make = collapse_upper(make);
    let model = collapse_upper(model);
    if make.is_empty() || model.is_empty() {
        return None;
    }
    for &(m, prefix, class) in PLATFORM_OVERRIDES {
        if make == m && model.starts_with(prefix) {
            return Some(class.to_string());
        }
    }
    Some(format!("{make}:{model}"))
}

fn collapse_upper(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

// ---------------------------------------------------------------------------
// Trim extraction
// ---------------------------------------------------------------------------

/// Known trim badges, longest-token-first so multi-word badges win over their
/// prefixes ("RUGGED X" before "RUGGED", "GR SPORT" before "SR").
const KNOWN_TRIMS: &[&str] = &[
    "RUGGED X",
    "GR SPORT",
    "X-TERRAIN",
    "WILDTRAK",
    "WORKMATE",
    "ALTITUDE",
    "PLATINUM",
    "WARRIOR",
    "RUGGED",
    "RAPTOR",
    "SAHARA",
    "KAKADU",
    "PRO-4X",
    "ROGUE",
    "SPORT",
    "GLX+",
    "LS-U",
    "LS-M",
    "ST-X",
    "GXL",
    "GLS",
    "GLX",
    "GSR",
    "SR5",
    "XLT",
    "XLS",
    "XTR",
    "GX",
    "LS",
    "SL",
    "SR",
    "ST",
    "SX",
    "VX",
    "XL",
];

/// Body/cab/fuel/transmission words that never identify a trim.
const NOISE_TOKENS: &[&str] = &[
    "DUAL", "DOUBLE", "SINGLE", "EXTRA", "CREW", "SPACE", "KING", "CAB", "CHASSIS", "UTE",
    "UTILITY", "PICKUP", "WAGON", "SUV", "4X4", "4X2", "2WD", "4WD", "AWD", "TURBO", "DIESEL",
    "PETROL", "HYBRID", "AUTO", "AUTOMATIC", "MANUAL", "CVT",
];

/// Words that pass the badge length check but are known not to be badges.
const NON_BADGE_WORDS: &[&str] = &[
    "SERIES", "EDITION", "SPECIAL", "PACK", "PLUS", "NEW", "USED", "DEMO", "LOW", "KMS", "KM",
];

/// Extracts a trim/badge token from free text. Strips make/model echoes and
/// noise tokens, then matches the known-trim dictionary, then falls back to
/// the first remaining badge-looking token. None means UNKNOWN.
pub fn extract_trim(free_text: &str, make: &str, model: &str) -> Option<String> {
    let make = collapse_upper(make);
    let model = collapse_upper(model);
    // Word-wise, so multi-word makes ("Land Rover") are stripped too.
    let make_words: Vec<&str> = make.split(' ').collect();
    let model_words: Vec<&str> = model.split(' ').collect();

    let tokens: Vec<String> = collapse_upper(free_text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .filter(|t| !make_words.contains(t) && !model_words.contains(t))
        .filter(|t| !NOISE_TOKENS.contains(t))
        .filter(|t| !is_model_year_code(t) && !is_displacement(t) && !is_numeric(t))
        .map(str::to_string)
        .collect();

    // Dictionary pass: token windows against known trims, longest first.
    for &trim in KNOWN_TRIMS {
        let trim_words: Vec<&str> = trim.split(' ').collect();
        if tokens
            .windows(trim_words.len())
            .any(|w| w.iter().map(String::as_str).eq(trim_words.iter().copied()))
        {
            return Some(trim.to_string());
        }
    }

    // Fallback: first remaining token that looks like a badge.
    tokens.into_iter().find(|t| looks_like_badge(t))
}

/// MY21, MY23.5 and similar model-year codes.
fn is_model_year_code(token: &str) -> bool {
    token.len() >= 4
        && token.starts_with("MY")
        && token[2..].chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// 2.8L, 3.0TD and similar displacement tokens.
fn is_displacement(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_ascii_digit())
        && token.chars().any(|c| c == '.')
        && token.chars().any(|c| c.is_ascii_alphabetic())
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// 2–8 chars, alphanumeric plus -/+, at least one letter, not a known
/// non-badge word.
fn looks_like_badge(token: &str) -> bool {
    (2..=8).contains(&token.len())
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '+')
        && token.chars().any(|c| c.is_ascii_alphabetic())
        && !NON_BADGE_WORDS.contains(&token)
}

// ---------------------------------------------------------------------------
// Drivetrain bucketing
// ---------------------------------------------------------------------------

/// Buckets a raw drivetrain string. Malformed or empty input is Unknown,
/// never an error.
pub fn bucket_drivetrain(raw: &str) -> Drivetrain {
    let s = collapse_upper(raw);
    if s.is_empty() {
        Drivetrain::Unknown
    } else if s.contains("4X4") || s.contains("4WD") || s.contains("FOUR WHEEL") {
        Drivetrain::FourWd
    } else if s.contains("AWD") || s.contains("ALL WHEEL") {
        Drivetrain::Awd
    } else if s.contains("FWD") || s.contains("FRONT") {
        Drivetrain::Fwd
    } else if s.contains("RWD") || s.contains("REAR") || s.contains("4X2") || s.contains("2WD") {
        Drivetrain::Rwd
    } else {
        Drivetrain::Unknown
    }
}
