//! Rule table for Vietnamese vehicle registration certificates
//!
//! Certificates print bilingual labels such as `Số khung (Chassis N°):`. The
//! recognizer often drops diacritics or the Vietnamese half of a label, so
//! each field is tried with the bilingual label, the English label and the
//! unaccented Vietnamese label, then with shape or proximity fallbacks.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::colors::{lookup_color, scan_colors};
use super::normalize::{clean_alphanumeric, collapse_whitespace, fold_diacritics};
use super::rules::{CaptureExtractor, Document, Haystack, Rule, RuleSet};
use super::{Field, FieldSource};

/// Brands recognized anywhere in the text, in priority order
pub const KNOWN_BRANDS: &[&str] = &[
    "HONDA",
    "YAMAHA",
    "SUZUKI",
    "PIAGGIO",
    "VESPA",
    "SYM",
    "KYMCO",
    "TOYOTA",
    "HYUNDAI",
    "KIA",
    "MAZDA",
    "FORD",
    "VINFAST",
    "MERCEDES",
    "BMW",
    "AUDI",
    "LEXUS",
    "MITSUBISHI",
    "NISSAN",
    "CHEVROLET",
];

/// Longest color label value kept
const MAX_COLOR_LEN: usize = 24;

/// Plate shape: series (2 digits, letter, optional digit), number, optional
/// 2-digit suffix
const PLATE_SHAPE: &str = r"([0-9]{2}[A-Z][0-9]?)[\s.\-]*([0-9]{3,5})(?:\.([0-9]{2}))?\b";

/// Start of the next printed label after a color value
static NEXT_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:ho[aạ]t|bi[ểếe]n|s[ốo]|nh[ãa]n|lo[ạa]i|model|dung)\b")
        .expect("label pattern is valid")
});

static PLATE_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)^{}$", PLATE_SHAPE)).expect("plate pattern is valid"));

/// Built-in rules are literals covered by tests
fn rule(name: &str, source: FieldSource, haystack: Haystack, pattern: &str, extract: CaptureExtractor) -> Rule {
    Rule::pattern(name, source, haystack, pattern, extract).expect("built-in rule pattern is valid")
}

fn labeled(name: &str, haystack: Haystack, pattern: &str, extract: CaptureExtractor) -> Rule {
    rule(name, FieldSource::Labeled, haystack, pattern, extract)
}

fn shaped(name: &str, haystack: Haystack, pattern: &str, extract: CaptureExtractor) -> Rule {
    rule(name, FieldSource::Heuristic, haystack, pattern, extract)
}

impl RuleSet {
    /// The full cascade for registration certificates
    pub fn vehicle_registration() -> Self {
        RuleSet::empty()
            // VIN
            .with_rule(Field::Vin, labeled(
                "vin.label.bilingual",
                Haystack::Flat,
                r"(?i)S[ốo] khung\s*\(Chassis N[°o]?\.?\)\s*:\s*([A-Z0-9]{6,25})",
                identifier,
            ))
            .with_rule(Field::Vin, labeled(
                "vin.label.english",
                Haystack::Flat,
                r"(?i)Chassis N[°o]?\.?\s*:\s*([A-Z0-9]{6,25})",
                identifier,
            ))
            .with_rule(Field::Vin, labeled(
                "vin.label.unaccented",
                Haystack::Folded,
                r"SO KHUNG[^:\n]{0,40}:\s*([A-Z0-9]{6,25})",
                identifier,
            ))
            .with_rule(Field::Vin, shaped(
                "vin.shape.honda",
                Haystack::Flat,
                r"(?i)\b(RLHJK[A-Z0-9]{12,})",
                identifier,
            ))
            .with_rule(Field::Vin, shaped(
                "vin.shape.standalone",
                Haystack::Flat,
                r"(?i)\b([A-Z0-9]{15,20})\b",
                standalone_vin,
            ))
            // Engine number
            .with_rule(Field::EngineNumber, labeled(
                "engine.label.bilingual",
                Haystack::Flat,
                r"(?i)S[ốo] m[áa]y\s*\(Engine N[°o]?\.?\)\s*:\s*([A-Z0-9]{4,20})",
                identifier,
            ))
            .with_rule(Field::EngineNumber, labeled(
                "engine.label.english",
                Haystack::Flat,
                r"(?i)Engine N[°o]?\.?\s*:\s*([A-Z0-9]{4,20})",
                identifier,
            ))
            .with_rule(Field::EngineNumber, labeled(
                "engine.label.unaccented",
                Haystack::Folded,
                r"SO MAY[^:\n]{0,40}:\s*([A-Z0-9]{4,20})",
                identifier,
            ))
            .with_rule(Field::EngineNumber, shaped(
                "engine.shape",
                Haystack::Flat,
                r"(?i)\b([IJ]K)([0-9OI]{2})([EF])([0-9OI]{6,})",
                engine_shape,
            ))
            .with_rule(Field::EngineNumber, shaped(
                "engine.proximity",
                Haystack::Folded,
                r"\b(?:MAY|ENGINE|MOTOR)\b.{0,50}?\b([A-Z0-9]{8,15})\b",
                engine_near_keyword,
            ))
            // License plate
            .with_rule(Field::LicensePlate, labeled(
                "plate.label.bilingual",
                Haystack::Folded,
                &format!(r"BIEN SO DANG KY\s*\(N[°O]?\.?\s*PLATE\)\s*(?:\(T\))?\s*\b{}", PLATE_SHAPE),
                plate,
            ))
            .with_rule(Field::LicensePlate, labeled(
                "plate.label.english",
                Haystack::Flat,
                &format!(r"(?i)N[°o]?\.?\s*plate.{{0,20}}?\b{}", PLATE_SHAPE),
                plate,
            ))
            .with_rule(Field::LicensePlate, shaped(
                "plate.shape",
                Haystack::Flat,
                &format!(r"(?i)\b{}", PLATE_SHAPE),
                plate,
            ))
            // Brand
            .with_rule(Field::Brand, labeled(
                "brand.label.bilingual",
                Haystack::Folded,
                r"NHAN HIEU\s*\(BRAND\)\s*:\s*([A-Z]+)",
                brand,
            ))
            .with_rule(Field::Brand, labeled(
                "brand.label.english",
                Haystack::Folded,
                r"\bBRAND\s*:\s*([A-Z]+)",
                brand,
            ))
            .with_rule(Field::Brand, labeled(
                "brand.label.unaccented",
                Haystack::Folded,
                r"NHAN HIEU[^:\n]{0,30}:\s*([A-Z]+)",
                brand,
            ))
            .with_rule(Field::Brand, Rule::heuristic("brand.known", known_brand))
            // Color
            .with_rule(Field::Color, labeled(
                "color.label.bilingual",
                Haystack::Raw,
                r"(?i)M[àa]u s[ơo]n\s*\(Colou?r\)\s*:[ \t]*([\p{L} \t\-]+)",
                color_label,
            ))
            .with_rule(Field::Color, labeled(
                "color.label.english",
                Haystack::Raw,
                r"(?i)\bColou?r\s*:[ \t]*([\p{L} \t\-]+)",
                color_label,
            ))
            .with_rule(Field::Color, labeled(
                "color.label.unaccented",
                Haystack::Raw,
                r"(?i)Mau son[^:\n]{0,30}:[ \t]*([\p{L} \t\-]+)",
                color_label,
            ))
            .with_rule(Field::Color, labeled(
                "color.label.loose",
                Haystack::Raw,
                r"(?i)(?:\bColou?r|M[àa]u s[ơo]n)[ \t]+(\p{L}+(?:[ \t]+\p{L}+)?)",
                color_label,
            ))
            .with_rule(Field::Color, Rule::heuristic("color.dictionary", |doc: &Document| {
                scan_colors(&doc.folded).map(str::to_string)
            }))
            .with_rule(Field::Color, shaped(
                "color.between_labels",
                Haystack::Raw,
                r"(?s)(?i:khung).{0,100}?(\p{Lu}\p{Ll}+(?:[ \t]+\p{Lu}\p{Ll}+)?).{0,50}?(?i:ho[aạ]t)",
                color_between_labels,
            ))
            // Owner name
            .with_rule(Field::OwnerName, labeled(
                "owner.label.bilingual",
                Haystack::Raw,
                r"(?i)T[êe]n ch[ủu] xe\s*\(Owner['’]?s? full name\)\s*:\s*(\p{L}[\p{L} \t]*)",
                owner_name,
            ))
            .with_rule(Field::OwnerName, labeled(
                "owner.label.english",
                Haystack::Raw,
                r"(?i)Owner['’]?s? full name[^:\n]{0,10}:\s*(\p{L}[\p{L} \t]*)",
                owner_name,
            ))
            .with_rule(Field::OwnerName, labeled(
                "owner.label.unaccented",
                Haystack::Raw,
                r"(?i)Ten chu xe[^:\n]{0,40}:\s*(\p{L}[\p{L} \t]*)",
                owner_name,
            ))
            // Address
            .with_rule(Field::Address, labeled(
                "address.label.bilingual",
                Haystack::Raw,
                r"(?i)Đ[ịi]a ch[ỉi]\s*\(Address\)\s*:\s*([^\n]+)",
                address,
            ))
            .with_rule(Field::Address, labeled(
                "address.label.english",
                Haystack::Raw,
                r"(?i)\bAddress\s*:\s*([^\n]+)",
                address,
            ))
            .with_rule(Field::Address, labeled(
                "address.label.unaccented",
                Haystack::Raw,
                r"(?i)Dia chi[^:\n]{0,40}:\s*([^\n]+)",
                address,
            ))
            // Registration date
            .with_rule(Field::RegistrationDate, labeled(
                "date.localized",
                Haystack::Raw,
                r"(?i)ngày\s*([0-9]{1,2})\s*tháng\s*([0-9]{1,2})\s*năm\s*([0-9]{4})",
                date,
            ))
            .with_rule(Field::RegistrationDate, shaped(
                "date.unaccented",
                Haystack::Folded,
                r"NGAY\s*([0-9]{1,2})\s*THANG\s*([0-9]{1,2})\s*NAM\s*([0-9]{4})",
                date,
            ))
            .with_rule(Field::RegistrationDate, shaped(
                "date.numeric",
                Haystack::Raw,
                r"\b([0-9]{1,2})[/.\-]([0-9]{1,2})[/.\-]([0-9]{4})\b",
                date,
            ))
    }
}

fn group<'t>(caps: &Captures<'t>, index: usize) -> Option<&'t str> {
    caps.get(index).map(|m| m.as_str())
}

fn identifier(caps: &Captures<'_>) -> Option<String> {
    group(caps, 1).map(clean_alphanumeric)
}

fn standalone_vin(caps: &Captures<'_>) -> Option<String> {
    identifier(caps).filter(|v| (15..=20).contains(&v.len()))
}

/// `JK` prefix and `E`/`F` marker stay letters, digit runs are cleaned
fn engine_shape(caps: &Captures<'_>) -> Option<String> {
    Some(format!(
        "{}{}{}{}",
        group(caps, 1)?.to_uppercase(),
        clean_alphanumeric(group(caps, 2)?),
        group(caps, 3)?.to_uppercase(),
        clean_alphanumeric(group(caps, 4)?),
    ))
}

/// Must start with a letter and mix letters and digits
fn engine_near_keyword(caps: &Captures<'_>) -> Option<String> {
    // Checked after cleaning: O/I/S/Z turn into digits
    let cleaned = clean_alphanumeric(group(caps, 1)?);
    let starts_with_letter = cleaned.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let has_digit = cleaned.chars().any(|c| c.is_ascii_digit());

    if starts_with_letter && has_digit {
        Some(cleaned)
    } else {
        None
    }
}

/// `SERIES-NUMBER[.SUFFIX]`, uppercase, no whitespace
fn plate(caps: &Captures<'_>) -> Option<String> {
    let series = group(caps, 1)?.to_uppercase();
    let number = group(caps, 2)?;
    Some(match group(caps, 3) {
        Some(suffix) => format!("{}-{}.{}", series, number, suffix),
        None => format!("{}-{}", series, number),
    })
}

fn brand(caps: &Captures<'_>) -> Option<String> {
    group(caps, 1)
        .map(|b| b.trim().to_uppercase())
        .filter(|b| b.chars().count() >= 2)
}

fn known_brand(document: &Document) -> Option<String> {
    KNOWN_BRANDS
        .iter()
        .find(|brand| document.folded.contains(*brand))
        .map(|brand| brand.to_string())
}

/// Label value cut at the next label, mapped through the color dictionary.
/// Unmapped values are kept as read.
fn color_label(caps: &Captures<'_>) -> Option<String> {
    let raw = group(caps, 1)?;
    let raw = match NEXT_LABEL.find(raw) {
        Some(m) => &raw[..m.start()],
        None => raw,
    };
    let value = collapse_whitespace(raw.trim_matches(|c: char| c == '-' || c.is_whitespace()));

    if value.is_empty() || value.chars().count() > MAX_COLOR_LEN {
        return None;
    }

    Some(lookup_color(&value).map(str::to_string).unwrap_or(value))
}

/// A capitalized word between the chassis label and the status label
fn color_between_labels(caps: &Captures<'_>) -> Option<String> {
    let candidate = collapse_whitespace(group(caps, 1)?);
    let length = candidate.chars().count();
    if !(2..=15).contains(&length) {
        return None;
    }

    let folded = fold_diacritics(&candidate);
    let names_brand = folded
        .split_whitespace()
        .any(|word| KNOWN_BRANDS.contains(&word));
    if names_brand || PLATE_ONLY.is_match(&candidate) {
        return None;
    }

    Some(lookup_color(&candidate).map(str::to_string).unwrap_or(candidate))
}

fn owner_name(caps: &Captures<'_>) -> Option<String> {
    let name = collapse_whitespace(group(caps, 1)?);
    let length = name.chars().count();
    if (5..50).contains(&length) && !name.chars().any(|c| c.is_numeric()) {
        Some(name)
    } else {
        None
    }
}

fn address(caps: &Captures<'_>) -> Option<String> {
    let address = collapse_whitespace(group(caps, 1)?);
    let only_digits = address.chars().all(|c| c.is_ascii_digit() || c == ' ');
    if address.chars().count() > 10 && !only_digits {
        Some(address)
    } else {
        None
    }
}

/// Zero-padded `DD/MM/YYYY`, only for real calendar dates
fn date(caps: &Captures<'_>) -> Option<String> {
    let day: u32 = group(caps, 1)?.parse().ok()?;
    let month: u32 = group(caps, 2)?.parse().ok()?;
    let year: i32 = group(caps, 3)?.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.format("%d/%m/%Y").to_string())
}
