//! Built-in formatter catalog
//!
//! Faker-compatible camelCase method names backed by the `fake` crate for
//! localized data, and by `rand`/`chrono`/`uuid` for numbers, dates and
//! identifiers. Arguments follow the positional order of the classic Faker
//! signatures, e.g. `numberBetween(min, max)` or `date(format, max)`.

use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::domain::errors::GeneratorError;
use crate::domain::value::Value;
use crate::generator::locale::localized;
use crate::generator::registry::{Call, FormatterRegistry};

/// Longest password `password(min, max)` may ask for
pub const MAX_PASSWORD_LENGTH: i64 = 256;

/// Longest text `text(max)` may ask for
pub const MAX_TEXT_LENGTH: i64 = 65_535;

/// Most words, sentences or paragraphs one call may ask for
pub const MAX_COUNT: i64 = 1_000;

/// Registers every built-in formatter
pub fn register_builtins(registry: &mut FormatterRegistry) {
    register_person(registry);
    register_internet(registry);
    register_phone(registry);
    register_address(registry);
    register_company(registry);
    register_text(registry);
    register_numbers(registry);
    register_misc(registry);
}

fn text(value: String) -> Result<Value, GeneratorError> {
    Ok(Value::Text(value))
}

fn register_person(registry: &mut FormatterRegistry) {
    // Faker accepts an optional gender argument; the data here is not gendered
    registry.register("name", |rng, call| {
        call.at_most(1)?;
        text(localized!(call.locale, rng, name::Name))
    });
    registry.register("firstName", |rng, call| {
        call.at_most(1)?;
        text(localized!(call.locale, rng, name::FirstName))
    });
    registry.register("lastName", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, name::LastName))
    });
    registry.register("title", |rng, call| {
        call.at_most(1)?;
        text(localized!(call.locale, rng, name::Title))
    });
}

fn domain_name(rng: &mut StdRng, call: &Call<'_>) -> String {
    // Always ASCII, whatever the locale
    let word: String = localized!(crate::generator::locale::Locale::EnUs, rng, lorem::Word);
    let suffix = localized!(call.locale, rng, internet::DomainSuffix);
    let word: String = word.chars().filter(char::is_ascii_alphanumeric).collect();
    format!("{}.{}", word.to_ascii_lowercase(), suffix)
}

fn register_internet(registry: &mut FormatterRegistry) {
    registry.register("email", |rng, call| {
        call.at_most(0)?;
        let user = localized!(crate::generator::locale::Locale::EnUs, rng, internet::Username);
        let domain = domain_name(rng, call);
        text(format!("{user}@{domain}"))
    });
    registry.register("safeEmail", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, internet::SafeEmail))
    });
    registry.register("freeEmail", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, internet::FreeEmail))
    });
    registry.register("userName", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, internet::Username))
    });
    registry.register("password", |rng, call| {
        call.at_most(2)?;
        let min = call.int_or(0, 6)?;
        let max = call.int_or(1, 20)?;
        if min < 1 || max < min || max > MAX_PASSWORD_LENGTH {
            return Err(GeneratorError::invalid_args(
                call.name,
                format!("invalid length range {min}..{max}, lengths run 1..{MAX_PASSWORD_LENGTH}"),
            ));
        }
        let range = (min as usize)..(max as usize + 1);
        text(localized!(call.locale, rng, internet::Password, range))
    });
    registry.register("domainName", |rng, call| {
        call.at_most(0)?;
        text(domain_name(rng, call))
    });
    registry.register("ipv4", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, internet::IPv4))
    });
    registry.register("ipv6", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, internet::IPv6))
    });
    registry.register("macAddress", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, internet::MACAddress))
    });
    registry.register("userAgent", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, internet::UserAgent))
    });
}

fn register_phone(registry: &mut FormatterRegistry) {
    registry.register("phoneNumber", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, phone_number::PhoneNumber))
    });
    registry.register("cellNumber", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, phone_number::CellNumber))
    });
}

fn street_address(rng: &mut StdRng, call: &Call<'_>) -> String {
    let number = localized!(call.locale, rng, address::BuildingNumber);
    let street = localized!(call.locale, rng, address::StreetName);
    format!("{number} {street}")
}

fn register_address(registry: &mut FormatterRegistry) {
    registry.register("address", |rng, call| {
        call.at_most(0)?;
        let street = street_address(rng, call);
        let city = localized!(call.locale, rng, address::CityName);
        let state = localized!(call.locale, rng, address::StateAbbr);
        let postcode = localized!(call.locale, rng, address::PostCode);
        text(format!("{street}\n{city}, {state} {postcode}"))
    });
    registry.register("streetAddress", |rng, call| {
        call.at_most(1)?;
        text(street_address(rng, call))
    });
    registry.register("streetName", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, address::StreetName))
    });
    registry.register("buildingNumber", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, address::BuildingNumber))
    });
    registry.register("secondaryAddress", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, address::SecondaryAddress))
    });
    registry.register("city", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, address::CityName))
    });
    registry.register("postcode", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, address::PostCode))
    });
    registry.register("state", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, address::StateName))
    });
    registry.register("stateAbbr", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, address::StateAbbr))
    });
    registry.register("country", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, address::CountryName))
    });
    registry.register("countryCode", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, address::CountryCode))
    });
    registry.register("latitude", |rng, call| coordinate(rng, call, 90.0));
    registry.register("longitude", |rng, call| coordinate(rng, call, 180.0));
}

fn coordinate(rng: &mut StdRng, call: &Call<'_>, bound: f64) -> Result<Value, GeneratorError> {
    call.at_most(2)?;
    let min = call.float_opt(0)?.unwrap_or(-bound);
    let max = call.float_opt(1)?.unwrap_or(bound);
    if min > max || min < -bound || max > bound {
        return Err(GeneratorError::invalid_args(
            call.name,
            format!("range must lie within -{bound}..{bound}"),
        ));
    }
    Ok(Value::Float(round_to(rng.random_range(min..=max), 6)))
}

fn register_company(registry: &mut FormatterRegistry) {
    registry.register("company", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, company::CompanyName))
    });
    registry.register("companySuffix", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, company::CompanySuffix))
    });
    registry.register("jobTitle", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, job::Title))
    });
}

/// Count argument in `1..=MAX_COUNT`
fn positive(call: &Call<'_>, idx: usize, default: i64) -> Result<usize, GeneratorError> {
    let n = call.int_or(idx, default)?;
    if !(1..=MAX_COUNT).contains(&n) {
        return Err(GeneratorError::invalid_args(
            call.name,
            format!("argument {} must be between 1 and {MAX_COUNT}", idx + 1),
        ));
    }
    Ok(n as usize)
}

fn register_text(registry: &mut FormatterRegistry) {
    registry.register("word", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, lorem::Word))
    });
    registry.register("words", |rng, call| {
        call.at_most(2)?;
        let n = positive(call, 0, 3)?;
        let words = localized!(call.locale, rng, as Vec<String>, lorem::Words, n..n + 1);
        text(words.join(" "))
    });
    registry.register("sentence", |rng, call| {
        call.at_most(2)?;
        let n = positive(call, 0, 6)?;
        let variable = call.bool_or(1, true)?;
        let upper = if variable { n + n * 2 / 5 + 1 } else { n + 1 };
        let lower = if variable { (n - n * 2 / 5).max(1) } else { n };
        text(localized!(call.locale, rng, lorem::Sentence, lower..upper))
    });
    registry.register("paragraph", |rng, call| {
        call.at_most(2)?;
        let n = positive(call, 0, 3)?;
        text(localized!(call.locale, rng, lorem::Paragraph, n..n + 1))
    });
    registry.register("text", |rng, call| {
        call.at_most(1)?;
        let max = call.int_or(0, 200)?;
        if max < 5 {
            return Err(GeneratorError::invalid_args(
                call.name,
                "text() can only generate text of at least 5 characters",
            ));
        }
        if max > MAX_TEXT_LENGTH {
            return Err(GeneratorError::invalid_args(
                call.name,
                format!("text() can generate at most {MAX_TEXT_LENGTH} characters"),
            ));
        }
        let max = max as usize;
        let mut out = String::new();
        let mut chars = 0;
        while chars < max {
            let sentence: String = localized!(call.locale, rng, lorem::Sentence, 4..10);
            if !out.is_empty() {
                out.push(' ');
                chars += 1;
            }
            chars += sentence.chars().count();
            out.push_str(&sentence);
        }
        text(truncate_words(&out, max))
    });
}

/// Cuts `s` to at most `max` characters on a word boundary
fn truncate_words(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max).collect();
    let trimmed = match cut.rfind(' ') {
        Some(pos) if pos > 0 => cut[..pos].to_string(),
        _ => cut,
    };
    let mut trimmed = trimmed.trim_end_matches([',', ';', ' ']).to_string();
    if !trimmed.ends_with('.') && trimmed.chars().count() < max {
        trimmed.push('.');
    }
    trimmed
}

fn round_to(v: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (v * factor).round() / factor
}

fn register_numbers(registry: &mut FormatterRegistry) {
    registry.register("randomDigit", |rng, call| {
        call.at_most(0)?;
        Ok(Value::Int(rng.random_range(0..=9)))
    });
    registry.register("randomNumber", |rng, call| {
        call.at_most(2)?;
        let digits = match call.int_opt(0)? {
            Some(d) => d,
            None => rng.random_range(1..=9),
        };
        if !(1..=18).contains(&digits) {
            return Err(GeneratorError::invalid_args(
                call.name,
                "number of digits must be between 1 and 18",
            ));
        }
        let strict = call.bool_or(1, false)?;
        let max = 10i64.pow(digits as u32) - 1;
        let min = if strict { 10i64.pow(digits as u32 - 1) } else { 0 };
        Ok(Value::Int(rng.random_range(min..=max)))
    });
    registry.register("numberBetween", |rng, call| {
        call.at_most(2)?;
        let a = call.int_or(0, 0)?;
        let b = call.int_or(1, i64::from(i32::MAX))?;
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        Ok(Value::Int(rng.random_range(min..=max)))
    });
    registry.register("randomFloat", |rng, call| {
        call.at_most(3)?;
        let decimals = match call.int_opt(0)? {
            Some(d) if (0..=10).contains(&d) => d as u32,
            Some(_) => {
                return Err(GeneratorError::invalid_args(
                    call.name,
                    "decimals must be between 0 and 10",
                ))
            }
            None => rng.random_range(0..=4),
        };
        let min = call.float_opt(1)?.unwrap_or(0.0);
        let max = match call.float_opt(2)? {
            Some(max) => max,
            None => min + rng.random_range(0..=9_999_999) as f64,
        };
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        if !(max - min).is_finite() {
            return Err(GeneratorError::invalid_args(call.name, "range is too wide"));
        }
        Ok(Value::Float(round_to(rng.random_range(min..=max), decimals)))
    });
    registry.register("boolean", |rng, call| {
        call.at_most(1)?;
        let chance = call.int_or(0, 50)?;
        if !(0..=100).contains(&chance) {
            return Err(GeneratorError::invalid_args(
                call.name,
                "chance must be between 0 and 100",
            ));
        }
        Ok(Value::Bool(rng.random_range(1..=100) <= chance))
    });
}

fn register_misc(registry: &mut FormatterRegistry) {
    registry.register("uuid", |rng, call| {
        call.at_most(0)?;
        let bytes: [u8; 16] = rng.random();
        text(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
    });
    registry.register("creditCardNumber", |rng, call| {
        call.at_most(0)?;
        text(localized!(call.locale, rng, creditcard::CreditCardNumber))
    });
    registry.register("date", |rng, call| {
        call.at_most(2)?;
        let format = call.str_or(0, "Y-m-d")?;
        let max = upper_bound(call, 1)?;
        let moment = random_moment(rng, max);
        text(moment.format(&php_date_format(format)).to_string())
    });
    registry.register("dateTime", |rng, call| {
        call.at_most(1)?;
        let max = upper_bound(call, 0)?;
        let moment = random_moment(rng, max);
        text(moment.format("%Y-%m-%d %H:%M:%S").to_string())
    });
    registry.register("numerify", |rng, call| {
        call.at_most(1)?;
        let pattern = call.str_or(0, "###")?;
        text(replace_placeholders(rng, pattern, true, false))
    });
    registry.register("lexify", |rng, call| {
        call.at_most(1)?;
        let pattern = call.str_or(0, "????")?;
        text(replace_placeholders(rng, pattern, false, true))
    });
    registry.register("bothify", |rng, call| {
        call.at_most(1)?;
        let pattern = call.str_or(0, "## ??")?;
        text(replace_placeholders(rng, pattern, true, true))
    });
    registry.register("randomElement", |rng, call| {
        let default = [Value::from("a"), Value::from("b"), Value::from("c")];
        let choices: &[Value] = match call.args {
            [] => &default,
            [Value::List(items)] => items,
            [Value::List(_), ..] => {
                return Err(GeneratorError::invalid_args(
                    call.name,
                    "expected a single list of choices",
                ))
            }
            scalars => scalars,
        };
        Ok(choices.choose(rng).cloned().unwrap_or(Value::Null))
    });
}

/// Latest moment a date formatter may produce (`"now"` or a `YYYY-MM-DD` date)
fn upper_bound(call: &Call<'_>, idx: usize) -> Result<i64, GeneratorError> {
    let now = Utc::now().timestamp();
    match call.str_or(idx, "now")? {
        "now" => Ok(now),
        raw => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc().timestamp())
            .filter(|ts| *ts >= 0)
            .ok_or_else(|| {
                GeneratorError::invalid_args(call.name, format!("cannot parse max date '{raw}'"))
            }),
    }
}

fn random_moment(rng: &mut StdRng, max_timestamp: i64) -> DateTime<Utc> {
    let ts = rng.random_range(0..=max_timestamp.max(0));
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

/// Translates a PHP `date()` format string into a chrono format string
///
/// Unsupported letters are emitted literally; `\` escapes the next character.
pub fn php_date_format(format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        let mapped = match c {
            'Y' => "%Y",
            'y' => "%y",
            'm' => "%m",
            'n' => "%-m",
            'd' => "%d",
            'j' => "%-d",
            'H' => "%H",
            'G' => "%-H",
            'h' => "%I",
            'g' => "%-I",
            'i' => "%M",
            's' => "%S",
            'A' => "%p",
            'a' => "%P",
            'D' => "%a",
            'l' => "%A",
            'M' => "%b",
            'F' => "%B",
            'N' => "%u",
            'w' => "%w",
            'U' => "%s",
            'c' => "%Y-%m-%dT%H:%M:%S%:z",
            '\\' => {
                if let Some(next) = chars.next() {
                    push_literal(&mut out, next);
                }
                continue;
            }
            other => {
                push_literal(&mut out, other);
                continue;
            }
        };
        out.push_str(mapped);
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// `#` → digit, `%` → non-zero digit, `?` → lowercase letter, `*` → either
fn replace_placeholders(rng: &mut StdRng, pattern: &str, digits: bool, letters: bool) -> String {
    pattern
        .chars()
        .map(|c| match c {
            '#' if digits => char::from(b'0' + rng.random_range(0..10u8)),
            '%' if digits => char::from(b'1' + rng.random_range(0..9u8)),
            '?' if letters => char::from(b'a' + rng.random_range(0..26u8)),
            '*' if digits && letters => {
                if rng.random_bool(0.5) {
                    char::from(b'0' + rng.random_range(0..10u8))
                } else {
                    char::from(b'a' + rng.random_range(0..26u8))
                }
            }
            other => other,
        })
        .collect()
}
