//! Barcode provider: `ean13`, `ean8`, `isbn10`, `isbn13`

use rand::rngs::StdRng;
use rand::Rng;

use crate::domain::value::Value;
use crate::generator::providers::GeneratorProvider;
use crate::generator::registry::FormatterRegistry;

/// Check-digit valid product and book numbers
#[derive(Debug, Clone, Copy, Default)]
pub struct BarcodeProvider;

impl GeneratorProvider for BarcodeProvider {
    fn id(&self) -> &'static str {
        "barcode"
    }

    fn register(&self, registry: &mut FormatterRegistry) {
        registry.register("ean13", |rng, call| {
            call.at_most(0)?;
            Ok(Value::Text(ean(rng, 13)))
        });
        registry.register("ean8", |rng, call| {
            call.at_most(0)?;
            Ok(Value::Text(ean(rng, 8)))
        });
        registry.register("isbn13", |rng, call| {
            call.at_most(0)?;
            let prefix = if rng.random_bool(0.5) { "978" } else { "979" };
            let mut digits = prefix.to_string();
            digits.push_str(&random_digits(rng, 9));
            let check = ean_check_digit(&digits);
            digits.push(check);
            Ok(Value::Text(digits))
        });
        registry.register("isbn10", |rng, call| {
            call.at_most(0)?;
            let mut digits = random_digits(rng, 9);
            let check = isbn10_check_digit(&digits);
            digits.push(check);
            Ok(Value::Text(digits))
        });
    }
}

fn random_digits(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

fn ean(rng: &mut StdRng, len: usize) -> String {
    let mut digits = random_digits(rng, len - 1);
    let check = ean_check_digit(&digits);
    digits.push(check);
    digits
}

/// GS1 check digit: weights 3,1,3,... from the rightmost payload digit
pub fn ean_check_digit(payload: &str) -> char {
    let sum: u32 = payload
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { d })
        .sum();
    char::from(b'0' + ((10 - sum % 10) % 10) as u8)
}

/// ISBN-10 check character (`X` stands for 10)
pub fn isbn10_check_digit(payload: &str) -> char {
    let sum: u32 = payload
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| d * (10 - i as u32))
        .sum();
    match (11 - sum % 11) % 11 {
        10 => 'X',
        d => char::from(b'0' + d as u8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::locale::Locale;
    use crate::generator::registry::Call;
    use rand::SeedableRng;

    #[test]
    fn test_known_check_digits() {
        // 4006381333931 and 73513537 are published sample codes
        assert_eq!(ean_check_digit("400638133393"), '1');
        assert_eq!(ean_check_digit("7351353"), '7');
        assert_eq!(ean_check_digit("978030640615"), '7');
        assert_eq!(isbn10_check_digit("030640615"), '2');
    }

    #[test]
    fn test_registered_methods() {
        let mut registry = FormatterRegistry::new();
        BarcodeProvider.register(&mut registry);
        let mut rng = StdRng::seed_from_u64(11);

        let ean13 = registry
            .invoke(&mut rng, &Call::new("ean13", Locale::EnUs, &[]))
            .unwrap();
        let ean13 = ean13.as_str().unwrap();
        assert_eq!(ean13.len(), 13);
        assert_eq!(ean_check_digit(&ean13[..12]), ean13.chars().last().unwrap());

        let isbn = registry
            .invoke(&mut rng, &Call::new("isbn13", Locale::EnUs, &[]))
            .unwrap();
        assert!(isbn.as_str().unwrap().starts_with("97"));

        assert_eq!(
            registry
                .invoke(&mut rng, &Call::new("ean8", Locale::EnUs, &[]))
                .unwrap()
                .as_str()
                .unwrap()
                .len(),
            8
        );
    }
}
