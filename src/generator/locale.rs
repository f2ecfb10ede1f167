use std::fmt;

/// Locales with localized generator data
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    EnUs,
    FrFr,
    PtBr,
    ZhCn,
    JaJp,
}

impl Locale {
    pub const ALL: &'static [Locale] = &[
        Locale::EnUs,
        Locale::FrFr,
        Locale::PtBr,
        Locale::ZhCn,
        Locale::JaJp,
    ];

    /// Parses `en_US` style identifiers; `en-us` and other casings are accepted
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().replace('-', "_").to_ascii_lowercase().as_str() {
            "en_us" | "en" => Some(Self::EnUs),
            "fr_fr" | "fr" => Some(Self::FrFr),
            "pt_br" => Some(Self::PtBr),
            "zh_cn" => Some(Self::ZhCn),
            "ja_jp" | "ja" => Some(Self::JaJp),
            _ => None,
        }
    }

    /// Like [`Locale::parse`], falling back to `en_US` with a warning
    pub fn resolve(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            tracing::warn!(
                locale = %value,
                fallback = %Self::EnUs,
                "Unsupported locale, falling back"
            );
            Self::EnUs
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en_US",
            Self::FrFr => "fr_FR",
            Self::PtBr => "pt_BR",
            Self::ZhCn => "zh_CN",
            Self::JaJp => "ja_JP",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs a `fake` raw faker with the locale data matching `$locale`
///
/// `localized!(locale, rng, name::FirstName)` expands to a match over
/// [`Locale`] calling `fake::faker::name::raw::FirstName(<data>)`. Extra
/// arguments are forwarded after the locale data. The output is a `String`
/// unless another type is named with `as <type>`.
macro_rules! localized {
    ($locale:expr, $rng:expr, as $ty:ty, $module:ident :: $faker:ident $(, $arg:expr)*) => {{
        use fake::Fake;
        let value: $ty = match $locale {
            $crate::generator::locale::Locale::EnUs => {
                fake::faker::$module::raw::$faker(fake::locales::EN $(, $arg)*).fake_with_rng($rng)
            }
            $crate::generator::locale::Locale::FrFr => {
                fake::faker::$module::raw::$faker(fake::locales::FR_FR $(, $arg)*).fake_with_rng($rng)
            }
            $crate::generator::locale::Locale::PtBr => {
                fake::faker::$module::raw::$faker(fake::locales::PT_BR $(, $arg)*).fake_with_rng($rng)
            }
            $crate::generator::locale::Locale::ZhCn => {
                fake::faker::$module::raw::$faker(fake::locales::ZH_CN $(, $arg)*).fake_with_rng($rng)
            }
            $crate::generator::locale::Locale::JaJp => {
                fake::faker::$module::raw::$faker(fake::locales::JA_JP $(, $arg)*).fake_with_rng($rng)
            }
        };
        value
    }};
    ($locale:expr, $rng:expr, $module:ident :: $faker:ident $(, $arg:expr)*) => {
        $crate::generator::locale::localized!($locale, $rng, as String, $module::$faker $(, $arg)*)
    };
}

pub(crate) use localized;
