//! Display-currency configuration and price formatting.
//!
//! Every product price is stored in one canonical reference currency.
//! A [`CurrencyConfig`] (loaded from the catalog's `currency-settings`
//! collection) carries the multiplier and display rules for one
//! selectable currency; formatting converts and renders in one step and
//! is a pure function of its inputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Display configuration for one selectable currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyConfig {
    /// ISO 4217 currency code (e.g. "PHP", "USD").
    pub code: String,
    /// Symbol prefixed to formatted amounts (e.g. "₱").
    pub symbol: String,
    /// Human-readable name shown in the currency picker.
    pub label: String,
    /// Multiplier from the canonical currency into this one.
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    /// Marks the currency the storefront falls back to.
    #[serde(default)]
    pub is_default: bool,
    /// Fractional digits to render.
    pub precision: u32,
}

/// Number-formatting locale, keyed by currency code.
///
/// Two buckets are recognized: PHP renders in the PH-English locale and
/// every other currency in generic English. Both group thousands with
/// commas and use a dot radix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Locale {
    EnPh,
    EnUs,
}

impl Locale {
    fn for_code(code: &str) -> Self {
        if code == "PHP" { Self::EnPh } else { Self::EnUs }
    }

    const fn group_separator(self) -> char {
        match self {
            Self::EnPh | Self::EnUs => ',',
        }
    }

    const fn radix(self) -> char {
        match self {
            Self::EnPh | Self::EnUs => '.',
        }
    }
}

impl CurrencyConfig {
    /// Convert a canonical amount into this currency, rounded to the
    /// display precision.
    #[must_use]
    pub fn convert(&self, canonical: Decimal) -> Decimal {
        (canonical * self.rate).round_dp(self.precision)
    }

    /// Format a canonical amount as a display string in this currency.
    ///
    /// `format(100, {rate: 58.5, code: "PHP", symbol: "₱"})` renders
    /// `"₱5,850.00"`. Identical inputs always produce identical output.
    #[must_use]
    pub fn format(&self, canonical: Decimal) -> String {
        let locale = Locale::for_code(&self.code);
        let converted = self.convert(canonical);
        format!("{}{}", self.symbol, render(converted, self.precision, locale))
    }
}

/// Render a rounded decimal with grouped thousands and a fixed number of
/// fractional digits.
fn render(value: Decimal, precision: u32, locale: Locale) -> String {
    let negative = value.is_sign_negative() && !value.is_zero();
    let text = value.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut out = String::with_capacity(text.len() + 4);
    if negative {
        out.push('-');
    }

    let digits = int_part.len();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            out.push(locale.group_separator());
        }
        out.push(c);
    }

    if precision > 0 {
        out.push(locale.radix());
        out.push_str(frac_part);
        for _ in frac_part.len()..precision as usize {
            out.push('0');
        }
    }

    out
}
