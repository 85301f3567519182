//! Human-readable price report
//!
//! Renders a [`PriceSnapshot`] as the Markdown message the chat front end
//! sends. Pure functions only; the aggregator decides when to call them.

use crate::types::{PriceSnapshot, QuoteSource};
use chrono::{DateTime, Utc};

/// Message shown when no price data is available at all
pub const UNAVAILABLE_MESSAGE: &str = "❌ Failed to fetch cryptocurrency prices";

/// Decimal places shown for prices below one unit
const SMALL_PRICE_DECIMALS: usize = 6;

/// Significant digits kept for very small prices
const SMALL_PRICE_SIGNIFICANT_DIGITS: i32 = 3;

/// Upper bound on decimals for very small prices
const MAX_PRICE_DECIMALS: usize = 12;

/// Direction of the 24h change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Flat,
    Down,
}

impl Trend {
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            Trend::Up
        } else if change < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    pub fn indicator(&self) -> &'static str {
        match self {
            Trend::Up => "📈",
            Trend::Flat => "➡️",
            Trend::Down => "📉",
        }
    }
}

/// Formats a USD price
///
/// `65432.1` renders as `$65,432.10`; `0.0000123` as `$0.0000123`.
pub fn format_price(price: f64) -> String {
    if price >= 1.0 {
        let fixed = format!("{:.2}", price);
        let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
        return format!("${}.{}", group_thousands(whole), fraction);
    }

    let decimals = small_price_decimals(price);
    let fixed = format!("{:.*}", decimals, price);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("${}", trimmed)
}

/// Decimals needed to keep a few significant digits of a sub-unit price
fn small_price_decimals(price: f64) -> usize {
    if price <= 0.0 || !price.is_finite() {
        return SMALL_PRICE_DECIMALS;
    }

    // Position of the first significant digit after the decimal point
    let leading = (-price.log10()).floor() as i32 + 1;
    let needed = (leading + SMALL_PRICE_SIGNIFICANT_DIGITS - 1).max(0) as usize;
    needed.clamp(SMALL_PRICE_DECIMALS, MAX_PRICE_DECIMALS)
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped)
}

/// Formats a 24h change percentage with an explicit sign
pub fn format_change(change: f64) -> String {
    match Trend::from_change(change) {
        Trend::Up => format!("+{:.2}%", change),
        Trend::Down => format!("{:.2}%", change),
        Trend::Flat => "0.00%".to_string(),
    }
}

/// Label naming the provider(s) behind a snapshot
pub fn source_label(snapshot: &PriceSnapshot) -> String {
    match snapshot.dominant_source() {
        None => "Unknown".to_string(),
        Some(dominant) if snapshot.is_mixed() => {
            let others: Vec<&str> = snapshot
                .sources()
                .into_iter()
                .filter(|s| *s != dominant)
                .map(|s: QuoteSource| s.label())
                .collect();
            format!("{} (partly {})", dominant.label(), others.join(", "))
        }
        Some(dominant) => dominant.label().to_string(),
    }
}

/// Renders the full report for a non-empty snapshot
///
/// `updated_at` is the time shown in the footer.
pub fn format_report(snapshot: &PriceSnapshot, updated_at: DateTime<Utc>) -> String {
    let mut lines = vec!["📊 **Cryptocurrency prices:**".to_string(), String::new()];

    for (asset, quote) in snapshot.iter() {
        lines.push(format!(
            "{} **{}:** {} ({})",
            Trend::from_change(quote.change_24h).indicator(),
            asset.symbol(),
            format_price(quote.price),
            format_change(quote.change_24h)
        ));
    }

    lines.push(String::new());
    lines.push(format!("_Updated: {} UTC_", updated_at.format("%H:%M:%S")));
    lines.push(format!("_Source: {}_", source_label(snapshot)));

    lines.join("\n")
}

/// Renders the report, or [`UNAVAILABLE_MESSAGE`] when no prices are known
///
/// The footer shows the snapshot's capture time.
pub fn report_or_unavailable(snapshot: &PriceSnapshot) -> String {
    if snapshot.is_empty() {
        return UNAVAILABLE_MESSAGE.to_string();
    }

    format_report(snapshot, snapshot.captured_at())
}
