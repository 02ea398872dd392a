// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decimal amount handling.
//!
//! Token amounts travel as base-unit integers (`U256`) plus a decimals count.
//! USD values are fixed-point with [`USD_DECIMALS`] decimals so that sums are
//! exact and `total == sum(entries)` holds bit for bit.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::UaError;

/// Decimals of [`UsdValue`] (micro-dollars).
pub const USD_DECIMALS: u8 = 6;

/// Decimals used when parsing unit prices, so sub-cent prices keep precision.
pub const PRICE_DECIMALS: u8 = 18;

/// Parse a human-readable amount to base units.
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals (18 for ETH, 6 for USDC)
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, UaError> {
    let amount = amount.trim();
    let parts: Vec<&str> = amount.split('.').collect();

    if parts.len() > 2 {
        return Err(UaError::InvalidAmount(format!(
            "`{amount}` has more than one decimal point"
        )));
    }

    let whole_str = parts[0];
    let frac_str = parts.get(1).copied().unwrap_or("");

    if whole_str.is_empty() && frac_str.is_empty() {
        return Err(UaError::InvalidAmount("empty amount".to_string()));
    }
    if !whole_str.chars().all(|c| c.is_ascii_digit())
        || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(UaError::InvalidAmount(format!("`{amount}` is not a decimal number")));
    }
    if frac_str.len() > decimals as usize {
        return Err(UaError::InvalidAmount(format!(
            "too many decimal places (max {decimals})"
        )));
    }

    let whole = if whole_str.is_empty() {
        U256::ZERO
    } else {
        U256::from_str(whole_str)
            .map_err(|_| UaError::InvalidAmount(format!("`{amount}` is out of range")))?
    };

    // Pad with zeros to match decimals
    let padded = format!("{:0<width$}", frac_str, width = decimals as usize);
    let fraction = if padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str(&padded)
            .map_err(|_| UaError::InvalidAmount(format!("`{amount}` has an invalid fraction")))?
    };

    let multiplier = U256::from(10u64).pow(U256::from(decimals));
    whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| UaError::InvalidAmount("amount overflow".to_string()))
}

/// Parse an amount that must be strictly greater than zero.
pub fn parse_positive_amount(amount: &str, decimals: u8) -> Result<U256, UaError> {
    let value = parse_amount(amount, decimals)?;
    if value.is_zero() {
        return Err(UaError::InvalidAmount(format!("`{}` is not positive", amount.trim())));
    }
    Ok(value)
}

/// Format base units to a human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}

/// USD value in micro-dollars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UsdValue(U256);

impl UsdValue {
    pub const ZERO: UsdValue = UsdValue(U256::ZERO);

    pub fn from_micros(micros: u128) -> Self {
        UsdValue(U256::from(micros))
    }

    pub fn micros(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a dollar string such as `"12.34"`.
    pub fn parse(value: &str) -> Result<Self, UaError> {
        parse_amount(value, USD_DECIMALS).map(UsdValue)
    }

    /// Value of `amount` base units of a token with `decimals`, priced at
    /// `price` (scaled by [`PRICE_DECIMALS`]). Truncates toward zero.
    ///
    /// Returns `None` on overflow.
    pub fn of_tokens(amount: U256, decimals: u8, price: U256) -> Option<Self> {
        let scale_exp = u32::from(decimals) + u32::from(PRICE_DECIMALS - USD_DECIMALS);
        let scale = U256::from(10u64).checked_pow(U256::from(scale_exp))?;
        let product = amount.checked_mul(price)?;
        Some(UsdValue(product / scale))
    }

    pub fn checked_add(self, other: UsdValue) -> Option<UsdValue> {
        self.0.checked_add(other.0).map(UsdValue)
    }
}

impl fmt::Display for UsdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_amount(self.0, USD_DECIMALS))
    }
}

impl Serialize for UsdValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for UsdValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        UsdValue::parse(&raw).map_err(serde::de::Error::custom)
    }
}
