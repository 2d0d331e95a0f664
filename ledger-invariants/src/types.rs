//! Core types for the invariant engine
//!
//! All types are designed for:
//! - Deterministic serialization (amounts as decimal strings)
//! - Exact 256-bit arithmetic, matching the modeled contracts
//! - Signed views over unsigned storage (deltas, drift)

use crate::{Error, Result};
use ruint::aliases::{U256, U512};
use ruint::Uint;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Token amount (uint256)
pub type Amount = U256;

/// EVM zero address, the default disallowed recipient
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

const WEI_PER_GWEI: u64 = 1_000_000_000;
const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// Account identifier (address, signer label, etc.)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The zero address sentinel
    pub fn zero() -> Self {
        Self::new(ZERO_ADDRESS)
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the zero address (case-insensitive)
    pub fn is_zero(&self) -> bool {
        self.0.eq_ignore_ascii_case(ZERO_ADDRESS)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Arithmetic discipline for a whole scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticMode {
    /// Reject overflow/underflow (Solidity >= 0.8, SafeMath)
    #[default]
    Checked,
    /// Wrap modulo 2^256 (Solidity < 0.8, `unchecked` blocks)
    Wrapping,
}

impl ArithmeticMode {
    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            ArithmeticMode::Checked => "checked",
            ArithmeticMode::Wrapping => "wrapping",
        }
    }

}

impl FromStr for ArithmeticMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "checked" => Ok(ArithmeticMode::Checked),
            "wrapping" => Ok(ArithmeticMode::Wrapping),
            other => Err(Error::Parse(format!("unknown arithmetic mode: {:?}", other))),
        }
    }
}

impl fmt::Display for ArithmeticMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parse an unsigned integer literal.
///
/// Accepts decimal (`1000`, `1_000`), hex (`0x3e8`) and an optional unit
/// suffix (`wei`, `gwei`, `ether`), so scenario files can mirror the
/// `parseEther` amounts of the contracts they model.
pub fn parse_uint<const BITS: usize, const LIMBS: usize>(src: &str) -> Result<Uint<BITS, LIMBS>> {
    let trimmed = src.trim();
    let (number, multiplier) = if let Some(n) = trimmed.strip_suffix("gwei") {
        (n, WEI_PER_GWEI)
    } else if let Some(n) = trimmed.strip_suffix("ether") {
        (n, WEI_PER_ETHER)
    } else if let Some(n) = trimmed.strip_suffix("wei") {
        (n, 1)
    } else {
        (trimmed, 1)
    };

    let digits: String = number.trim().chars().filter(|c| *c != '_').collect();
    if digits.is_empty() {
        return Err(Error::Parse(format!("empty amount: {:?}", src)));
    }

    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some("") => return Err(Error::Parse(format!("empty hex amount: {:?}", src))),
        Some(hex) => Uint::<BITS, LIMBS>::from_str_radix(hex, 16),
        None => Uint::<BITS, LIMBS>::from_str_radix(&digits, 10),
    }
    .map_err(|e| Error::Parse(format!("invalid amount {:?}: {}", src, e)))?;

    value
        .checked_mul(Uint::from(multiplier))
        .ok_or_else(|| Error::Parse(format!("amount {:?} exceeds {} bits", src, BITS)))
}

/// Parse an [`Amount`]
pub fn parse_amount(src: &str) -> Result<Amount> {
    parse_uint::<256, 4>(src)
}

/// Serde adapter: amounts as decimal strings, accepting strings or integers.
pub mod amount_serde {
    use super::parse_uint;
    use ruint::Uint;
    use serde::{de, Deserializer, Serializer};
    use std::fmt;

    /// Serialize as a decimal string
    pub fn serialize<const BITS: usize, const LIMBS: usize, S>(
        value: &Uint<BITS, LIMBS>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    /// Deserialize from a string or a non-negative integer
    pub fn deserialize<'de, const BITS: usize, const LIMBS: usize, D>(
        deserializer: D,
    ) -> Result<Uint<BITS, LIMBS>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(UintVisitor::<BITS, LIMBS>)
    }

    struct UintVisitor<const BITS: usize, const LIMBS: usize>;

    impl<'de, const BITS: usize, const LIMBS: usize> de::Visitor<'de> for UintVisitor<BITS, LIMBS> {
        type Value = Uint<BITS, LIMBS>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a non-negative integer or an amount string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Uint::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v)
                .map(Uint::from)
                .map_err(|_| E::custom(format!("negative amount: {}", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            parse_uint(v).map_err(E::custom)
        }
    }

    /// Same encoding for `Option<Amount>`; pair with `default` and
    /// `skip_serializing_if = "Option::is_none"`.
    pub mod option {
        use crate::types::Amount;
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize `Some` as a decimal string
        pub fn serialize<S>(value: &Option<Amount>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(v) => serializer.collect_str(v),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize an optional amount
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Amount>, D::Error>
        where
            D: Deserializer<'de>,
        {
            #[derive(Deserialize)]
            #[serde(transparent)]
            struct Wrapped(#[serde(with = "crate::types::amount_serde")] Amount);

            Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(v)| v))
        }
    }
}

/// Signed view over an unsigned magnitude.
///
/// Zero is always stored as non-negative, so `+0` and `-0` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signed<const BITS: usize, const LIMBS: usize> {
    negative: bool,
    magnitude: Uint<BITS, LIMBS>,
}

/// Signed 256-bit quantity used for balance and aggregate deltas
pub type SignedAmount = Signed<256, 4>;

/// Signed 512-bit drift: `aggregate - Σ balances`.
///
/// 512 bits so the participant sum can exceed 2^256 - 1 without wrapping.
pub type Drift = Signed<512, 8>;

impl<const BITS: usize, const LIMBS: usize> Signed<BITS, LIMBS> {
    /// Zero
    pub const ZERO: Self = Self {
        negative: false,
        magnitude: Uint::ZERO,
    };

    /// Positive quantity
    pub fn positive(magnitude: Uint<BITS, LIMBS>) -> Self {
        Self {
            negative: false,
            magnitude,
        }
    }

    /// Negative quantity
    pub fn negative(magnitude: Uint<BITS, LIMBS>) -> Self {
        Self {
            negative: !magnitude.is_zero(),
            magnitude,
        }
    }

    /// Signed difference `after - before`
    pub fn between(before: Uint<BITS, LIMBS>, after: Uint<BITS, LIMBS>) -> Self {
        if after >= before {
            Self::positive(after - before)
        } else {
            Self::negative(before - after)
        }
    }

    /// Absolute value
    pub fn magnitude(&self) -> Uint<BITS, LIMBS> {
        self.magnitude
    }

    /// True for zero
    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    /// True for strictly negative values
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// True for strictly positive values
    pub fn is_positive(&self) -> bool {
        !self.negative && !self.magnitude.is_zero()
    }
}

impl Drift {
    /// Drift of an aggregate against a (wide) participant sum
    pub fn measure(aggregate: Amount, actual_sum: U512) -> Self {
        Self::between(actual_sum, U512::from(aggregate))
    }

    /// Aggregate overstates the balances by `amount` (ghost deposits, unburned fees)
    pub fn surplus(amount: Amount) -> Self {
        Self::positive(U512::from(amount))
    }

    /// Aggregate understates the balances by `amount` (phantom credit)
    pub fn deficit(amount: Amount) -> Self {
        Self::negative(U512::from(amount))
    }

    /// Magnitude clamped to `u64`, for gauges and log fields
    pub fn saturating_magnitude_u64(&self) -> u64 {
        if self.magnitude.bit_len() <= 64 {
            self.magnitude.as_limbs()[0]
        } else {
            u64::MAX
        }
    }
}

impl<const BITS: usize, const LIMBS: usize> Default for Signed<BITS, LIMBS> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const BITS: usize, const LIMBS: usize> fmt::Display for Signed<BITS, LIMBS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "0")
        } else if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "+{}", self.magnitude)
        }
    }
}

impl<const BITS: usize, const LIMBS: usize> FromStr for Signed<BITS, LIMBS> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('-') {
            Ok(Self::negative(parse_uint(rest)?))
        } else {
            Ok(Self::positive(parse_uint(s.strip_prefix('+').unwrap_or(s))?))
        }
    }
}

impl<const BITS: usize, const LIMBS: usize> Serialize for Signed<BITS, LIMBS> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, const BITS: usize, const LIMBS: usize> Deserialize<'de> for Signed<BITS, LIMBS> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
