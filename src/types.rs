// 1.0: all the primitives live here. nothing in the ledger works without these types.
// markets, traders, order ids, block refs, sizes, prices, quote amounts.
// each is a newtype so the compiler catches type mixups.

use crate::precision::PrecisionError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollateralId(pub u32);

impl CollateralId {
    /// Settlement stablecoin, the collateral every trader deposits first.
    pub const HUSD: CollateralId = CollateralId(0);
}

pub type BlockNumber = u64;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseHexError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

// 1.1: fixed-width hex identifiers. rendered and serialized as 0x-prefixed strings
// so they work as json map keys in snapshots.
macro_rules! hex_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = ParseHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(raw)?;
                let arr: [u8; $len] = bytes.as_slice().try_into().map_err(|_| ParseHexError::Length {
                    expected: $len,
                    actual: bytes.len(),
                })?;
                Ok(Self(arr))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_bytes!(
    /// 20-byte trader account address.
    Address,
    20
);

hex_bytes!(
    /// Keccak-256 order hash. See `order::compute_order_id`.
    OrderId,
    32
);

hex_bytes!(BlockHash, 32);

/// A candidate block. Competing blocks at the same height differ by hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub number: BlockNumber,
    pub hash: BlockHash,
}

impl BlockRef {
    pub fn new(number: BlockNumber, hash: BlockHash) -> Self {
        Self { number, hash }
    }
}

// Long = profit when price goes up. Short = profit when price goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => dec!(1),
            Side::Short => dec!(-1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

// 1.2: signed size: positive = long, negative = short. core to all position math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SignedSize(Decimal);

impl SignedSize {
    pub fn new(size: Decimal) -> Self {
        Self(size)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_side(side: Side, abs_size: Decimal) -> Self {
        Self(side.sign() * abs_size.abs())
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn abs(&self) -> Decimal {
        self.0.abs()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_long(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn side(&self) -> Option<Side> {
        if self.is_long() {
            Some(Side::Long)
        } else if self.is_short() {
            Some(Side::Short)
        } else {
            None
        }
    }

    pub fn add(&self, delta: Decimal) -> Self {
        Self(self.0 + delta)
    }

    pub fn sub(&self, other: SignedSize) -> Self {
        Self(self.0 - other.0)
    }
}

impl fmt::Display for SignedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3: price in quote currency per unit of base. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

/// Latest price per market, from an oracle feed or from the last trade.
pub type PriceMap = BTreeMap<MarketId, Price>;

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.4: quote currency amount. margin, notional, pnl, funding all use this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Quote(Decimal);

impl Quote {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn checked_add(&self, other: Quote) -> Result<Self, PrecisionError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(PrecisionError::ArithmeticOverflow { operation: "quote addition" })
    }

    pub fn checked_sub(&self, other: Quote) -> Result<Self, PrecisionError> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(PrecisionError::ArithmeticOverflow { operation: "quote subtraction" })
    }

    pub fn checked_mul(&self, factor: Decimal) -> Result<Self, PrecisionError> {
        self.0
            .checked_mul(factor)
            .map(Self)
            .ok_or(PrecisionError::ArithmeticOverflow { operation: "quote multiplication" })
    }

    /// Sums amounts, failing instead of wrapping or panicking on overflow.
    pub fn checked_sum<'a>(amounts: impl IntoIterator<Item = &'a Quote>) -> Result<Self, PrecisionError> {
        amounts
            .into_iter()
            .try_fold(Self::zero(), |acc, q| acc.checked_add(*q))
    }

    pub fn negate(&self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for Quote {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quote {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}
