//! Bets, selections and wheel outcomes.
//!
//! A `Bet` is the raw `(type, value, amount)` triple a player submits.
//! Validation turns its value into a typed `Selection`, which is what the
//! payout tables work on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{SettlementError, SettlementResult};

/// Highest number on the wheel (single zero, 0–36).
pub const MAX_NUMBER: u8 = 36;

/// Standard red partition of 1–36. Every other non-zero number is black.
pub const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// The six bet families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetType {
    Number,
    Color,
    Even,
    Column,
    Dozen,
    Half,
}

impl BetType {
    /// Gross payout multiple of the stake on a win (stake included).
    pub const fn payout_multiplier(self) -> u32 {
        match self {
            Self::Number => 36,
            Self::Color | Self::Even | Self::Half => 2,
            Self::Column | Self::Dozen => 3,
        }
    }
}

impl std::fmt::Display for BetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Number => "number",
            Self::Color => "color",
            Self::Even => "even",
            Self::Column => "column",
            Self::Dozen => "dozen",
            Self::Half => "half",
        };
        f.write_str(name)
    }
}

/// Wire encoding: Red = 1, Black = 2 (0 is the green zero, not bettable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub const fn value(self) -> u8 {
        match self {
            Self::Red => 1,
            Self::Black => 2,
        }
    }
}

/// Wire encoding: Even = 0, Odd = 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    pub const fn value(self) -> u8 {
        match self {
            Self::Even => 0,
            Self::Odd => 1,
        }
    }
}

/// A single wager as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub bet_type: BetType,
    pub value: u8,
    pub amount: Decimal,
}

impl Bet {
    pub fn new(bet_type: BetType, value: u8, amount: Decimal) -> Self {
        Self {
            bet_type,
            value,
            amount,
        }
    }

    pub fn number(value: u8, amount: Decimal) -> Self {
        Self::new(BetType::Number, value, amount)
    }

    pub fn color(color: Color, amount: Decimal) -> Self {
        Self::new(BetType::Color, color.value(), amount)
    }

    pub fn parity(parity: Parity, amount: Decimal) -> Self {
        Self::new(BetType::Even, parity.value(), amount)
    }

    pub fn column(column: u8, amount: Decimal) -> Self {
        Self::new(BetType::Column, column, amount)
    }

    pub fn dozen(dozen: u8, amount: Decimal) -> Self {
        Self::new(BetType::Dozen, dozen, amount)
    }

    pub fn half(half: u8, amount: Decimal) -> Self {
        Self::new(BetType::Half, half, amount)
    }

    /// Checks amount and value domain, returning the typed selection.
    pub fn selection(&self) -> SettlementResult<Selection> {
        if self.amount <= Decimal::ZERO {
            return Err(SettlementError::InvalidBet(format!(
                "{} bet amount must be positive, got {}",
                self.bet_type, self.amount
            )));
        }
        Selection::try_from((self.bet_type, self.value))
    }

    /// Gross payout of this bet for `outcome`: `amount × multiplier` or zero.
    pub fn payout(&self, outcome: Outcome) -> SettlementResult<Decimal> {
        let selection = self.selection()?;
        if selection.covers(outcome) {
            self.amount
                .checked_mul(Decimal::from(self.bet_type.payout_multiplier()))
                .ok_or_else(|| {
                    SettlementError::InvalidBet(format!(
                        "{} bet of {} overflows its payout",
                        self.bet_type, self.amount
                    ))
                })
        } else {
            Ok(Decimal::ZERO)
        }
    }
}

/// A validated bet value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Number(u8),
    Color(Color),
    Parity(Parity),
    Column(u8),
    Dozen(u8),
    Half(u8),
}

impl TryFrom<(BetType, u8)> for Selection {
    type Error = SettlementError;

    fn try_from((bet_type, value): (BetType, u8)) -> Result<Self, Self::Error> {
        let selection = match (bet_type, value) {
            (BetType::Number, n) if n <= MAX_NUMBER => Self::Number(n),
            (BetType::Color, 1) => Self::Color(Color::Red),
            (BetType::Color, 2) => Self::Color(Color::Black),
            (BetType::Even, 0) => Self::Parity(Parity::Even),
            (BetType::Even, 1) => Self::Parity(Parity::Odd),
            (BetType::Column, k) if k <= 2 => Self::Column(k),
            (BetType::Dozen, k) if k <= 2 => Self::Dozen(k),
            (BetType::Half, k) if k <= 1 => Self::Half(k),
            (bet_type, value) => {
                return Err(SettlementError::InvalidBet(format!(
                    "value {value} is outside the {bet_type} domain"
                )));
            }
        };
        Ok(selection)
    }
}

impl Selection {
    /// Whether the selection wins on `outcome`. Zero only pays `Number(0)`.
    pub fn covers(self, outcome: Outcome) -> bool {
        let n = outcome.get();
        if n == 0 {
            return self == Self::Number(0);
        }
        match self {
            Self::Number(value) => value == n,
            Self::Color(color) => outcome.color() == Some(color),
            Self::Parity(parity) => outcome.parity() == Some(parity),
            Self::Column(k) => (n - 1) % 3 == k,
            Self::Dozen(k) => (n - 1) / 12 == k,
            Self::Half(k) => (n - 1) / 18 == k,
        }
    }
}

/// A resolved wheel position, 0–36.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Outcome(u8);

impl Outcome {
    pub const ZERO: Self = Self(0);

    pub fn new(n: u8) -> SettlementResult<Self> {
        if n > MAX_NUMBER {
            return Err(SettlementError::InvalidOutcome(n));
        }
        Ok(Self(n))
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub fn color(self) -> Option<Color> {
        match self.0 {
            0 => None,
            n if RED_NUMBERS.contains(&n) => Some(Color::Red),
            _ => Some(Color::Black),
        }
    }

    pub const fn parity(self) -> Option<Parity> {
        match self.0 {
            0 => None,
            n if n % 2 == 0 => Some(Parity::Even),
            _ => Some(Parity::Odd),
        }
    }

    /// Every position on the wheel, in order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=MAX_NUMBER).map(Self)
    }
}

impl TryFrom<u8> for Outcome {
    type Error = SettlementError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Outcome> for u8 {
    fn from(outcome: Outcome) -> Self {
        outcome.0
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
