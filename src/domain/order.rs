use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An account identity: a seller, a buyer, the marketplace itself, or a
/// payment-token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl OrderId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sale price in base units of the settlement currency. No implicit
/// decimals; zero is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u128);

impl Price {
    pub fn new(value: u128) -> Result<Self> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(MarketError::NonPositivePrice)
        }
    }

    pub fn value(&self) -> u128 {
        self.0
    }
}

impl TryFrom<u128> for Price {
    type Error = MarketError;

    fn try_from(value: u128) -> Result<Self> {
        Self::new(value)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Active,
    Cancelled,
    Executed,
}

/// A sale order. Created Active with the asset already in escrow; Cancelled
/// and Executed are terminal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub asset_id: AssetId,
    pub seller: Address,
    pub price: Price,
    /// `None` is the native-currency sentinel.
    pub payment_token: Option<Address>,
    pub status: OrderStatus,
}

impl Order {
    pub fn new(
        id: OrderId,
        asset_id: AssetId,
        seller: Address,
        price: Price,
        payment_token: Option<Address>,
    ) -> Self {
        Self {
            id,
            asset_id,
            seller,
            price,
            payment_token,
            status: OrderStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    /// Moves the order to Cancelled. Fails unless currently Active.
    pub fn cancel(&mut self) -> Result<()> {
        if self.is_active() {
            self.status = OrderStatus::Cancelled;
            Ok(())
        } else {
            Err(MarketError::OrderNotActive)
        }
    }

    /// Moves the order to Executed. Fails unless currently Active.
    pub fn execute(&mut self) -> Result<()> {
        if self.is_active() {
            self.status = OrderStatus::Executed;
            Ok(())
        } else {
            Err(MarketError::OrderNotActive)
        }
    }

    /// Puts an order back on the book after a failed settlement leg. Only the
    /// engine's rollback path may call this; a terminal status never becomes
    /// Active again through the public surface.
    pub(crate) fn reopen(&mut self) {
        self.status = OrderStatus::Active;
    }
}
