use crate::domain::order::{Address, Price};
use serde::{Deserialize, Serialize};

/// Commission configuration, owned by the engine and mutated only through the
/// owner-gated config operations. Read at execution time, so an order settles
/// at the rate in effect when it executes, not when it was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionConfig {
    /// Percentage of the sale price, 0..=100.
    pub rate: u8,
    pub beneficiary: Option<Address>,
    /// Whether token-denominated sales are also charged. Off by default:
    /// only native-currency settlement deducts commission.
    pub on_token_sales: bool,
}

/// How a sale price splits between the seller and the commission beneficiary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub seller_payout: u128,
    pub commission: u128,
    pub beneficiary: Option<Address>,
}

impl Settlement {
    /// The whole price to the seller, no commission leg.
    pub fn full(price: Price) -> Self {
        Self {
            seller_payout: price.value(),
            commission: 0,
            beneficiary: None,
        }
    }
}

impl CommissionConfig {
    /// Splits `price` into seller payout and commission, truncating toward
    /// zero. Commission applies only when the rate is non-zero and a
    /// beneficiary is configured.
    pub fn split(&self, price: Price) -> Settlement {
        let price = price.value();
        match self.beneficiary {
            Some(beneficiary) if self.rate > 0 => {
                let commission = price * u128::from(self.rate) / 100;
                Settlement {
                    seller_payout: price - commission,
                    commission,
                    beneficiary: Some(beneficiary),
                }
            }
            _ => Settlement {
                seller_payout: price,
                commission: 0,
                beneficiary: None,
            },
        }
    }
}
