use crate::domain::order::{Address, AssetId, OrderId, Price};
use serde::{Deserialize, Serialize};

/// Notifications for observers and indexers, emitted exactly once per
/// successful state transition and never on a failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    OrderAdded {
        order_id: OrderId,
        asset_id: AssetId,
        seller: Address,
        price: Price,
        payment_token: Option<Address>,
    },
    OrderCancelled {
        order_id: OrderId,
    },
    OrderExecuted {
        order_id: OrderId,
        asset_id: AssetId,
        seller: Address,
        buyer: Address,
        price: Price,
        payment_token: Option<Address>,
    },
}
