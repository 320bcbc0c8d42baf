use super::order::{Address, AssetId, Order, OrderId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// The external registry that owns unique assets. Custody transfers are the
/// collaborator's to authorize: they fail when `from` is not the current
/// owner or when `operator` has not been granted transfer authority.
#[async_trait]
pub trait AssetRegistry: Send + Sync {
    async fn owner_of(&self, asset_id: AssetId) -> Result<Address>;
    async fn exists(&self, asset_id: AssetId) -> Result<bool>;
    async fn transfer_custody(
        &self,
        operator: Address,
        asset_id: AssetId,
        from: Address,
        to: Address,
    ) -> Result<()>;
}

/// One fungible payment token. Registered into the engine as a transfer
/// capability; `transfer_from` fails on insufficient balance or allowance.
#[async_trait]
pub trait FungibleToken: Send + Sync {
    async fn transfer_from(
        &self,
        spender: Address,
        payer: Address,
        payee: Address,
        amount: u128,
    ) -> Result<()>;
    async fn balance_of(&self, account: Address) -> Result<u128>;
    async fn allowance(&self, owner: Address, spender: Address) -> Result<u128>;
}

/// The native-currency transfer primitive of the execution environment.
#[async_trait]
pub trait NativeLedger: Send + Sync {
    async fn transfer(&self, from: Address, to: Address, amount: u128) -> Result<()>;
    async fn balance_of(&self, account: Address) -> Result<u128>;
}

/// The engine's own order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<()>;
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;
    async fn update(&self, order: Order) -> Result<()>;
    /// Highest id ever issued, for seeding the monotonic counter on startup.
    async fn last_order_id(&self) -> Result<Option<OrderId>>;
    async fn all_orders(&self) -> Result<Vec<Order>>;
}

pub type AssetRegistryBox = Box<dyn AssetRegistry>;
pub type NativeLedgerBox = Box<dyn NativeLedger>;
pub type OrderStoreBox = Box<dyn OrderStore>;
pub type FungibleTokenArc = Arc<dyn FungibleToken>;
