use crate::domain::order::{Address, AssetId, Order, OrderId};
use crate::domain::ports::{AssetRegistry, FungibleToken, NativeLedger, OrderStore};
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory stand-in for the external asset registry.
///
/// Tracks ownership and per-asset operator approvals the way an ERC-721
/// registry does: a custody transfer needs `from` to be the current owner and
/// the operator to either be the owner or hold the asset's approval.
/// `Clone` shares the underlying book.
#[derive(Default, Clone)]
pub struct InMemoryAssetRegistry {
    inner: Arc<RwLock<AssetBook>>,
}

#[derive(Default)]
struct AssetBook {
    owners: HashMap<AssetId, Address>,
    approvals: HashMap<AssetId, Address>,
    next_id: u64,
}

impl InMemoryAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new asset owned by `owner`. Collaborator surface only; the
    /// engine never mints.
    pub async fn mint(&self, owner: Address) -> AssetId {
        let mut book = self.inner.write().await;
        book.next_id += 1;
        let asset_id = AssetId(book.next_id);
        book.owners.insert(asset_id, owner);
        asset_id
    }

    /// Grants `operator` transfer authority over one asset. Only the current
    /// owner may approve.
    pub async fn approve(
        &self,
        caller: Address,
        asset_id: AssetId,
        operator: Address,
    ) -> Result<()> {
        let mut book = self.inner.write().await;
        match book.owners.get(&asset_id) {
            None => Err(MarketError::AssetNotFound),
            Some(owner) if *owner != caller => Err(MarketError::NotAssetOwner),
            Some(_) => {
                book.approvals.insert(asset_id, operator);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl AssetRegistry for InMemoryAssetRegistry {
    async fn owner_of(&self, asset_id: AssetId) -> Result<Address> {
        let book = self.inner.read().await;
        book.owners
            .get(&asset_id)
            .copied()
            .ok_or(MarketError::AssetNotFound)
    }

    async fn exists(&self, asset_id: AssetId) -> Result<bool> {
        let book = self.inner.read().await;
        Ok(book.owners.contains_key(&asset_id))
    }

    async fn transfer_custody(
        &self,
        operator: Address,
        asset_id: AssetId,
        from: Address,
        to: Address,
    ) -> Result<()> {
        let mut book = self.inner.write().await;
        let owner = *book.owners.get(&asset_id).ok_or(MarketError::AssetNotFound)?;
        if owner != from {
            return Err(MarketError::NotAssetOwner);
        }
        if operator != from && book.approvals.get(&asset_id) != Some(&operator) {
            return Err(MarketError::MarketplaceNotApproved);
        }
        book.owners.insert(asset_id, to);
        // approval does not survive a custody change
        book.approvals.remove(&asset_id);
        Ok(())
    }
}

/// In-memory fungible token with ERC-20 balance/allowance semantics.
#[derive(Default, Clone)]
pub struct InMemoryToken {
    inner: Arc<RwLock<TokenBook>>,
}

#[derive(Default)]
struct TokenBook {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
}

impl InMemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn mint(&self, account: Address, amount: u128) {
        let mut book = self.inner.write().await;
        *book.balances.entry(account).or_default() += amount;
    }

    /// `owner` authorizes `spender` to move up to `amount` on their behalf.
    pub async fn approve(&self, owner: Address, spender: Address, amount: u128) {
        let mut book = self.inner.write().await;
        book.allowances.insert((owner, spender), amount);
    }
}

#[async_trait]
impl FungibleToken for InMemoryToken {
    async fn transfer_from(
        &self,
        spender: Address,
        payer: Address,
        payee: Address,
        amount: u128,
    ) -> Result<()> {
        let mut book = self.inner.write().await;
        let payer_balance = book.balances.get(&payer).copied().unwrap_or(0);
        if payer_balance < amount {
            return Err(MarketError::InsufficientFunds);
        }
        if spender != payer {
            let allowance = book.allowances.get(&(payer, spender)).copied().unwrap_or(0);
            if allowance < amount {
                return Err(MarketError::InsufficientAllowance);
            }
            book.allowances.insert((payer, spender), allowance - amount);
        }
        book.balances.insert(payer, payer_balance - amount);
        *book.balances.entry(payee).or_default() += amount;
        Ok(())
    }

    async fn balance_of(&self, account: Address) -> Result<u128> {
        let book = self.inner.read().await;
        Ok(book.balances.get(&account).copied().unwrap_or(0))
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<u128> {
        let book = self.inner.read().await;
        Ok(book.allowances.get(&(owner, spender)).copied().unwrap_or(0))
    }
}

/// In-memory native-currency ledger.
#[derive(Default, Clone)]
pub struct InMemoryNativeLedger {
    balances: Arc<RwLock<HashMap<Address, u128>>>,
}

impl InMemoryNativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deposit(&self, account: Address, amount: u128) {
        let mut balances = self.balances.write().await;
        *balances.entry(account).or_default() += amount;
    }
}

#[async_trait]
impl NativeLedger for InMemoryNativeLedger {
    async fn transfer(&self, from: Address, to: Address, amount: u128) -> Result<()> {
        let mut balances = self.balances.write().await;
        let from_balance = balances.get(&from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(MarketError::InsufficientFunds);
        }
        balances.insert(from, from_balance - amount);
        *balances.entry(to).or_default() += amount;
        Ok(())
    }

    async fn balance_of(&self, account: Address) -> Result<u128> {
        let balances = self.balances.read().await;
        Ok(balances.get(&account).copied().unwrap_or(0))
    }
}

/// Thread-safe in-memory order store.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn update(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn last_order_id(&self) -> Result<Option<OrderId>> {
        let orders = self.orders.read().await;
        Ok(orders.keys().max().copied())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by_key(|order| order.id);
        Ok(all)
    }
}
