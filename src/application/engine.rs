use crate::domain::commission::{CommissionConfig, Settlement};
use crate::domain::events::MarketEvent;
use crate::domain::order::{Address, AssetId, Order, OrderId, Price};
use crate::domain::ports::{AssetRegistryBox, FungibleTokenArc, NativeLedgerBox, OrderStoreBox};
use crate::error::{MarketError, Result};
use std::collections::HashMap;
use tokio::sync::{Mutex, broadcast};
use tracing::info;

/// Engine identity and settlement policy, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct MarketplaceConfig {
    /// Account allowed to change commission and the payment-token registry.
    pub owner: Address,
    /// The engine's own account: escrow custodian and token spender. Sellers
    /// approve it in the asset registry; buyers grant it token allowances.
    pub account: Address,
    /// Whether token-denominated sales also deduct commission.
    pub commission_on_token_sales: bool,
}

/// Registry entry for an accepted payment token: acceptance metadata plus the
/// transfer capability used at settlement.
#[derive(Clone)]
pub struct PaymentTokenEntry {
    pub rate: u128,
    pub capability: FungibleTokenArc,
}

struct MarketState {
    next_order_id: OrderId,
    payment_tokens: HashMap<Address, PaymentTokenEntry>,
    commission: CommissionConfig,
}

impl MarketState {
    fn allocate_order_id(&mut self) -> OrderId {
        let id = self.next_order_id;
        self.next_order_id = id.next();
        id
    }
}

/// The order book / escrow engine.
///
/// Every public operation locks `state` for its full duration, giving the
/// one-at-a-time transactional ordering the settlement logic relies on: the
/// balance and allowance pre-checks cannot go stale before the transfers
/// they guard. Within an operation the order is validated, committed to its
/// terminal status, and only then are the external transfers issued
/// (checks-effects-interactions).
pub struct Marketplace {
    owner: Address,
    account: Address,
    assets: AssetRegistryBox,
    native: NativeLedgerBox,
    orders: OrderStoreBox,
    state: Mutex<MarketState>,
    events: broadcast::Sender<MarketEvent>,
}

impl Marketplace {
    /// Wires the engine to its collaborators. Seeds the order id counter from
    /// the store so ids keep increasing across restarts.
    pub async fn new(
        config: MarketplaceConfig,
        assets: AssetRegistryBox,
        native: NativeLedgerBox,
        orders: OrderStoreBox,
    ) -> Result<Self> {
        let next_order_id = orders
            .last_order_id()
            .await?
            .map(OrderId::next)
            .unwrap_or(OrderId(1));
        let (events, _) = broadcast::channel(256);

        Ok(Self {
            owner: config.owner,
            account: config.account,
            assets,
            native,
            orders,
            state: Mutex::new(MarketState {
                next_order_id,
                payment_tokens: HashMap::new(),
                commission: CommissionConfig {
                    on_token_sales: config.commission_on_token_sales,
                    ..CommissionConfig::default()
                },
            }),
            events,
        })
    }

    /// The engine's escrow/spender account.
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.events.subscribe()
    }

    pub async fn order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let _state = self.state.lock().await;
        self.orders.get(order_id).await
    }

    pub async fn orders(&self) -> Result<Vec<Order>> {
        let _state = self.state.lock().await;
        self.orders.all_orders().await
    }

    pub async fn payment_token_rate(&self, token: Address) -> Option<u128> {
        let state = self.state.lock().await;
        state.payment_tokens.get(&token).map(|entry| entry.rate)
    }

    /// Lists an asset for sale. The caller must own the asset and must
    /// already have approved the engine in the asset registry; the asset
    /// moves into escrow before the order is recorded.
    pub async fn add_order(
        &self,
        caller: Address,
        asset_id: AssetId,
        price: u128,
        payment_token: Option<Address>,
    ) -> Result<OrderId> {
        let mut state = self.state.lock().await;

        let price = Price::new(price)?;
        if let Some(token) = payment_token
            && !state.payment_tokens.contains_key(&token)
        {
            return Err(MarketError::PaymentTokenNotRegistered);
        }
        if !self.assets.exists(asset_id).await? {
            return Err(MarketError::AssetNotFound);
        }
        if self.assets.owner_of(asset_id).await? != caller {
            return Err(MarketError::NotAssetOwner);
        }

        // Escrow before recording: once the engine holds custody, a second
        // add_order for the same asset fails the ownership check above.
        self.assets
            .transfer_custody(self.account, asset_id, caller, self.account)
            .await?;

        let order_id = state.allocate_order_id();
        let order = Order::new(order_id, asset_id, caller, price, payment_token);
        if let Err(err) = self.orders.insert(order).await {
            // the order was never recorded; hand the asset back
            let _ = self
                .assets
                .transfer_custody(self.account, asset_id, self.account, caller)
                .await;
            return Err(err);
        }

        info!(%order_id, %asset_id, seller = %caller, "order added");
        self.emit(MarketEvent::OrderAdded {
            order_id,
            asset_id,
            seller: caller,
            price,
            payment_token,
        });
        Ok(order_id)
    }

    /// Takes an active order off the book and returns custody to the seller.
    pub async fn cancel_order(&self, caller: Address, order_id: OrderId) -> Result<()> {
        let _state = self.state.lock().await;

        let mut order = self.load_order(order_id).await?;
        if !order.is_active() {
            return Err(MarketError::OrderNotActive);
        }
        if order.seller != caller {
            return Err(MarketError::NotSeller);
        }

        order.cancel()?;
        self.orders.update(order.clone()).await?;

        if let Err(err) = self
            .assets
            .transfer_custody(self.account, order.asset_id, self.account, order.seller)
            .await
        {
            order.reopen();
            self.orders.update(order).await?;
            return Err(err);
        }

        info!(%order_id, "order cancelled");
        self.emit(MarketEvent::OrderCancelled { order_id });
        Ok(())
    }

    /// Buys an order priced in the native currency. `value` is the amount the
    /// caller attaches and must match the order price exactly; both shortfall
    /// and excess are rejected.
    pub async fn execute_order_with_ether(
        &self,
        caller: Address,
        order_id: OrderId,
        value: u128,
    ) -> Result<()> {
        let state = self.state.lock().await;

        let mut order = self.load_order(order_id).await?;
        if !order.is_active() {
            return Err(MarketError::OrderNotActive);
        }
        if order.payment_token.is_some() {
            return Err(MarketError::PaymentTokenMismatch);
        }
        if caller == order.seller {
            return Err(MarketError::SellerIsBuyer);
        }
        if value != order.price.value() {
            return Err(MarketError::PriceMismatch);
        }

        let settlement = state.commission.split(order.price);
        if self.native.balance_of(caller).await? < value {
            return Err(MarketError::InsufficientFunds);
        }

        order.execute()?;
        self.orders.update(order.clone()).await?;

        if let Err(err) = self.settle_native(caller, &order, &settlement).await {
            order.reopen();
            self.orders.update(order).await?;
            return Err(err);
        }

        info!(%order_id, buyer = %caller, value, "order executed with ether");
        self.emit(MarketEvent::OrderExecuted {
            order_id,
            asset_id: order.asset_id,
            seller: order.seller,
            buyer: caller,
            price: order.price,
            payment_token: None,
        });
        Ok(())
    }

    /// Buys an order priced in a registered payment token. The caller must
    /// have granted the engine an allowance covering the price.
    pub async fn execute_order_with_payment_token(
        &self,
        caller: Address,
        order_id: OrderId,
        price: u128,
        payment_token: Address,
    ) -> Result<()> {
        let state = self.state.lock().await;

        let mut order = self.load_order(order_id).await?;
        if !order.is_active() {
            return Err(MarketError::OrderNotActive);
        }
        if order.payment_token != Some(payment_token) {
            return Err(MarketError::PaymentTokenMismatch);
        }
        let token = state
            .payment_tokens
            .get(&payment_token)
            .ok_or(MarketError::PaymentTokenNotRegistered)?
            .capability
            .clone();
        if caller == order.seller {
            return Err(MarketError::SellerIsBuyer);
        }
        if price != order.price.value() {
            return Err(MarketError::PriceMismatch);
        }

        let settlement = if state.commission.on_token_sales {
            state.commission.split(order.price)
        } else {
            Settlement::full(order.price)
        };

        // Both legs draw on the buyer; pre-check the total while the state
        // lock rules out interleaved spends.
        if token.balance_of(caller).await? < price {
            return Err(MarketError::InsufficientFunds);
        }
        if token.allowance(caller, self.account).await? < price {
            return Err(MarketError::InsufficientAllowance);
        }

        order.execute()?;
        self.orders.update(order.clone()).await?;

        if let Err(err) = self.settle_token(&token, caller, &order, &settlement).await {
            order.reopen();
            self.orders.update(order).await?;
            return Err(err);
        }

        info!(%order_id, buyer = %caller, token = %payment_token, "order executed with payment token");
        self.emit(MarketEvent::OrderExecuted {
            order_id,
            asset_id: order.asset_id,
            seller: order.seller,
            buyer: caller,
            price: order.price,
            payment_token: Some(payment_token),
        });
        Ok(())
    }

    /// Registers a payment token or updates the rate of an existing one.
    pub async fn add_payment_token(
        &self,
        caller: Address,
        token: Address,
        rate: u128,
        capability: FungibleTokenArc,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        self.ensure_owner(caller)?;
        state
            .payment_tokens
            .insert(token, PaymentTokenEntry { rate, capability });
        Ok(())
    }

    /// Removes a registered payment token; removing an unknown address is a
    /// lookup failure, not a no-op.
    pub async fn remove_payment_token(&self, caller: Address, token: Address) -> Result<()> {
        let mut state = self.state.lock().await;
        self.ensure_owner(caller)?;
        state
            .payment_tokens
            .remove(&token)
            .map(|_| ())
            .ok_or(MarketError::PaymentTokenNotRegistered)
    }

    /// Sets the commission percentage. Applies to orders executed from now
    /// on, whenever they were created.
    pub async fn set_commission_rate(&self, caller: Address, rate: u8) -> Result<()> {
        let mut state = self.state.lock().await;
        self.ensure_owner(caller)?;
        if rate > 100 {
            return Err(MarketError::CommissionRateOutOfRange);
        }
        state.commission.rate = rate;
        Ok(())
    }

    pub async fn set_commission_beneficiary(
        &self,
        caller: Address,
        beneficiary: Address,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        self.ensure_owner(caller)?;
        state.commission.beneficiary = Some(beneficiary);
        Ok(())
    }

    fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(MarketError::NotMarketOwner)
        }
    }

    async fn load_order(&self, order_id: OrderId) -> Result<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or(MarketError::OrderNotFound)
    }

    /// Native settlement: payout, commission, then custody. A failed later
    /// leg refunds the earlier ones; the refund cannot bounce because the
    /// funds were credited within this same operation.
    async fn settle_native(
        &self,
        buyer: Address,
        order: &Order,
        settlement: &Settlement,
    ) -> Result<()> {
        self.native
            .transfer(buyer, order.seller, settlement.seller_payout)
            .await?;

        if let Some(beneficiary) = settlement.beneficiary
            && let Err(err) = self
                .native
                .transfer(buyer, beneficiary, settlement.commission)
                .await
        {
            let _ = self
                .native
                .transfer(order.seller, buyer, settlement.seller_payout)
                .await;
            return Err(err);
        }

        if let Err(err) = self
            .assets
            .transfer_custody(self.account, order.asset_id, self.account, buyer)
            .await
        {
            let _ = self
                .native
                .transfer(order.seller, buyer, settlement.seller_payout)
                .await;
            if let Some(beneficiary) = settlement.beneficiary {
                let _ = self
                    .native
                    .transfer(beneficiary, buyer, settlement.commission)
                    .await;
            }
            return Err(err);
        }
        Ok(())
    }

    /// Token settlement: payout, optional commission, then custody. Token
    /// legs cannot be refunded without an allowance from the recipient, so
    /// this path leans on the pre-checked balance and allowance, which hold
    /// for the whole serialized operation.
    async fn settle_token(
        &self,
        token: &FungibleTokenArc,
        buyer: Address,
        order: &Order,
        settlement: &Settlement,
    ) -> Result<()> {
        token
            .transfer_from(self.account, buyer, order.seller, settlement.seller_payout)
            .await?;
        if let Some(beneficiary) = settlement.beneficiary {
            token
                .transfer_from(self.account, buyer, beneficiary, settlement.commission)
                .await?;
        }
        self.assets
            .transfer_custody(self.account, order.asset_id, self.account, buyer)
            .await?;
        Ok(())
    }

    fn emit(&self, event: MarketEvent) {
        // nobody subscribed is fine
        let _ = self.events.send(event);
    }
}
