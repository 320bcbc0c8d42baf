mod common;

use common::{BENEFICIARY, BUYER, GOLD, MARKET, OWNER, SELLER, market, mint_approved};
use nft_marketplace::domain::events::MarketEvent;
use nft_marketplace::domain::ports::{AssetRegistry, NativeLedger};
use nft_marketplace::domain::order::{OrderId, OrderStatus, Price};
use nft_marketplace::error::{ErrorKind, MarketError};

#[tokio::test]
async fn test_buyer_pays_exact_price_and_receives_asset() {
    let market = market().await;
    let mut events = market.engine.subscribe();
    let asset_id = mint_approved(&market, SELLER).await;
    let order_id = market
        .engine
        .add_order(SELLER, asset_id, 1_000, None)
        .await
        .unwrap();

    market
        .engine
        .execute_order_with_ether(BUYER, order_id, 1_000)
        .await
        .unwrap();

    assert_eq!(market.assets.owner_of(asset_id).await.unwrap(), BUYER);
    assert_eq!(market.native.balance_of(SELLER).await.unwrap(), 1_000);
    assert_eq!(market.native.balance_of(BUYER).await.unwrap(), 9_000);
    let order = market.engine.order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Executed);

    // OrderAdded first, then the execution with matching fields
    events.recv().await.unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        MarketEvent::OrderExecuted {
            order_id,
            asset_id,
            seller: SELLER,
            buyer: BUYER,
            price: Price::new(1_000).unwrap(),
            payment_token: None,
        }
    );
}

#[tokio::test]
async fn test_commission_split_on_native_sale() {
    let market = market().await;
    market.engine.set_commission_rate(OWNER, 5).await.unwrap();
    market
        .engine
        .set_commission_beneficiary(OWNER, BENEFICIARY)
        .await
        .unwrap();

    let asset_id = mint_approved(&market, SELLER).await;
    let order_id = market
        .engine
        .add_order(SELLER, asset_id, 100, None)
        .await
        .unwrap();
    market
        .engine
        .execute_order_with_ether(BUYER, order_id, 100)
        .await
        .unwrap();

    assert_eq!(market.native.balance_of(SELLER).await.unwrap(), 95);
    assert_eq!(market.native.balance_of(BENEFICIARY).await.unwrap(), 5);
    assert_eq!(market.native.balance_of(BUYER).await.unwrap(), 9_900);
}

#[tokio::test]
async fn test_zero_rate_pays_seller_in_full() {
    let market = market().await;
    market
        .engine
        .set_commission_beneficiary(OWNER, BENEFICIARY)
        .await
        .unwrap();

    let asset_id = mint_approved(&market, SELLER).await;
    let order_id = market
        .engine
        .add_order(SELLER, asset_id, 100, None)
        .await
        .unwrap();
    market
        .engine
        .execute_order_with_ether(BUYER, order_id, 100)
        .await
        .unwrap();

    assert_eq!(market.native.balance_of(SELLER).await.unwrap(), 100);
    assert_eq!(market.native.balance_of(BENEFICIARY).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unset_beneficiary_pays_seller_in_full() {
    let market = market().await;
    market.engine.set_commission_rate(OWNER, 5).await.unwrap();

    let asset_id = mint_approved(&market, SELLER).await;
    let order_id = market
        .engine
        .add_order(SELLER, asset_id, 100, None)
        .await
        .unwrap();
    market
        .engine
        .execute_order_with_ether(BUYER, order_id, 100)
        .await
        .unwrap();

    assert_eq!(market.native.balance_of(SELLER).await.unwrap(), 100);
}

#[tokio::test]
async fn test_rate_change_applies_at_execution_time() {
    let market = market().await;
    let asset_id = mint_approved(&market, SELLER).await;
    let order_id = market
        .engine
        .add_order(SELLER, asset_id, 100, None)
        .await
        .unwrap();

    // configured after the order was created, still charged at execution
    market.engine.set_commission_rate(OWNER, 10).await.unwrap();
    market
        .engine
        .set_commission_beneficiary(OWNER, BENEFICIARY)
        .await
        .unwrap();

    market
        .engine
        .execute_order_with_ether(BUYER, order_id, 100)
        .await
        .unwrap();

    assert_eq!(market.native.balance_of(SELLER).await.unwrap(), 90);
    assert_eq!(market.native.balance_of(BENEFICIARY).await.unwrap(), 10);
}

#[tokio::test]
async fn test_value_mismatch_rejected_above_and_below() {
    let market = market().await;
    let asset_id = mint_approved(&market, SELLER).await;
    let order_id = market
        .engine
        .add_order(SELLER, asset_id, 100, None)
        .await
        .unwrap();

    for value in [99, 101] {
        let err = market
            .engine
            .execute_order_with_ether(BUYER, order_id, value)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::PriceMismatch));
        assert_eq!(err.to_string(), "Price has changed");
    }

    assert_eq!(market.native.balance_of(BUYER).await.unwrap(), 10_000);
    assert_eq!(market.native.balance_of(SELLER).await.unwrap(), 0);
    assert_eq!(market.assets.owner_of(asset_id).await.unwrap(), MARKET);
    let order = market.engine.order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Active);
}

#[tokio::test]
async fn test_seller_cannot_buy_own_order() {
    let market = market().await;
    market.native.deposit(SELLER, 1_000).await;
    let asset_id = mint_approved(&market, SELLER).await;
    let order_id = market
        .engine
        .add_order(SELLER, asset_id, 100, None)
        .await
        .unwrap();

    let err = market
        .engine
        .execute_order_with_ether(SELLER, order_id, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::SellerIsBuyer));
    assert_eq!(err.to_string(), "Seller must be different than buyer");
}

#[tokio::test]
async fn test_unknown_order_is_rejected() {
    let market = market().await;
    let err = market
        .engine
        .execute_order_with_ether(BUYER, OrderId(42), 100)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::OrderNotFound));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_ether_path_rejects_token_order() {
    let market = market().await;
    let asset_id = mint_approved(&market, SELLER).await;
    let order_id = market
        .engine
        .add_order(SELLER, asset_id, 100, Some(GOLD))
        .await
        .unwrap();

    let result = market
        .engine
        .execute_order_with_ether(BUYER, order_id, 100)
        .await;
    assert!(matches!(result, Err(MarketError::PaymentTokenMismatch)));
}

#[tokio::test]
async fn test_insufficient_buyer_funds_leave_order_active() {
    let market = market().await;
    let asset_id = mint_approved(&market, SELLER).await;
    let order_id = market
        .engine
        .add_order(SELLER, asset_id, 20_000, None)
        .await
        .unwrap();

    let err = market
        .engine
        .execute_order_with_ether(BUYER, order_id, 20_000)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::InsufficientFunds));
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

    let order = market.engine.order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Active);
    assert_eq!(market.native.balance_of(BUYER).await.unwrap(), 10_000);
    assert_eq!(market.assets.owner_of(asset_id).await.unwrap(), MARKET);
}

#[tokio::test]
async fn test_double_execution_fails_without_double_payout() {
    let market = market().await;
    let asset_id = mint_approved(&market, SELLER).await;
    let order_id = market
        .engine
        .add_order(SELLER, asset_id, 100, None)
        .await
        .unwrap();

    market
        .engine
        .execute_order_with_ether(BUYER, order_id, 100)
        .await
        .unwrap();
    let err = market
        .engine
        .execute_order_with_ether(BUYER, order_id, 100)
        .await
        .unwrap_err();

    assert!(matches!(err, MarketError::OrderNotActive));
    assert_eq!(market.native.balance_of(SELLER).await.unwrap(), 100);
    assert_eq!(market.native.balance_of(BUYER).await.unwrap(), 9_900);
}
