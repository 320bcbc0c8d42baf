use nft_marketplace::application::engine::{Marketplace, MarketplaceConfig};
use nft_marketplace::domain::order::{Address, AssetId};
use nft_marketplace::error::Result;
use nft_marketplace::infrastructure::in_memory::{
    InMemoryAssetRegistry, InMemoryNativeLedger, InMemoryOrderStore, InMemoryToken,
};
use rand::Rng;
use std::path::Path;
use std::sync::Arc;

pub const OWNER: Address = Address(1);
pub const SELLER: Address = Address(2);
pub const BUYER: Address = Address(3);
pub const BENEFICIARY: Address = Address(4);
pub const MARKET: Address = Address(100);
pub const GOLD: Address = Address(200);
pub const GOLD_RATE: u128 = 1000;

/// Engine plus the collaborator doubles it is wired to.
pub struct Market {
    pub engine: Marketplace,
    pub assets: InMemoryAssetRegistry,
    pub native: InMemoryNativeLedger,
    pub gold: InMemoryToken,
}

pub async fn market() -> Market {
    market_with(false).await
}

/// Fresh marketplace with the gold token registered and the buyer funded in
/// both currencies, mirroring the usual scenario setup.
pub async fn market_with(commission_on_token_sales: bool) -> Market {
    let assets = InMemoryAssetRegistry::new();
    let native = InMemoryNativeLedger::new();
    let gold = InMemoryToken::new();
    let engine = Marketplace::new(
        MarketplaceConfig {
            owner: OWNER,
            account: MARKET,
            commission_on_token_sales,
        },
        Box::new(assets.clone()),
        Box::new(native.clone()),
        Box::new(InMemoryOrderStore::new()),
    )
    .await
    .unwrap();

    engine
        .add_payment_token(OWNER, GOLD, GOLD_RATE, Arc::new(gold.clone()))
        .await
        .unwrap();
    native.deposit(BUYER, 10_000).await;
    gold.mint(BUYER, 20_000).await;

    Market {
        engine,
        assets,
        native,
        gold,
    }
}

/// Mints an asset to `owner` and approves the marketplace for it.
pub async fn mint_approved(market: &Market, owner: Address) -> AssetId {
    let asset_id = market.assets.mint(owner).await;
    market.assets.approve(owner, asset_id, MARKET).await.unwrap();
    asset_id
}

/// Writes a scenario in which the seller lists `orders` assets at random
/// prices and the buyer purchases every one at its exact price. Returns the
/// generated prices.
pub fn generate_buyout_scenario(path: &Path, orders: usize) -> Result<Vec<u128>> {
    let mut rng = rand::thread_rng();
    let prices: Vec<u128> = (0..orders).map(|_| rng.gen_range(1..=1_000)).collect();
    let total: u128 = prices.iter().sum();

    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record(["op", "caller", "asset", "order", "price", "token", "amount", "to"])?;
    wtr.write_record(["deposit", "3", "", "", "", "", &total.to_string(), ""])?;

    for (i, price) in prices.iter().enumerate() {
        let id = (i + 1).to_string();
        let price = price.to_string();
        wtr.write_record(["mint", "2", "", "", "", "", "", ""])?;
        wtr.write_record(["approve", "2", &id, "", "", "", "", ""])?;
        wtr.write_record(["add-order", "2", &id, "", &price, "", "", ""])?;
        wtr.write_record(["buy-ether", "3", "", &id, "", "", &price, ""])?;
    }

    wtr.flush()?;
    Ok(prices)
}
