use clap::Parser;
use miette::{IntoDiagnostic, Result};
use nft_marketplace::application::engine::{Marketplace, MarketplaceConfig};
use nft_marketplace::domain::order::{Address, AssetId, OrderId};
use nft_marketplace::domain::ports::OrderStoreBox;
use nft_marketplace::error::{MarketError, Result as MarketResult};
use nft_marketplace::infrastructure::in_memory::{
    InMemoryAssetRegistry, InMemoryNativeLedger, InMemoryOrderStore, InMemoryToken,
};
#[cfg(feature = "storage-rocksdb")]
use nft_marketplace::infrastructure::rocksdb::RocksDbOrderStore;
use nft_marketplace::interfaces::csv::instruction_reader::{
    Instruction, InstructionReader, OpKind,
};
use nft_marketplace::interfaces::csv::order_writer::OrderWriter;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Reserved account identity for the marketplace itself: escrow custodian
/// and token spender.
const MARKET_ACCOUNT: Address = Address(u64::MAX);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input scenario CSV file
    input: PathBuf,

    /// Marketplace owner account id
    #[arg(long, default_value_t = 1)]
    owner: u64,

    /// Deduct commission on token-denominated sales as well
    #[arg(long)]
    token_sale_commission: bool,

    /// Path to a persistent order book (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let orders: OrderStoreBox = match cli.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => Box::new(RocksDbOrderStore::open(db_path).into_diagnostic()?),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => miette::bail!("--db-path requires the storage-rocksdb feature"),
        None => Box::new(InMemoryOrderStore::new()),
    };

    let assets = InMemoryAssetRegistry::new();
    let native = InMemoryNativeLedger::new();
    let mut tokens: HashMap<Address, InMemoryToken> = HashMap::new();

    let market = Marketplace::new(
        MarketplaceConfig {
            owner: Address(cli.owner),
            account: MARKET_ACCOUNT,
            commission_on_token_sales: cli.token_sale_commission,
        },
        Box::new(assets.clone()),
        Box::new(native.clone()),
        orders,
    )
    .await
    .into_diagnostic()?;

    // Replay the scenario
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = InstructionReader::new(file);
    for result in reader.instructions() {
        match result {
            Ok(instruction) => {
                if let Err(e) = apply(&market, &assets, &native, &mut tokens, instruction).await {
                    eprintln!("Error applying instruction: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading instruction: {}", e);
            }
        }
    }

    // Report the final order book
    let orders = market.orders().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer.write_orders(orders).into_diagnostic()?;

    Ok(())
}

/// Routes one scenario row to the engine or to the collaborator double it
/// drives. Token doubles are created on first reference.
async fn apply(
    market: &Marketplace,
    assets: &InMemoryAssetRegistry,
    native: &InMemoryNativeLedger,
    tokens: &mut HashMap<Address, InMemoryToken>,
    instruction: Instruction,
) -> MarketResult<()> {
    let caller = Address(instruction.caller);
    match instruction.op {
        OpKind::Mint => {
            let asset_id = assets.mint(caller).await;
            tracing::debug!(%asset_id, owner = %caller, "asset minted");
        }
        OpKind::Approve => {
            let asset = AssetId(Instruction::require(instruction.asset, "asset")?);
            assets.approve(caller, asset, market.account()).await?;
        }
        OpKind::Deposit => {
            let amount = Instruction::require(instruction.amount, "amount")?;
            native.deposit(caller, amount).await;
        }
        OpKind::Fund => {
            let token = Address(Instruction::require(instruction.token, "token")?);
            let amount = Instruction::require(instruction.amount, "amount")?;
            tokens.entry(token).or_default().mint(caller, amount).await;
        }
        OpKind::Allow => {
            let token = Address(Instruction::require(instruction.token, "token")?);
            let amount = Instruction::require(instruction.amount, "amount")?;
            tokens
                .entry(token)
                .or_default()
                .approve(caller, market.account(), amount)
                .await;
        }
        OpKind::RegisterToken => {
            let token = Address(Instruction::require(instruction.token, "token")?);
            let rate = Instruction::require(instruction.amount, "amount")?;
            let capability = tokens.entry(token).or_default().clone();
            market
                .add_payment_token(caller, token, rate, Arc::new(capability))
                .await?;
        }
        OpKind::RemoveToken => {
            let token = Address(Instruction::require(instruction.token, "token")?);
            market.remove_payment_token(caller, token).await?;
        }
        OpKind::CommissionRate => {
            let rate = Instruction::require(instruction.amount, "amount")?;
            let rate = u8::try_from(rate).map_err(|_| MarketError::CommissionRateOutOfRange)?;
            market.set_commission_rate(caller, rate).await?;
        }
        OpKind::CommissionBeneficiary => {
            let to = Address(Instruction::require(instruction.to, "to")?);
            market.set_commission_beneficiary(caller, to).await?;
        }
        OpKind::AddOrder => {
            let asset = AssetId(Instruction::require(instruction.asset, "asset")?);
            let price = Instruction::require(instruction.price, "price")?;
            market
                .add_order(caller, asset, price, instruction.token.map(Address))
                .await?;
        }
        OpKind::CancelOrder => {
            let order = OrderId(Instruction::require(instruction.order, "order")?);
            market.cancel_order(caller, order).await?;
        }
        OpKind::BuyEther => {
            let order = OrderId(Instruction::require(instruction.order, "order")?);
            let value = Instruction::require(instruction.amount, "amount")?;
            market.execute_order_with_ether(caller, order, value).await?;
        }
        OpKind::BuyToken => {
            let order = OrderId(Instruction::require(instruction.order, "order")?);
            let price = Instruction::require(instruction.price, "price")?;
            let token = Address(Instruction::require(instruction.token, "token")?);
            market
                .execute_order_with_payment_token(caller, order, price, token)
                .await?;
        }
    }
    Ok(())
}
