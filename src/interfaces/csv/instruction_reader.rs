use crate::error::{MarketError, Result};
use serde::Deserialize;
use std::io::Read;

/// One row of a replay scenario. The first rows of a scenario usually drive
/// the collaborator doubles (minting assets, funding accounts, granting
/// approvals); the rest exercise the marketplace itself.
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum OpKind {
    /// Mint an asset to `caller` in the asset registry.
    Mint,
    /// Approve the marketplace for `asset` (caller must own it).
    Approve,
    /// Credit `amount` native units to `caller`.
    Deposit,
    /// Mint `amount` units of `token` to `caller`.
    Fund,
    /// Grant the marketplace an allowance of `amount` units of `token`.
    Allow,
    /// Register `token` with rate `amount` (owner only).
    RegisterToken,
    /// Remove `token` from the registry (owner only).
    RemoveToken,
    /// Set the commission rate to `amount` percent (owner only).
    CommissionRate,
    /// Set the commission beneficiary to `to` (owner only).
    CommissionBeneficiary,
    /// List `asset` at `price`, optionally priced in `token`.
    AddOrder,
    /// Cancel `order` (caller must be the seller).
    CancelOrder,
    /// Buy `order` attaching `amount` native units.
    BuyEther,
    /// Buy `order` paying `price` units of `token`.
    BuyToken,
}

/// Scenario row. Columns not used by an op are left empty.
///
/// Header: `op, caller, asset, order, price, token, amount, to`
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Instruction {
    pub op: OpKind,
    pub caller: u64,
    pub asset: Option<u64>,
    pub order: Option<u64>,
    pub price: Option<u128>,
    pub token: Option<u64>,
    pub amount: Option<u128>,
    pub to: Option<u64>,
}

impl Instruction {
    /// Extracts a column an op requires, naming it in the failure.
    pub fn require<T: Copy>(field: Option<T>, name: &str) -> Result<T> {
        field.ok_or_else(|| MarketError::InvalidInstruction(format!("missing column '{name}'")))
    }
}

/// Reads instructions from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over `Result<Instruction>`,
/// trimming whitespace and tolerating short records so scenarios can omit
/// trailing columns.
pub struct InstructionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> InstructionReader<R> {
    /// Creates a new `InstructionReader` from any `Read` source (e.g., File,
    /// Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes instructions,
    /// so large scenarios stream without loading into memory.
    pub fn instructions(self) -> impl Iterator<Item = Result<Instruction>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(MarketError::from))
    }
}
