use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

/// Every reject reason the marketplace can produce.
///
/// Each variant is a stable, independently testable condition; the message is
/// part of the observable contract. `kind` groups variants into the coarse
/// failure classes callers usually branch on.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Caller is not the marketplace owner")]
    NotMarketOwner,
    #[error("Caller does not own the asset")]
    NotAssetOwner,
    #[error("Marketplace is not approved to transfer the asset")]
    MarketplaceNotApproved,
    #[error("Caller is not the seller")]
    NotSeller,

    #[error("Order does not exist")]
    OrderNotFound,
    #[error("Asset does not exist")]
    AssetNotFound,

    #[error("Order is not active")]
    OrderNotActive,

    #[error("Price must be positive")]
    NonPositivePrice,
    #[error("Payment token is not registered")]
    PaymentTokenNotRegistered,
    #[error("Payment token does not match order")]
    PaymentTokenMismatch,
    #[error("Price has changed")]
    PriceMismatch,
    #[error("Seller must be different than buyer")]
    SellerIsBuyer,
    #[error("Commission rate must be between 0 and 100")]
    CommissionRateOutOfRange,

    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Insufficient allowance")]
    InsufficientAllowance,

    #[error("Invalid instruction: {0}")]
    InvalidInstruction(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse failure classes, one per family of reject reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    NotFound,
    State,
    Validation,
    InsufficientFunds,
    Internal,
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotMarketOwner
            | Self::NotAssetOwner
            | Self::MarketplaceNotApproved
            | Self::NotSeller => ErrorKind::Authorization,
            Self::OrderNotFound | Self::AssetNotFound => ErrorKind::NotFound,
            Self::OrderNotActive => ErrorKind::State,
            Self::NonPositivePrice
            | Self::PaymentTokenNotRegistered
            | Self::PaymentTokenMismatch
            | Self::PriceMismatch
            | Self::SellerIsBuyer
            | Self::CommissionRateOutOfRange
            | Self::InvalidInstruction(_) => ErrorKind::Validation,
            Self::InsufficientFunds | Self::InsufficientAllowance => ErrorKind::InsufficientFunds,
            Self::Csv(_) | Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
            #[cfg(feature = "storage-rocksdb")]
            Self::Storage(_) => ErrorKind::Internal,
        }
    }
}
