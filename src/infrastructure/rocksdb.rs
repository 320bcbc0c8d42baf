use crate::domain::order::{Order, OrderId};
use crate::domain::ports::OrderStore;
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for the order book.
pub const CF_ORDERS: &str = "orders";

/// Persistent order store backed by RocksDB.
///
/// Keys are big-endian order ids so the natural key order matches id order;
/// values are JSON-encoded `Order` records. `Clone` shares the underlying
/// `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbOrderStore {
    db: Arc<DB>,
}

impl RocksDbOrderStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the orders column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_ORDERS).ok_or_else(|| {
            MarketError::Internal(Box::new(std::io::Error::other(
                "Orders column family not found",
            )))
        })
    }

    fn put(&self, order: &Order) -> Result<()> {
        let cf = self.cf()?;
        let key = order.id.0.to_be_bytes();
        let value = serde_json::to_vec(order)
            .map_err(|e| MarketError::Internal(Box::new(e)))?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for RocksDbOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        self.put(&order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let cf = self.cf()?;
        let key = order_id.0.to_be_bytes();

        if let Some(bytes) = self.db.get_cf(cf, key)? {
            let order =
                serde_json::from_slice(&bytes).map_err(|e| MarketError::Internal(Box::new(e)))?;
            Ok(Some(order))
        } else {
            Ok(None)
        }
    }

    async fn update(&self, order: Order) -> Result<()> {
        self.put(&order)
    }

    async fn last_order_id(&self) -> Result<Option<OrderId>> {
        let cf = self.cf()?;
        let mut iter = self.db.iterator_cf(cf, rocksdb::IteratorMode::End);

        match iter.next() {
            Some(item) => {
                let (key, _value) = item?;
                let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                    MarketError::Internal(Box::new(std::io::Error::other("Malformed order key")))
                })?;
                Ok(Some(OrderId(u64::from_be_bytes(bytes))))
            }
            None => Ok(None),
        }
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let cf = self.cf()?;
        let mut orders = Vec::new();
        let iter = self.db.iterator_cf(cf, rocksdb::IteratorMode::Start);

        for item in iter {
            let (_key, value) = item?;
            let order: Order =
                serde_json::from_slice(&value).map_err(|e| MarketError::Internal(Box::new(e)))?;
            orders.push(order);
        }

        Ok(orders)
    }
}
