use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::ports::{OrderPage, OrderStore, page_offset};
use crate::error::{OrderError, Result};
use crate::infrastructure::record::OrderRecord;
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, TransactionDB,
    TransactionDBOptions,
};
use std::path::Path;
use std::sync::Arc;

/// Column Family for order documents, keyed by order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family indexing orders by user and creation time.
pub const CF_ORDERS_BY_USER: &str = "orders_by_user";

const SEPARATOR: u8 = 0;

/// A persistent store implementation using RocksDB.
///
/// Order documents live in `orders`; `orders_by_user` holds one empty value per
/// order under `user \0 created_at \0 id`, so a forward scan of a user's prefix
/// yields their orders oldest first. Inserts and conditional replaces run inside
/// a RocksDB transaction with `get_for_update`, which makes the existence or
/// status check and the write a single atomic step.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<TransactionDB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let cf_by_user = ColumnFamilyDescriptor::new(CF_ORDERS_BY_USER, Options::default());

        let db = TransactionDB::open_cf_descriptors(
            &opts,
            &TransactionDBOptions::default(),
            path,
            vec![cf_orders, cf_by_user],
        )?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| OrderError::internal(format!("{} column family not found", name)))
    }

    fn user_prefix(user_id: &str) -> Vec<u8> {
        let mut key = user_id.as_bytes().to_vec();
        key.push(SEPARATOR);
        key
    }

    fn index_key(record: &OrderRecord) -> Vec<u8> {
        let mut key = Self::user_prefix(&record.user_id);
        key.extend_from_slice(record.created_at.as_bytes());
        key.push(SEPARATOR);
        key.extend_from_slice(record.id.as_bytes());
        key
    }

    fn decode(bytes: &[u8]) -> Result<Order> {
        let record: OrderRecord = serde_json::from_slice(bytes)?;
        Order::try_from(record)
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn save(&self, order: &Order) -> Result<()> {
        let orders = self.cf(CF_ORDERS)?;
        let by_user = self.cf(CF_ORDERS_BY_USER)?;

        let record = OrderRecord::from(order);
        let key = record.id.as_bytes();
        let value = serde_json::to_vec(&record)?;

        let txn = self.db.transaction();
        if txn.get_for_update_cf(orders, key, true)?.is_some() {
            return Err(OrderError::Conflict(format!(
                "order {} already exists",
                record.id
            )));
        }
        txn.put_cf(orders, key, value)?;
        txn.put_cf(by_user, Self::index_key(&record), b"")?;
        txn.commit()?;

        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Order> {
        let orders = self.cf(CF_ORDERS)?;
        let key = id.to_string();

        match self.db.get_cf(orders, key.as_bytes())? {
            Some(bytes) => Self::decode(&bytes),
            None => Err(OrderError::NotFound(key)),
        }
    }

    async fn find_by_user(&self, user_id: &str, page: u32, page_size: u32) -> Result<OrderPage> {
        let orders = self.cf(CF_ORDERS)?;
        let by_user = self.cf(CF_ORDERS_BY_USER)?;
        let prefix = Self::user_prefix(user_id);

        let mut keys = Vec::new();
        let iter = self
            .db
            .iterator_cf(by_user, IteratorMode::From(prefix.as_slice(), Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            keys.push(key);
        }

        let total = keys.len() as u64;
        let offset = usize::try_from(page_offset(page, page_size)).unwrap_or(usize::MAX);

        let mut page_orders = Vec::new();
        for key in keys.iter().rev().skip(offset).take(page_size as usize) {
            let id = key
                .rsplit(|b| *b == SEPARATOR)
                .next()
                .ok_or_else(|| OrderError::internal("malformed user index key"))?;
            let bytes = self.db.get_cf(orders, id)?.ok_or_else(|| {
                OrderError::internal(format!(
                    "user index points at missing order {}",
                    String::from_utf8_lossy(id)
                ))
            })?;
            page_orders.push(Self::decode(&bytes)?);
        }

        Ok(OrderPage {
            orders: page_orders,
            total,
        })
    }

    async fn replace(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        let orders = self.cf(CF_ORDERS)?;
        let record = OrderRecord::from(order);
        let key = record.id.as_bytes();

        let txn = self.db.transaction();
        let stored = txn
            .get_for_update_cf(orders, key, true)?
            .ok_or_else(|| OrderError::NotFound(record.id.clone()))?;
        let stored: OrderRecord = serde_json::from_slice(&stored)?;

        let actual: OrderStatus = stored.status.parse()?;
        if actual != expected {
            return Err(OrderError::StatusPrecondition {
                order_id: order.id(),
                expected,
                actual,
            });
        }
        if stored.user_id != record.user_id || stored.created_at != record.created_at {
            return Err(OrderError::invalid(format!(
                "order {} owner and creation time are immutable",
                record.id
            )));
        }

        txn.put_cf(orders, key, serde_json::to_vec(&record)?)?;
        txn.commit()?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let orders = self.cf(CF_ORDERS)?;
        self.cf(CF_ORDERS_BY_USER)?;
        self.db.get_cf(orders, b"__ping__")?;
        Ok(())
    }
}
