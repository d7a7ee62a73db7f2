//! An in-memory backend.
//!
//! `MemoryDatabase` follows the same rules as the Postgres backend: claims skip orders that are held by another open
//! batch, batch writes only become visible on commit, and balances are recomputed from the full ledger whenever a
//! movement is appended. It exists so that the pipeline and the APIs can be tested without a database server.
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use bonus_common::{OrderNumber, Points};
use chrono::Utc;

use crate::{
    db_types::{
        BonusBalance,
        BonusMovement,
        MovementType,
        NewMovement,
        NewOrder,
        NewWithdrawal,
        Order,
        OrderStatusType,
        OrderUpdate,
    },
    ClaimedBatch,
    InsertOrderResult,
    LedgerError,
    LedgerManagement,
    OrderManagement,
    ReconciliationDatabase,
};

#[derive(Debug, Default)]
struct MemoryState {
    orders: BTreeMap<OrderNumber, Order>,
    movements: Vec<BonusMovement>,
    balances: HashMap<i64, BonusBalance>,
    claimed: HashSet<OrderNumber>,
    failing_updates: HashSet<OrderNumber>,
}

impl MemoryState {
    fn append_movement(&mut self, movement: NewMovement) -> Result<(BonusMovement, BonusBalance), LedgerError> {
        let user_id = movement.user_id;
        let balance = self.balances.get(&user_id).copied().unwrap_or_else(|| BonusBalance::zero(user_id));
        if movement.movement_type == MovementType::Withdrawal && movement.amount > balance.current {
            return Err(LedgerError::InsufficientFunds { requested: movement.amount, available: balance.current });
        }
        let already_credited = movement.movement_type == MovementType::Accrual &&
            self.movements.iter().any(|m| m.movement_type == MovementType::Accrual && m.order_id == movement.order_id);
        if already_credited {
            return Err(LedgerError::LedgerInconsistency {
                user_id,
                message: format!("order {:?} has already been credited", movement.order_id),
            });
        }
        let movement = BonusMovement {
            id: self.movements.len() as i64 + 1,
            created_at: Utc::now(),
            user_id,
            movement_type: movement.movement_type,
            amount: movement.amount,
            order_id: movement.order_id,
        };
        self.movements.push(movement.clone());
        let balance = self.recompute_balance(user_id)?;
        Ok((movement, balance))
    }

    fn recompute_balance(&mut self, user_id: i64) -> Result<BonusBalance, LedgerError> {
        let sum = |t: MovementType| -> Points {
            self.movements.iter().filter(|m| m.user_id == user_id && m.movement_type == t).map(|m| m.amount).sum()
        };
        let accrued = sum(MovementType::Accrual);
        let withdrawn = sum(MovementType::Withdrawal);
        let current = accrued - withdrawn;
        if current.is_negative() {
            return Err(LedgerError::LedgerInconsistency {
                user_id,
                message: format!("accrued {accrued} is less than withdrawn {withdrawn}"),
            });
        }
        let balance = BonusBalance { user_id, current, withdrawn };
        self.balances.insert(user_id, balance);
        Ok(balance)
    }

    fn movements_for(&self, user_id: i64, movement_type: Option<MovementType>) -> Vec<BonusMovement> {
        self.movements
            .iter()
            .filter(|m| m.user_id == user_id && movement_type.map_or(true, |t| m.movement_type == t))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory database lock poisoned")
    }

    /// Stores an order as-is, replacing any order with the same number.
    pub fn seed_order(&self, order: Order) {
        self.lock().orders.insert(order.id.clone(), order);
    }

    /// Stores a new order for `user_id` in the given status.
    pub fn seed(&self, order_id: &str, user_id: i64, status: OrderStatusType) -> Order {
        let order = Order {
            id: OrderNumber::parse(order_id).expect("seeded order numbers must be valid"),
            user_id,
            status,
            accrual: None,
            last_error: None,
            uploaded_at: Utc::now(),
        };
        self.seed_order(order.clone());
        order
    }

    /// Appends a movement directly, outside of any batch. Follows the same rules as the ledger.
    pub fn append_movement(&self, movement: NewMovement) -> Result<(BonusMovement, BonusBalance), LedgerError> {
        self.lock().append_movement(movement)
    }

    pub fn order(&self, order_id: &OrderNumber) -> Option<Order> {
        self.lock().orders.get(order_id).cloned()
    }

    pub fn all_movements(&self) -> Vec<BonusMovement> {
        self.lock().movements.clone()
    }

    pub fn cached_balance(&self, user_id: i64) -> Option<BonusBalance> {
        self.lock().balances.get(&user_id).copied()
    }

    /// The number of orders currently held by open batches.
    pub fn claimed_count(&self) -> usize {
        self.lock().claimed.len()
    }

    /// Makes every batch update of this order fail, as if the database rejected it.
    pub fn fail_updates_for(&self, order_id: &OrderNumber) {
        self.lock().failing_updates.insert(order_id.clone());
    }
}

impl OrderManagement for MemoryDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, LedgerError> {
        let mut state = self.lock();
        if let Some(existing) = state.orders.get(&order.id) {
            return Ok(InsertOrderResult::AlreadyExists(existing.clone()));
        }
        let order = Order {
            id: order.id,
            user_id: order.user_id,
            status: OrderStatusType::New,
            accrual: None,
            last_error: None,
            uploaded_at: order.uploaded_at,
        };
        state.orders.insert(order.id.clone(), order.clone());
        Ok(InsertOrderResult::Inserted(order))
    }

    async fn fetch_order(&self, order_id: &OrderNumber) -> Result<Option<Order>, LedgerError> {
        Ok(self.order(order_id))
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, LedgerError> {
        let mut orders = self.lock().orders.values().filter(|o| o.user_id == user_id).cloned().collect::<Vec<_>>();
        orders.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then_with(|| a.id.cmp(&b.id)));
        Ok(orders)
    }
}

impl LedgerManagement for MemoryDatabase {
    async fn fetch_balance(&self, user_id: i64) -> Result<BonusBalance, LedgerError> {
        Ok(self.cached_balance(user_id).unwrap_or_else(|| BonusBalance::zero(user_id)))
    }

    async fn withdraw(&self, withdrawal: NewWithdrawal) -> Result<(BonusMovement, BonusBalance), LedgerError> {
        self.append_movement(withdrawal.into())
    }

    async fn fetch_movements(
        &self,
        user_id: i64,
        movement_type: Option<MovementType>,
    ) -> Result<Vec<BonusMovement>, LedgerError> {
        Ok(self.lock().movements_for(user_id, movement_type))
    }
}

/// A batch claimed from a [`MemoryDatabase`]. Updates are staged and applied on commit.
#[derive(Debug)]
pub struct MemoryBatch {
    db: MemoryDatabase,
    orders: Vec<Order>,
    staged: Vec<OrderUpdate>,
}

impl MemoryBatch {
    fn release(&self) {
        let mut state = self.db.lock();
        for order in &self.orders {
            state.claimed.remove(&order.id);
        }
    }
}

impl Drop for MemoryBatch {
    fn drop(&mut self) {
        self.release();
    }
}

impl ReconciliationDatabase for MemoryDatabase {
    type Batch = MemoryBatch;

    async fn claim_batch(&self, limit: usize) -> Result<MemoryBatch, LedgerError> {
        let mut state = self.lock();
        let mut candidates = state
            .orders
            .values()
            .filter(|o| OrderStatusType::PENDING.contains(&o.status) && !state.claimed.contains(&o.id))
            .cloned()
            .collect::<Vec<_>>();
        candidates.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then_with(|| a.id.cmp(&b.id)));
        candidates.truncate(limit);
        for order in &candidates {
            state.claimed.insert(order.id.clone());
        }
        Ok(MemoryBatch { db: self.clone(), orders: candidates, staged: Vec::new() })
    }
}

impl ClaimedBatch for MemoryBatch {
    fn orders(&self) -> &[Order] {
        &self.orders
    }

    async fn apply_update(&mut self, update: &OrderUpdate) -> Result<Option<BonusMovement>, LedgerError> {
        if self.db.lock().failing_updates.contains(&update.order_id) {
            let message = format!("injected failure for order {}", update.order_id);
            return Err(LedgerError::DriverError(sqlx::Error::Protocol(message)));
        }
        self.staged.push(update.clone());
        let movement = update.credit.map(|amount| BonusMovement {
            id: 0,
            created_at: Utc::now(),
            user_id: update.user_id,
            movement_type: MovementType::Accrual,
            amount,
            order_id: Some(update.order_id.clone()),
        });
        Ok(movement)
    }

    async fn commit(mut self) -> Result<(), LedgerError> {
        let staged = std::mem::take(&mut self.staged);
        let mut state = self.db.lock();
        for update in staged {
            if let Some(order) = state.orders.get_mut(&update.order_id) {
                order.status = update.status;
                order.accrual = update.accrual;
                order.last_error = update.last_error.clone();
            }
            if let Some(amount) = update.credit {
                state.append_movement(NewMovement::accrual(update.user_id, update.order_id, amount))?;
            }
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        Ok(())
    }
}
