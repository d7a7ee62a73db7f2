use bonus_common::OrderNumber;
use bonus_engine::{
    db_types::{BonusBalance, BonusMovement, MovementType, NewOrder, NewWithdrawal, Order},
    InsertOrderResult,
    LedgerError,
    LedgerManagement,
    OrderManagement,
};
use mockall::mock;

mock! {
    pub OrderManager {}
    impl OrderManagement for OrderManager {
        async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, LedgerError>;
        async fn fetch_order(&self, order_id: &OrderNumber) -> Result<Option<Order>, LedgerError>;
        async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, LedgerError>;
    }
}

mock! {
    pub LedgerManager {}
    impl LedgerManagement for LedgerManager {
        async fn fetch_balance(&self, user_id: i64) -> Result<BonusBalance, LedgerError>;
        async fn withdraw(&self, withdrawal: NewWithdrawal) -> Result<(BonusMovement, BonusBalance), LedgerError>;
        async fn fetch_movements(
            &self,
            user_id: i64,
            movement_type: Option<MovementType>,
        ) -> Result<Vec<BonusMovement>, LedgerError>;
    }
}
