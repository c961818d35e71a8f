use crate::domain::errors::DomainError;
use crate::domain::order::{validate_order, Order, OrderItemInput, OrderStatus};
use crate::domain::ports::OrderRepository;

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_order(
        &self,
        user_id: &str,
        items: Vec<OrderItemInput>,
    ) -> Result<Order, DomainError> {
        validate_order(user_id, &items)?;
        self.repo.create(user_id, items)
    }

    pub fn get_order(&self, id: &str) -> Result<Order, DomainError> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("Order not found."))
    }

    pub fn update_order_status(
        &self,
        id: &str,
        new_status: OrderStatus,
    ) -> Result<Order, DomainError> {
        self.repo
            .update_status(id, new_status)?
            .ok_or_else(|| DomainError::not_found("Order not found to update."))
    }

    pub fn count_orders(&self) -> Result<i64, DomainError> {
        self.repo.count()
    }

    pub fn export_orders(&self) -> Result<String, DomainError> {
        self.repo.export()
    }
}
