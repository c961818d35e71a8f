use std::ops::ControlFlow;

use super::errors::DomainError;
use super::order::{Order, OrderItemInput, OrderStatus};
use super::product::{Product, ProductInput};

/// Storage for products. Absence is reported as `Ok(None)` / `Ok(false)`;
/// `Err` is reserved for storage faults.
pub trait ProductRepository: Send + Sync + 'static {
    fn create(&self, input: ProductInput) -> Result<Product, DomainError>;
    fn find_by_id(&self, id: &str) -> Result<Option<Product>, DomainError>;
    fn update(&self, id: &str, input: ProductInput) -> Result<Option<Product>, DomainError>;
    fn delete(&self, id: &str) -> Result<bool, DomainError>;
    /// Visits every product in scan order until `visit` breaks or rows run out.
    fn scan(&self, visit: &mut dyn FnMut(Product) -> ControlFlow<()>)
        -> Result<(), DomainError>;
    fn count(&self) -> Result<i64, DomainError>;
    fn export(&self) -> Result<String, DomainError>;
    /// Inserts all products in one transaction; nothing is kept on failure.
    fn import(&self, inputs: Vec<ProductInput>) -> Result<usize, DomainError>;

    #[cfg(test)]
    fn list(&self) -> Result<Vec<Product>, DomainError> {
        let mut products = Vec::new();
        self.scan(&mut |p| {
            products.push(p);
            ControlFlow::Continue(())
        })?;
        Ok(products)
    }
}

pub trait OrderRepository: Send + Sync + 'static {
    fn create(&self, user_id: &str, items: Vec<OrderItemInput>) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: &str) -> Result<Option<Order>, DomainError>;
    fn update_status(&self, id: &str, status: OrderStatus) -> Result<Option<Order>, DomainError>;
    fn count(&self) -> Result<i64, DomainError>;
    fn export(&self) -> Result<String, DomainError>;
}
