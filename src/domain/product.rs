use super::errors::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
}

/// The mutable fields of a product, as supplied on create, update and import.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: f64,
}

impl ProductInput {
    pub fn new(name: impl Into<String>, description: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::invalid("product name must not be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DomainError::invalid(format!(
                "product price must be a non-negative number, got {}",
                self.price
            )));
        }
        Ok(())
    }
}
