use std::ops::ControlFlow;

use serde::Deserialize;

use crate::domain::errors::DomainError;
use crate::domain::ports::ProductRepository;
use crate::domain::product::{Product, ProductInput};

/// One record of an import document. Matches the export shape; a
/// `product_id`, if present, is ignored.
#[derive(Debug, Deserialize)]
struct ImportRecord {
    name: String,
    #[serde(default)]
    description: Option<String>,
    price: f64,
}

pub struct ProductService<R> {
    repo: R,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_product(&self, input: ProductInput) -> Result<Product, DomainError> {
        input.validate()?;
        self.repo.create(input)
    }

    pub fn get_product(&self, id: &str) -> Result<Product, DomainError> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("Product not found."))
    }

    pub fn update_product(&self, id: &str, input: ProductInput) -> Result<Product, DomainError> {
        input.validate()?;
        self.repo
            .update(id, input)?
            .ok_or_else(|| DomainError::not_found("Product not found to update."))
    }

    pub fn delete_product(&self, id: &str) -> Result<bool, DomainError> {
        self.repo.delete(id)
    }

    /// Hands products to `sink` one at a time as the store yields them.
    /// The scan ends early once `sink` returns `ControlFlow::Break`.
    pub fn stream_products(
        &self,
        mut sink: impl FnMut(Product) -> ControlFlow<()>,
    ) -> Result<(), DomainError> {
        self.repo.scan(&mut sink)
    }

    pub fn count_products(&self) -> Result<i64, DomainError> {
        self.repo.count()
    }

    pub fn export_products(&self) -> Result<String, DomainError> {
        self.repo.export()
    }

    /// Creates a product for every record of an export-shaped document.
    /// All records are validated first; the insert is all-or-nothing.
    pub fn import_products(&self, document: &str) -> Result<usize, DomainError> {
        let records: Vec<ImportRecord> = serde_json::from_str(document)
            .map_err(|e| DomainError::invalid(format!("malformed product document: {e}")))?;

        let inputs = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                let input = ProductInput::new(r.name, r.description.unwrap_or_default(), r.price);
                input.validate().map_err(|e| match e {
                    DomainError::InvalidInput(msg) => {
                        DomainError::invalid(format!("record {i}: {msg}"))
                    }
                    other => other,
                })?;
                Ok(input)
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        self.repo.import(inputs)
    }
}
