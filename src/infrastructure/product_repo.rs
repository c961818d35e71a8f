use std::ops::ControlFlow;

use diesel::connection::DefaultLoadingMode;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::ProductRepository;
use crate::domain::product::{Product, ProductInput};
use crate::schema::products;

use super::ids::{generate_id, with_fresh_id, PRODUCT_ID_PREFIX};
use super::models::{NewProductRow, ProductRow};

pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn insert_product(
    conn: &mut SqliteConnection,
    product_id: &str,
    input: &ProductInput,
) -> QueryResult<usize> {
    diesel::insert_into(products::table)
        .values(&NewProductRow {
            product_id,
            name: &input.name,
            description: Some(&input.description),
            price: input.price,
        })
        .execute(conn)
}

fn find_row(conn: &mut SqliteConnection, id: &str) -> QueryResult<Option<ProductRow>> {
    products::table
        .find(id)
        .select(ProductRow::as_select())
        .first(conn)
        .optional()
}

impl ProductRepository for DieselProductRepository {
    fn create(&self, input: ProductInput) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        let row = with_fresh_id(
            || generate_id(PRODUCT_ID_PREFIX),
            |product_id| {
                conn.immediate_transaction(|conn| {
                    insert_product(conn, product_id, &input)?;
                    products::table
                        .find(product_id)
                        .select(ProductRow::as_select())
                        .first(conn)
                })
            },
        )?;

        log::debug!("created product {}", row.product_id);
        Ok(row.into())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(find_row(&mut conn, id)?.map(Product::from))
    }

    fn update(&self, id: &str, input: ProductInput) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = conn.immediate_transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(products::table.find(id))
                .set((
                    products::name.eq(&input.name),
                    products::description.eq(Some(&input.description)),
                    products::price.eq(input.price),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Ok(None);
            }
            Ok(find_row(conn, id)?)
        })?;

        Ok(row.map(Product::from))
    }

    fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(products::table.find(id)).execute(&mut conn)?;
        if deleted > 0 {
            log::debug!("deleted product {}", id);
        }
        Ok(deleted > 0)
    }

    fn scan(
        &self,
        visit: &mut dyn FnMut(Product) -> ControlFlow<()>,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let rows = products::table
            .select(ProductRow::as_select())
            .load_iter::<ProductRow, DefaultLoadingMode>(&mut conn)?;
        for row in rows {
            if visit(row?.into()).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn count(&self) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(products::table.count().get_result(&mut conn)?)
    }

    fn export(&self) -> Result<String, DomainError> {
        let mut conn = self.pool.get()?;
        let rows: Vec<ProductRow> = products::table
            .select(ProductRow::as_select())
            .load(&mut conn)?;
        Ok(serde_json::to_string_pretty(&rows)?)
    }

    fn import(&self, inputs: Vec<ProductInput>) -> Result<usize, DomainError> {
        let mut conn = self.pool.get()?;

        let imported = conn.immediate_transaction::<_, DomainError, _>(|conn| {
            for input in &inputs {
                with_fresh_id(
                    || generate_id(PRODUCT_ID_PREFIX),
                    |product_id| insert_product(conn, product_id, input),
                )?;
            }
            Ok(inputs.len())
        })?;

        log::debug!("imported {} products", imported);
        Ok(imported)
    }
}
