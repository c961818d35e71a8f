use diesel::prelude::*;
use serde::Serialize;

use crate::domain::product::Product;
use crate::schema::{order_items, orders, products};

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products, primary_key(product_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductRow {
    pub product_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            product_id: row.product_id,
            name: row.name,
            description: row.description.unwrap_or_default(),
            price: row.price,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow<'a> {
    pub product_id: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders, primary_key(order_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRow {
    pub order_id: String,
    pub user_id: String,
    pub status: i32,
    pub total_amount: f64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow<'a> {
    pub order_id: &'a str,
    pub user_id: &'a str,
    pub status: i32,
    pub total_amount: f64,
}

#[derive(
    Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Associations,
)]
#[diesel(table_name = order_items, primary_key(item_id))]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderItemRow {
    pub item_id: i32,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub price_per_item: f64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow<'a> {
    pub order_id: &'a str,
    pub product_id: &'a str,
    pub quantity: i32,
    pub price_per_item: f64,
}

/// One entry of the orders export document: the stored order row with its
/// items nested under `items`.
#[derive(Debug, Serialize)]
pub struct OrderExport {
    #[serde(flatten)]
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
}
