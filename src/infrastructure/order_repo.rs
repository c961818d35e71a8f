use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{total_amount, Order, OrderItem, OrderItemInput, OrderStatus};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_items, orders};

use super::ids::{generate_id, with_fresh_id, ORDER_ID_PREFIX};
use super::models::{NewOrderItemRow, NewOrderRow, OrderExport, OrderItemRow, OrderRow};

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn load_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> QueryResult<Option<(OrderRow, Vec<OrderItemRow>)>> {
    let order = orders::table
        .find(order_id)
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?;

    let Some(order) = order else {
        return Ok(None);
    };

    let items = OrderItemRow::belonging_to(&order)
        .select(OrderItemRow::as_select())
        .order(order_items::item_id.asc())
        .load(conn)?;

    Ok(Some((order, items)))
}

fn to_order(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Order, DomainError> {
    let status = OrderStatus::from_code(row.status).ok_or_else(|| {
        DomainError::Internal(format!(
            "order {} has unknown status code {}",
            row.order_id, row.status
        ))
    })?;

    Ok(Order {
        order_id: row.order_id,
        user_id: row.user_id,
        status,
        total_amount: row.total_amount,
        items: items
            .into_iter()
            .map(|i| OrderItem {
                item_id: i.item_id,
                order_id: i.order_id,
                product_id: i.product_id,
                quantity: i.quantity,
                price_per_item: i.price_per_item,
            })
            .collect(),
    })
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, user_id: &str, items: Vec<OrderItemInput>) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;
        let total = total_amount(&items);

        let (order, lines) = with_fresh_id(
            || generate_id(ORDER_ID_PREFIX),
            |order_id| {
                conn.immediate_transaction(|conn| {
                    // 1. Insert the order
                    diesel::insert_into(orders::table)
                        .values(&NewOrderRow {
                            order_id,
                            user_id,
                            status: OrderStatus::Pending.code(),
                            total_amount: total,
                        })
                        .execute(conn)?;

                    // 2. Insert its items, priced as supplied
                    let new_items: Vec<NewOrderItemRow> = items
                        .iter()
                        .map(|i| NewOrderItemRow {
                            order_id,
                            product_id: &i.product_id,
                            quantity: i.quantity,
                            price_per_item: i.price_per_item,
                        })
                        .collect();
                    if !new_items.is_empty() {
                        diesel::insert_into(order_items::table)
                            .values(&new_items)
                            .execute(conn)?;
                    }

                    load_order(conn, order_id)?.ok_or(diesel::result::Error::NotFound)
                })
            },
        )?;

        log::debug!("created order {} with {} items", order.order_id, lines.len());
        to_order(order, lines)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let found = conn.transaction(|conn| load_order(conn, id))?;

        found.map(|(order, items)| to_order(order, items)).transpose()
    }

    fn update_status(&self, id: &str, status: OrderStatus) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let found = conn.immediate_transaction(|conn| {
            let updated = diesel::update(orders::table.find(id))
                .set(orders::status.eq(status.code()))
                .execute(conn)?;
            if updated == 0 {
                return Ok(None);
            }
            load_order(conn, id)
        })?;

        found.map(|(order, items)| to_order(order, items)).transpose()
    }

    fn count(&self) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(orders::table.count().get_result(&mut conn)?)
    }

    fn export(&self) -> Result<String, DomainError> {
        let mut conn = self.pool.get()?;

        let (order_rows, item_rows) = conn.transaction(|conn| {
            let order_rows: Vec<OrderRow> = orders::table
                .select(OrderRow::as_select())
                .load(conn)?;
            let item_rows: Vec<OrderItemRow> = order_items::table
                .select(OrderItemRow::as_select())
                .order(order_items::item_id.asc())
                .load(conn)?;
            Ok::<_, diesel::result::Error>((order_rows, item_rows))
        })?;

        let grouped = item_rows.grouped_by(&order_rows);
        let document: Vec<OrderExport> = order_rows
            .into_iter()
            .zip(grouped)
            .map(|(order, items)| OrderExport { order, items })
            .collect();

        Ok(serde_json::to_string_pretty(&document)?)
    }
}
