use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
};

use crate::{
    Money, NewOrder, NewProduct, Order, OrderId, OrderItem, OrderItemId, Product, ProductId,
    Result, StoreError,
    store::{Catalog, OrderStore},
};

/// PostgreSQL-backed shop store.
#[derive(Clone)]
pub struct PostgresShopStore {
    pool: PgPool,
}

impl PostgresShopStore {
    /// Creates a new PostgreSQL shop store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Adds a product to the catalog and returns it with its assigned id.
    pub async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price_cents, category, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, price_cents, category, stock
            "#,
        )
        .bind(&product.name)
        .bind(product.unit_price.cents())
        .bind(&product.category)
        .bind(stock_to_db(product.stock)?)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get("price_cents")?),
            category: row.try_get("category")?,
            stock: count_from_db("stock", row.try_get("stock")?)?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            id: OrderItemId::new(row.try_get("id")?),
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: count_from_db("quantity", row.try_get("quantity")?)?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    async fn items_for_order(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.get())
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }
}

#[async_trait]
impl Catalog for PostgresShopStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, category, stock FROM products WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>> {
        let ids: Vec<i64> = ids.iter().map(ProductId::get).collect();
        let rows = sqlx::query(
            "SELECT id, name, price_cents, category, stock FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Self::row_to_product(row).map(|p| (p.id, p)))
            .collect()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, name, price_cents, category, stock FROM products ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }
}

#[async_trait]
impl OrderStore for PostgresShopStore {
    #[tracing::instrument(skip(self, order), fields(lines = order.items.len()))]
    async fn commit_order(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Ascending id order keeps concurrent checkouts from deadlocking
        for (product_id, requested) in order.stock_demand() {
            let updated = sqlx::query(
                "UPDATE products SET stock = stock - $1 WHERE id = $2 AND stock >= $1",
            )
            .bind(stock_to_db(requested)?)
            .bind(product_id.get())
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                let available: Option<i32> =
                    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
                        .bind(product_id.get())
                        .fetch_optional(&mut *tx)
                        .await?;

                tracing::warn!(%product_id, requested, "stock decrement failed, rolling back");
                // Dropping the transaction rolls back earlier decrements
                return Err(match available {
                    Some(stock) => StoreError::InsufficientStock {
                        product_id,
                        available: count_from_db("stock", stock)?,
                        requested,
                    },
                    None => StoreError::ProductNotFound(product_id),
                });
            }
        }

        let row = sqlx::query("INSERT INTO orders (order_date) VALUES ($1) RETURNING id, version")
            .bind(order.order_date)
            .fetch_one(&mut *tx)
            .await?;
        let order_id = OrderId::new(row.try_get("id")?);
        let version: i64 = row.try_get("version")?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(order_id.get())
            .bind(item.product_id.get())
            .bind(stock_to_db(item.quantity)?)
            .bind(item.unit_price.cents())
            .fetch_one(&mut *tx)
            .await?;

            items.push(OrderItem {
                id: OrderItemId::new(id),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }

        tx.commit().await?;
        tracing::debug!(%order_id, "order committed");

        Ok(Order {
            id: order_id,
            order_date: order.order_date,
            version,
            items,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query("SELECT id, order_date, version FROM orders WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let items = Self::items_for_order(&mut tx, id).await?;
        tx.commit().await?;

        Ok(Some(Order {
            id,
            order_date: row.try_get("order_date")?,
            version: row.try_get("version")?,
            items,
        }))
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let mut tx = self.pool.begin().await?;

        let order_rows = sqlx::query(
            "SELECT id, order_date, version FROM orders ORDER BY order_date DESC, id DESC",
        )
        .fetch_all(&mut *tx)
        .await?;

        let item_rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_cents
            FROM order_items
            ORDER BY order_id ASC, id ASC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let item = Self::row_to_item(row)?;
            items_by_order.entry(item.order_id).or_default().push(item);
        }

        order_rows
            .into_iter()
            .map(|row| {
                let id = OrderId::new(row.try_get("id")?);
                Ok(Order {
                    id,
                    order_date: row.try_get("order_date")?,
                    version: row.try_get("version")?,
                    items: items_by_order.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, version = order.version))]
    async fn save_order(&self, order: Order) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE orders SET version = version + 1 WHERE id = $1 AND version = $2 RETURNING order_date, version",
        )
        .bind(order.id.get())
        .bind(order.version)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                .bind(order.id.get())
                .fetch_optional(&mut *tx)
                .await?;

            return Err(match actual {
                Some(actual) => StoreError::ConcurrencyConflict {
                    order_id: order.id,
                    expected: order.version,
                    actual,
                },
                None => StoreError::OrderNotFound(order.id),
            });
        };

        let kept: Vec<i64> = order.items.iter().map(|i| i.id.get()).collect();
        sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND NOT (id = ANY($2))")
            .bind(order.id.get())
            .bind(&kept)
            .execute(&mut *tx)
            .await?;

        for item in &order.items {
            sqlx::query(
                "UPDATE order_items SET quantity = $1, unit_price_cents = $2 WHERE id = $3 AND order_id = $4",
            )
            .bind(stock_to_db(item.quantity)?)
            .bind(item.unit_price.cents())
            .bind(item.id.get())
            .bind(order.id.get())
            .execute(&mut *tx)
            .await?;
        }

        let items = Self::items_for_order(&mut tx, order.id).await?;
        tx.commit().await?;

        Ok(Order {
            id: order.id,
            order_date: row.try_get("order_date")?,
            version: row.try_get("version")?,
            items,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }
}

/// Counts are `u32` in the domain and `INTEGER` in the schema.
fn stock_to_db(count: u32) -> Result<i32> {
    i32::try_from(count)
        .map_err(|_| StoreError::Unavailable(format!("count {count} exceeds column range")))
}

fn count_from_db(column: &'static str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::InvalidData {
        column,
        value: i64::from(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_convert_within_range() {
        assert_eq!(count_from_db("stock", 7).unwrap(), 7);
        assert_eq!(stock_to_db(7).unwrap(), 7);
        assert!(stock_to_db(u32::MAX).is_err());
    }

    #[test]
    fn negative_count_is_invalid_data() {
        let err = count_from_db("quantity", -3).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidData {
                column: "quantity",
                value: -3
            }
        ));
    }
}
