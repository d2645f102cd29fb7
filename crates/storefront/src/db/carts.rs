//! Cart queries.
//!
//! Carts are created lazily the first time a visitor adds something. Signed-in
//! customers have at most one cart (`UNIQUE(user_id)`); guests are keyed by a
//! random value stored in their session.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use author_store_core::{CartId, CartItemId, CouponId, ProductId};

use super::RepositoryError;
use super::catalog::{PRODUCT_SELECT, ProductRow};
use crate::models::{Cart, CartLine, CartOwner, Product};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    coupon_id: Option<CouponId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    line_id: CartItemId,
    quantity: i32,
    added_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: row.line_id,
            product: Product::from(row.product),
            quantity: row.quantity,
            added_at: row.added_at,
        }
    }
}

/// A cart line joined with its product row, locked for checkout.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_available: bool,
    pub quantity: i32,
}

pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The owner's cart id, if they have one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, owner: &CartOwner) -> Result<Option<CartId>, RepositoryError> {
        let id = match owner {
            CartOwner::User(user_id) => {
                sqlx::query_scalar::<_, CartId>("SELECT id FROM store.cart WHERE user_id = $1")
                    .bind(*user_id)
                    .fetch_optional(self.pool)
                    .await?
            }
            CartOwner::Guest(key) => {
                sqlx::query_scalar::<_, CartId>("SELECT id FROM store.cart WHERE session_key = $1")
                    .bind(key)
                    .fetch_optional(self.pool)
                    .await?
            }
        };
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn get_or_create(&self, owner: &CartOwner) -> Result<CartId, RepositoryError> {
        let id = match owner {
            CartOwner::User(user_id) => {
                sqlx::query_scalar::<_, CartId>(
                    "INSERT INTO store.cart (user_id) VALUES ($1) \
                     ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW() \
                     RETURNING id",
                )
                .bind(*user_id)
                .fetch_one(self.pool)
                .await?
            }
            CartOwner::Guest(key) => {
                sqlx::query_scalar::<_, CartId>(
                    "INSERT INTO store.cart (session_key) VALUES ($1) \
                     ON CONFLICT (session_key) DO UPDATE SET updated_at = NOW() \
                     RETURNING id",
                )
                .bind(key)
                .fetch_one(self.pool)
                .await?
            }
        };
        Ok(id)
    }

    /// Load a cart with its lines, oldest line first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart does not exist.
    pub async fn load(&self, id: CartId) -> Result<Cart, RepositoryError> {
        let cart = sqlx::query_as::<_, CartRow>(
            "SELECT id, coupon_id, created_at, updated_at FROM store.cart WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let lines = sqlx::query_as::<_, CartLineRow>(&format!(
            "SELECT ci.id AS line_id, ci.quantity, ci.added_at, prod.* \
             FROM store.cart_item ci \
             JOIN ({PRODUCT_SELECT}) prod ON prod.id = ci.product_id \
             WHERE ci.cart_id = $1 \
             ORDER BY ci.added_at, ci.id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Cart {
            id: cart.id,
            coupon_id: cart.coupon_id,
            lines: lines.into_iter().map(CartLine::from).collect(),
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        })
    }

    /// Add `quantity` of a product, merging with an existing line. The write
    /// only happens if the resulting line stays within `max_quantity`.
    ///
    /// Returns the new line quantity, or `None` if the cap would be exceeded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn add_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
        max_quantity: i32,
    ) -> Result<Option<i32>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let new_quantity = sqlx::query_scalar::<_, i32>(
            "INSERT INTO store.cart_item (cart_id, product_id, quantity) \
             SELECT $1, $2, $3 WHERE $3 <= $4 \
             ON CONFLICT (cart_id, product_id) DO UPDATE \
                 SET quantity = store.cart_item.quantity + EXCLUDED.quantity \
                 WHERE store.cart_item.quantity + EXCLUDED.quantity <= $4 \
             RETURNING quantity",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(max_quantity)
        .fetch_optional(&mut *tx)
        .await?;

        touch(&mut tx, cart_id).await?;
        tx.commit().await?;

        Ok(new_quantity)
    }

    /// Returns `false` if the line is not in this cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_quantity(
        &self,
        cart_id: CartId,
        line_id: CartItemId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let result =
            sqlx::query("UPDATE store.cart_item SET quantity = $3 WHERE id = $2 AND cart_id = $1")
                .bind(cart_id)
                .bind(line_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
        touch(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    /// Returns `false` if the line is not in this cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove_line(&self, cart_id: CartId, line_id: CartItemId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM store.cart_item WHERE id = $2 AND cart_id = $1")
            .bind(cart_id)
            .bind(line_id)
            .execute(&mut *tx)
            .await?;
        touch(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    /// Remove every line and detach the coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        empty_cart(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_coupon(&self, cart_id: CartId, coupon: Option<CouponId>) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE store.cart SET coupon_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .bind(coupon)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Move a guest cart's lines into the user's cart and delete the guest cart.
    ///
    /// Quantities for products present in both are summed and capped at the
    /// current stock; sold-out products are dropped. The guest coupon is kept
    /// only if the user cart has none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn merge_guest_cart(&self, guest: CartId, user_cart: CartId) -> Result<(), RepositoryError> {
        if guest == user_cart {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO store.cart_item (cart_id, product_id, quantity, added_at) \
             SELECT $2, gi.product_id, LEAST(gi.quantity, p.stock), gi.added_at \
             FROM store.cart_item gi \
             JOIN store.product p ON p.id = gi.product_id \
             WHERE gi.cart_id = $1 AND p.stock > 0 \
             ON CONFLICT (cart_id, product_id) DO UPDATE \
                 SET quantity = LEAST( \
                     store.cart_item.quantity + EXCLUDED.quantity, \
                     (SELECT stock FROM store.product WHERE id = EXCLUDED.product_id) \
                 )",
        )
        .bind(guest)
        .bind(user_cart)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE store.cart SET \
                 coupon_id = COALESCE(coupon_id, (SELECT coupon_id FROM store.cart WHERE id = $1)), \
                 updated_at = NOW() \
             WHERE id = $2",
        )
        .bind(guest)
        .bind(user_cart)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM store.cart WHERE id = $1")
            .bind(guest)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn touch(conn: &mut PgConnection, cart_id: CartId) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE store.cart SET updated_at = NOW() WHERE id = $1")
        .bind(cart_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete all lines and detach the coupon, inside the caller's transaction.
///
/// # Errors
///
/// Returns `sqlx::Error` if a statement fails.
pub async fn empty_cart(conn: &mut PgConnection, cart_id: CartId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM store.cart_item WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("UPDATE store.cart SET coupon_id = NULL, updated_at = NOW() WHERE id = $1")
        .bind(cart_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Lock the cart's products (`FOR UPDATE`) and return lines with live prices
/// and stock. Rows are locked in product-id order so concurrent checkouts
/// sharing products cannot deadlock.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn lock_lines_for_checkout(
    conn: &mut PgConnection,
    cart_id: CartId,
) -> Result<Vec<LockedLine>, sqlx::Error> {
    sqlx::query_as::<_, LockedLine>(
        "SELECT p.id AS product_id, p.name AS product_name, p.price, p.stock, p.is_available, \
                ci.quantity \
         FROM store.cart_item ci \
         JOIN store.product p ON p.id = ci.product_id \
         WHERE ci.cart_id = $1 \
         ORDER BY p.id \
         FOR UPDATE OF p",
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await
}

/// Read the coupon attached to a cart.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn attached_coupon(conn: &mut PgConnection, cart_id: CartId) -> Result<Option<CouponId>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<CouponId>>("SELECT coupon_id FROM store.cart WHERE id = $1")
        .bind(cart_id)
        .fetch_optional(conn)
        .await
        .map(Option::flatten)
}
