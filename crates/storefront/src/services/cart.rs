//! Cart operations.
//!
//! Every mutation re-reads the cart afterwards and returns a fresh
//! [`CartView`], so the client always sees server-computed totals.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use author_store_core::{CartId, CartItemId, CouponError, PricingPolicy, ProductId, UserId};

use crate::db::{CartRepository, CatalogRepository, CouponRepository, RepositoryError};
use crate::models::CartOwner;
use crate::views::CartView;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Product is not available")]
    ProductUnavailable,

    #[error("Only {available} items available in stock")]
    InsufficientStock { available: i32 },

    #[error("Cart item not found")]
    LineNotFound,

    #[error("Invalid coupon code")]
    CouponNotFound,

    #[error("{0}")]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct CartService<'a> {
    carts: CartRepository<'a>,
    catalog: CatalogRepository<'a>,
    coupons: CouponRepository<'a>,
    policy: &'a PricingPolicy,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, policy: &'a PricingPolicy) -> Self {
        Self {
            carts: CartRepository::new(pool),
            catalog: CatalogRepository::new(pool),
            coupons: CouponRepository::new(pool),
            policy,
        }
    }

    /// The owner's cart, created on first use.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the upsert fails.
    pub async fn resolve(&self, owner: &CartOwner) -> Result<CartId, CartError> {
        Ok(self.carts.get_or_create(owner).await?)
    }

    /// Load and price a cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the cart cannot be loaded.
    pub async fn view(&self, cart_id: CartId) -> Result<CartView, CartError> {
        let cart = self.carts.load(cart_id).await?;
        let coupon = match cart.coupon_id {
            Some(id) => self.coupons.get(id).await?,
            None => None,
        };
        Ok(CartView::build(&cart, coupon.as_ref(), self.policy, Utc::now()))
    }

    /// # Errors
    ///
    /// Returns `InvalidQuantity`, `ProductNotFound`, `ProductUnavailable` or
    /// `InsufficientStock` when the line cannot be added.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        if !product.is_available {
            return Err(CartError::ProductUnavailable);
        }

        self.carts
            .add_quantity(cart_id, product_id, quantity, product.stock)
            .await?
            .ok_or(CartError::InsufficientStock {
                available: product.stock,
            })?;

        self.view(cart_id).await
    }

    /// Set a line's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `LineNotFound` if the line is not in this cart and
    /// `InsufficientStock` if the quantity exceeds stock.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        cart_id: CartId,
        line_id: CartItemId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if quantity <= 0 {
            return self.remove_item(cart_id, line_id).await;
        }

        let cart = self.carts.load(cart_id).await?;
        let line = cart.line(line_id).ok_or(CartError::LineNotFound)?;
        if quantity > line.product.stock {
            return Err(CartError::InsufficientStock {
                available: line.product.stock,
            });
        }

        if !self.carts.set_quantity(cart_id, line_id, quantity).await? {
            return Err(CartError::LineNotFound);
        }
        self.view(cart_id).await
    }

    /// # Errors
    ///
    /// Returns `LineNotFound` if the line is not in this cart.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        line_id: CartItemId,
    ) -> Result<CartView, CartError> {
        if !self.carts.remove_line(cart_id, line_id).await? {
            return Err(CartError::LineNotFound);
        }
        self.view(cart_id).await
    }

    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<CartView, CartError> {
        self.carts.clear(cart_id).await?;
        self.view(cart_id).await
    }

    /// Attach a coupon by code. A blank code detaches the current coupon.
    ///
    /// # Errors
    ///
    /// Returns `CouponNotFound` for an unknown code and `Coupon` with the
    /// failing rule if it cannot be used on the current subtotal.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, cart_id: CartId, code: &str) -> Result<CartView, CartError> {
        if code.trim().is_empty() {
            self.carts.set_coupon(cart_id, None).await?;
            return self.view(cart_id).await;
        }

        let coupon = self
            .coupons
            .get_by_code(code)
            .await?
            .ok_or(CartError::CouponNotFound)?;
        let cart = self.carts.load(cart_id).await?;
        coupon.rules.check_usable(cart.subtotal(), Utc::now())?;

        self.carts.set_coupon(cart_id, Some(coupon.id)).await?;
        self.view(cart_id).await
    }

    /// Fold a guest's cart into the user's cart after they sign in.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the merge fails.
    #[instrument(skip(self, guest_key))]
    pub async fn merge_guest_cart(&self, guest_key: &str, user_id: UserId) -> Result<(), CartError> {
        let Some(guest) = self
            .carts
            .find(&CartOwner::Guest(guest_key.to_owned()))
            .await?
        else {
            return Ok(());
        };
        let user_cart = self.carts.get_or_create(&CartOwner::User(user_id)).await?;
        self.carts.merge_guest_cart(guest, user_cart).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn stock_message_names_available_quantity() {
        assert_eq!(
            CartError::InsufficientStock { available: 3 }.to_string(),
            "Only 3 items available in stock"
        );
    }

    #[test]
    fn coupon_errors_keep_their_reason() {
        let err = CartError::from(CouponError::MinimumNotMet {
            minimum: Decimal::new(2500, 2),
        });
        assert_eq!(err.to_string(), "Orders must be at least 25.00 to use this coupon");
    }
}
