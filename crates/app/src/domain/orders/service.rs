//! Checkout service.
//!
//! The commit pipeline is the only writer of order, stock, and coupon-usage
//! state. Verification and persistence run inside one transaction under row
//! locks, so concurrent checkouts against the same stock serialise instead
//! of double-selling.

use async_trait::async_trait;
use atelier::PricingPolicy;
use jiff::Timestamp;
use mockall::automock;
use tracing::{Span, info};
use uuid::Uuid;

use crate::{
    database::Db,
    domain::{
        carts::repositories::{PgCartLinesRepository, PgCartsRepository},
        coupons::{
            data::CouponDiscount, errors::CouponsServiceError, records::CouponRecord,
            repository::PgCouponsRepository,
        },
        customers::{records::CustomerUuid, repository::PgCustomersRepository},
        orders::{
            data::{CheckoutQuote, CheckoutReceipt, CheckoutRequest},
            errors::{AddressRole, CheckoutError},
            records::{AddressSnapshot, OrderRecord, OrderUuid},
            repositories::{NewOrderRow, PgOrderItemsRepository, PgOrdersRepository, PgStockRepository},
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgCheckoutService {
    db: Db,
    pricing: PricingPolicy,
    carts: PgCartsRepository,
    lines: PgCartLinesRepository,
    customers: PgCustomersRepository,
    coupons: PgCouponsRepository,
    orders: PgOrdersRepository,
    items: PgOrderItemsRepository,
    stock: PgStockRepository,
}

impl PgCheckoutService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self::with_policy(db, PricingPolicy::default())
    }

    #[must_use]
    pub fn with_policy(db: Db, pricing: PricingPolicy) -> Self {
        Self {
            db,
            pricing,
            carts: PgCartsRepository::new(),
            lines: PgCartLinesRepository::new(),
            customers: PgCustomersRepository::new(),
            coupons: PgCouponsRepository::new(),
            orders: PgOrdersRepository::new(),
            items: PgOrderItemsRepository::new(),
            stock: PgStockRepository::new(),
        }
    }
}

fn generate_order_number() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    let short: String = hex.chars().take(8).collect();

    format!("ORD-{}", short.to_uppercase())
}

fn applied_discount(coupon: &CouponRecord, amount: u64) -> CouponDiscount {
    CouponDiscount {
        coupon: coupon.uuid,
        code: coupon.code.clone(),
        description: coupon.description.clone(),
        amount,
    }
}

#[async_trait]
impl CheckoutService for PgCheckoutService {
    async fn preview_checkout(
        &self,
        customer: CustomerUuid,
        coupon_code: Option<String>,
    ) -> Result<CheckoutQuote, CheckoutError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts
            .get_cart(&mut tx, customer)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;

        if cart.total_items == 0 {
            return Err(CheckoutError::EmptyCart);
        }

        let (coupon, coupon_warning) = match coupon_code.as_deref() {
            None => (None, None),
            Some(code) => match self.coupons.find_by_code(&mut tx, code).await? {
                None => (None, Some(CouponsServiceError::NotFound)),
                Some(record) => match record.evaluate(cart.subtotal, Timestamp::now()) {
                    Ok(amount) => (Some(applied_discount(&record, amount)), None),
                    Err(err) => (None, Some(err)),
                },
            },
        };

        tx.commit().await?;

        let discount = coupon.as_ref().map_or(0, |c| c.amount);

        Ok(CheckoutQuote {
            totals: self.pricing.quote(cart.subtotal, discount),
            coupon,
            coupon_warning,
        })
    }

    async fn apply_coupon(
        &self,
        customer: CustomerUuid,
        code: &str,
    ) -> Result<CouponDiscount, CheckoutError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts
            .get_cart(&mut tx, customer)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;

        if cart.total_items == 0 {
            return Err(CheckoutError::EmptyCart);
        }

        let record = self
            .coupons
            .find_by_code(&mut tx, code)
            .await?
            .ok_or(CheckoutError::Coupon(CouponsServiceError::NotFound))?;

        tx.commit().await?;

        let amount = record.evaluate(cart.subtotal, Timestamp::now())?;

        Ok(applied_discount(&record, amount))
    }

    #[tracing::instrument(
        name = "checkout.service.commit",
        skip(self, request),
        fields(
            customer_uuid = %customer,
            order_number = tracing::field::Empty,
            coupon_code = tracing::field::Empty,
        ),
        err
    )]
    async fn commit_checkout(
        &self,
        customer: CustomerUuid,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let mut tx = self.db.begin().await?;

        // Locking the cart row serialises concurrent commits of the same
        // cart: the loser re-reads an already-emptied cart.
        let cart = self
            .carts
            .lock_cart(&mut tx, customer)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;

        let lines = self.stock.lock_cart_lines(&mut tx, cart).await?;

        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let billing = self
            .customers
            .get_address(&mut tx, customer, request.billing_address)
            .await?
            .ok_or(CheckoutError::InvalidAddress {
                role: AddressRole::Billing,
            })?;

        let shipping = self
            .customers
            .get_address(&mut tx, customer, request.shipping_address)
            .await?
            .ok_or(CheckoutError::InvalidAddress {
                role: AddressRole::Shipping,
            })?;

        let subtotal: u64 = lines.iter().map(super::repositories::CommitLine::line_total).sum();

        // A bad coupon skips the discount but never aborts the checkout; the
        // reason is surfaced on the receipt.
        let (applied, coupon_warning) = match request.coupon_code.as_deref() {
            None => (None, None),
            Some(code) => {
                let span = Span::current();
                span.record("coupon_code", tracing::field::display(code));

                match self.coupons.lock_by_code(&mut tx, code).await? {
                    None => (None, Some(CouponsServiceError::NotFound)),
                    Some(coupon) => match coupon.evaluate(subtotal, Timestamp::now()) {
                        Ok(amount) => (Some((coupon, amount)), None),
                        Err(err) => (None, Some(err)),
                    },
                }
            }
        };

        // Stock may have moved since the lines were added to the cart; the
        // quantities are re-checked here against the locked rows.
        for line in &lines {
            if line.quantity > line.stock_quantity {
                return Err(CheckoutError::OutOfStock {
                    variant: line.variant_uuid,
                    requested: line.quantity,
                    available: line.stock_quantity,
                });
            }
        }

        let discount = applied.as_ref().map_or(0, |(_, amount)| *amount);
        let totals = self.pricing.quote(subtotal, discount);

        let order_number = generate_order_number();

        Span::current().record("order_number", tracing::field::display(&order_number));

        let mut order = self
            .orders
            .create_order(
                &mut tx,
                NewOrderRow {
                    uuid: OrderUuid::new(),
                    order_number,
                    customer,
                    billing_address: AddressSnapshot::from(&billing),
                    shipping_address: AddressSnapshot::from(&shipping),
                    totals,
                    coupon: applied.as_ref().map(|(coupon, _)| coupon.uuid),
                },
            )
            .await?;

        for line in &lines {
            let item = self.items.create_item(&mut tx, order.uuid, line).await?;

            order.items.push(item);

            let updated = self
                .stock
                .decrement(&mut tx, line.variant_uuid, line.quantity)
                .await?;

            // Verified under lock above, so a guard miss means a lost race.
            if updated == 0 {
                return Err(CheckoutError::ConcurrentModification);
            }
        }

        if let Some((coupon, _)) = &applied {
            let updated = self.coupons.increment_usage(&mut tx, coupon.uuid).await?;

            if updated == 0 {
                return Err(CheckoutError::ConcurrentModification);
            }
        }

        self.lines.clear_lines(&mut tx, cart).await?;

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            total_amount = order.totals.total_amount,
            "order committed"
        );

        Ok(CheckoutReceipt {
            order,
            coupon_warning,
        })
    }

    async fn get_order(
        &self,
        customer: CustomerUuid,
        order_number: &str,
    ) -> Result<OrderRecord, CheckoutError> {
        let mut tx = self.db.begin().await?;

        let mut order = self
            .orders
            .get_order_by_number(&mut tx, customer, order_number)
            .await?
            .ok_or(CheckoutError::NotFound)?;

        order.items = self.items.get_order_items(&mut tx, order.uuid).await?;

        tx.commit().await?;

        Ok(order)
    }
}

#[automock]
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Price the customer's cart without side effects, optionally with a
    /// coupon code applied.
    async fn preview_checkout(
        &self,
        customer: CustomerUuid,
        coupon_code: Option<String>,
    ) -> Result<CheckoutQuote, CheckoutError>;

    /// Evaluate a coupon against the customer's cart. Never counts a
    /// redemption, no matter how often it is called.
    async fn apply_coupon(
        &self,
        customer: CustomerUuid,
        code: &str,
    ) -> Result<CouponDiscount, CheckoutError>;

    /// Atomically convert the customer's cart into an order: snapshot
    /// addresses and lines, decrement stock, count the coupon redemption,
    /// and empty the cart. All or nothing.
    async fn commit_checkout(
        &self,
        customer: CustomerUuid,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, CheckoutError>;

    /// Look up a committed order by its number, scoped to the customer.
    async fn get_order(
        &self,
        customer: CustomerUuid,
        order_number: &str,
    ) -> Result<OrderRecord, CheckoutError>;
}

#[cfg(test)]
mod tests {
    use jiff::{Timestamp, ToSpan};
    use testresult::TestResult;

    use crate::{
        domain::{
            carts::CartsService,
            catalog::CatalogService,
            coupons::{CouponsService, data::NewCoupon},
            customers::records::{AddressKind, AddressUuid},
            orders::records::OrderStatus,
        },
        test::{TestContext, helpers},
    };

    use super::*;

    async fn checkout_addresses(ctx: &TestContext) -> TestResult<(AddressUuid, AddressUuid)> {
        let billing = ctx.seed_address(ctx.customer_uuid, AddressKind::Billing).await?;
        let shipping = ctx.seed_address(ctx.customer_uuid, AddressKind::Shipping).await?;

        Ok((billing, shipping))
    }

    fn request(billing: AddressUuid, shipping: AddressUuid, coupon: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            billing_address: billing,
            shipping_address: shipping,
            coupon_code: coupon.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn preview_charges_shipping_below_threshold() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(45_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        let quote = ctx.checkout.preview_checkout(ctx.customer_uuid, None).await?;

        assert_eq!(quote.totals.subtotal, 45_00);
        assert_eq!(quote.totals.shipping_cost, 5_00);
        assert_eq!(quote.totals.tax_amount, 3_60);
        assert_eq!(quote.totals.total_amount, 53_60);

        Ok(())
    }

    #[tokio::test]
    async fn preview_ships_free_above_threshold() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(60_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        let quote = ctx.checkout.preview_checkout(ctx.customer_uuid, None).await?;

        assert_eq!(quote.totals.shipping_cost, 0);

        Ok(())
    }

    #[tokio::test]
    async fn preview_applies_coupon_without_side_effects() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(100_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        let coupon = ctx
            .coupons
            .create_coupon(helpers::percentage_coupon("SAVE20", 20, Some(10_00)))
            .await?;

        let quote = ctx
            .checkout
            .preview_checkout(ctx.customer_uuid, Some("SAVE20".to_string()))
            .await?;

        assert_eq!(quote.totals.discount_amount, 10_00);
        assert!(quote.coupon_warning.is_none());

        let used_count: i32 = sqlx::query_scalar("SELECT used_count FROM coupons WHERE uuid = $1")
            .bind(coupon.uuid.into_uuid())
            .fetch_one(ctx.db.pool())
            .await?;

        assert_eq!(used_count, 0);

        let order_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(ctx.db.pool())
            .await?;

        assert_eq!(order_count, 0);

        Ok(())
    }

    #[tokio::test]
    async fn preview_surfaces_bad_coupon_as_warning() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(40_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        let quote = ctx
            .checkout
            .preview_checkout(ctx.customer_uuid, Some("NO-SUCH".to_string()))
            .await?;

        assert_eq!(quote.totals.discount_amount, 0);
        assert!(
            matches!(quote.coupon_warning, Some(CouponsServiceError::NotFound)),
            "expected NotFound warning, got {:?}",
            quote.coupon_warning
        );

        Ok(())
    }

    #[tokio::test]
    async fn preview_empty_cart_returns_empty_cart() {
        let ctx = TestContext::new().await;

        let result = ctx.checkout.preview_checkout(ctx.customer_uuid, None).await;

        assert!(
            matches!(result, Err(CheckoutError::EmptyCart)),
            "expected EmptyCart, got {result:?}"
        );
    }

    #[tokio::test]
    async fn apply_coupon_is_a_hard_error_and_never_counts() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(40_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        let now = Timestamp::now();

        let coupon = ctx
            .coupons
            .create_coupon(NewCoupon {
                valid_from: now.saturating_sub(48.hours())?,
                valid_to: now.saturating_sub(24.hours())?,
                ..helpers::percentage_coupon("EXPIRED", 10, None)
            })
            .await?;

        let result = ctx.checkout.apply_coupon(ctx.customer_uuid, "EXPIRED").await;

        assert!(
            matches!(
                result,
                Err(CheckoutError::Coupon(CouponsServiceError::Invalid))
            ),
            "expected Coupon(Invalid), got {result:?}"
        );
        assert_eq!(coupon.used_count, 0);

        ctx.coupons
            .create_coupon(helpers::fixed_coupon("FLAT5", 5_00))
            .await?;

        for _ in 0..3 {
            let discount = ctx.checkout.apply_coupon(ctx.customer_uuid, "FLAT5").await?;
            assert_eq!(discount.amount, 5_00);
        }

        let counts: Vec<i32> = sqlx::query_scalar("SELECT used_count FROM coupons ORDER BY code")
            .fetch_all(ctx.db.pool())
            .await?;

        assert_eq!(counts, vec![0, 0]);

        Ok(())
    }

    #[tokio::test]
    async fn commit_creates_order_and_clears_state() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(30_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 2).await?;

        let (billing, shipping) = checkout_addresses(&ctx).await?;

        let receipt = ctx
            .checkout
            .commit_checkout(ctx.customer_uuid, request(billing, shipping, None))
            .await?;

        let order = &receipt.order;

        assert!(order.order_number.starts_with("ORD-"));
        assert_eq!(order.order_number.len(), 12);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(receipt.coupon_warning.is_none());

        // 60.00 subtotal, 4.80 tax, free shipping.
        assert_eq!(order.totals.subtotal, 60_00);
        assert_eq!(order.totals.tax_amount, 4_80);
        assert_eq!(order.totals.shipping_cost, 0);
        assert_eq!(order.totals.total_amount, 64_80);
        assert_eq!(
            order.totals.total_amount,
            order.totals.subtotal + order.totals.tax_amount + order.totals.shipping_cost
                - order.totals.discount_amount
        );

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].unit_price, 30_00);
        assert_eq!(order.items[0].total_price, 60_00);

        // Stock decremented, cart emptied.
        let detail = ctx.catalog.get_variant(variant).await?;
        assert_eq!(detail.stock_quantity, 3);

        let cart = ctx.carts.get_cart(ctx.customer_uuid).await?;
        assert_eq!(cart.total_items, 0);
        assert_eq!(cart.lines.len(), 0);

        // And the order is retrievable by number.
        let fetched = ctx
            .checkout
            .get_order(ctx.customer_uuid, &order.order_number)
            .await?;

        assert_eq!(fetched.uuid, order.uuid);
        assert_eq!(fetched.items.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn commit_snapshots_survive_catalog_and_address_edits() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(25_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        let (billing, shipping) = checkout_addresses(&ctx).await?;

        let receipt = ctx
            .checkout
            .commit_checkout(ctx.customer_uuid, request(billing, shipping, None))
            .await?;

        let original_name = receipt.order.items[0].product_name.clone();
        let original_city = receipt.order.shipping_address.city.clone();

        sqlx::query("UPDATE products SET name = 'Renamed', base_price = 9999")
            .execute(ctx.db.pool())
            .await?;
        sqlx::query("UPDATE addresses SET city = 'Moved'")
            .execute(ctx.db.pool())
            .await?;

        let fetched = ctx
            .checkout
            .get_order(ctx.customer_uuid, &receipt.order.order_number)
            .await?;

        assert_eq!(fetched.items[0].product_name, original_name);
        assert_eq!(fetched.items[0].unit_price, 25_00);
        assert_eq!(fetched.shipping_address.city, original_city);

        Ok(())
    }

    #[tokio::test]
    async fn commit_snapshot_carries_exactly_the_address_fields() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(25_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        let (billing, shipping) = checkout_addresses(&ctx).await?;

        let receipt = ctx
            .checkout
            .commit_checkout(ctx.customer_uuid, request(billing, shipping, None))
            .await?;

        let snapshot: serde_json::Value =
            sqlx::query_scalar("SELECT billing_address FROM orders WHERE uuid = $1")
                .bind(receipt.order.uuid.into_uuid())
                .fetch_one(ctx.db.pool())
                .await?;

        let object = snapshot.as_object().expect("snapshot is a JSON object");

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();

        assert_eq!(
            keys,
            vec![
                "address_line_1",
                "address_line_2",
                "city",
                "country",
                "first_name",
                "last_name",
                "postal_code",
                "state",
            ]
        );

        Ok(())
    }

    #[tokio::test]
    async fn commit_with_coupon_discounts_and_counts_once() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(100_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        let coupon = ctx
            .coupons
            .create_coupon(helpers::percentage_coupon("SAVE20", 20, Some(10_00)))
            .await?;

        let (billing, shipping) = checkout_addresses(&ctx).await?;

        let receipt = ctx
            .checkout
            .commit_checkout(ctx.customer_uuid, request(billing, shipping, Some("SAVE20")))
            .await?;

        assert!(receipt.coupon_warning.is_none());
        assert_eq!(receipt.order.coupon_uuid, Some(coupon.uuid));

        // 20% of 100.00 capped at 10.00; 8.00 tax; free shipping.
        assert_eq!(receipt.order.totals.discount_amount, 10_00);
        assert_eq!(receipt.order.totals.total_amount, 98_00);

        let used_count: i32 = sqlx::query_scalar("SELECT used_count FROM coupons WHERE uuid = $1")
            .bind(coupon.uuid.into_uuid())
            .fetch_one(ctx.db.pool())
            .await?;

        assert_eq!(used_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn commit_with_expired_coupon_degrades_with_warning() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(100_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        let now = Timestamp::now();

        let coupon = ctx
            .coupons
            .create_coupon(NewCoupon {
                valid_from: now.saturating_sub(48.hours())?,
                valid_to: now.saturating_sub(24.hours())?,
                ..helpers::percentage_coupon("EXPIRED", 20, None)
            })
            .await?;

        let (billing, shipping) = checkout_addresses(&ctx).await?;

        let receipt = ctx
            .checkout
            .commit_checkout(ctx.customer_uuid, request(billing, shipping, Some("EXPIRED")))
            .await?;

        assert!(
            matches!(receipt.coupon_warning, Some(CouponsServiceError::Invalid)),
            "expected Invalid warning, got {:?}",
            receipt.coupon_warning
        );
        assert_eq!(receipt.order.totals.discount_amount, 0);
        assert_eq!(receipt.order.coupon_uuid, None);

        let used_count: i32 = sqlx::query_scalar("SELECT used_count FROM coupons WHERE uuid = $1")
            .bind(coupon.uuid.into_uuid())
            .fetch_one(ctx.db.pool())
            .await?;

        assert_eq!(used_count, 0);

        Ok(())
    }

    #[tokio::test]
    async fn commit_clamps_oversized_fixed_coupon_to_zero_total() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(10_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        ctx.coupons
            .create_coupon(helpers::fixed_coupon("HUGE", 100_00))
            .await?;

        let (billing, shipping) = checkout_addresses(&ctx).await?;

        let receipt = ctx
            .checkout
            .commit_checkout(ctx.customer_uuid, request(billing, shipping, Some("HUGE")))
            .await?;

        // 10.00 + 0.80 tax + 5.00 shipping; the discount eats all of it.
        assert_eq!(receipt.order.totals.discount_amount, 15_80);
        assert_eq!(receipt.order.totals.total_amount, 0);

        Ok(())
    }

    #[tokio::test]
    async fn commit_empty_cart_returns_empty_cart() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(10_00, 5).await?;

        // A cart that existed but was emptied counts as empty too.
        let line = ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;
        ctx.carts.remove_line(ctx.customer_uuid, line.uuid).await?;

        let (billing, shipping) = checkout_addresses(&ctx).await?;

        let result = ctx
            .checkout
            .commit_checkout(ctx.customer_uuid, request(billing, shipping, None))
            .await;

        assert!(
            matches!(result, Err(CheckoutError::EmptyCart)),
            "expected EmptyCart, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn commit_rejects_foreign_billing_address() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(10_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        let other = ctx.create_customer("other@example.com").await?;
        let foreign = ctx.seed_address(other, AddressKind::Billing).await?;
        let shipping = ctx
            .seed_address(ctx.customer_uuid, AddressKind::Shipping)
            .await?;

        let result = ctx
            .checkout
            .commit_checkout(ctx.customer_uuid, request(foreign, shipping, None))
            .await;

        assert!(
            matches!(
                result,
                Err(CheckoutError::InvalidAddress {
                    role: AddressRole::Billing
                })
            ),
            "expected InvalidAddress(billing), got {result:?}"
        );

        let order_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(ctx.db.pool())
            .await?;

        assert_eq!(order_count, 0);

        Ok(())
    }

    #[tokio::test]
    async fn commit_out_of_stock_aborts_with_zero_writes() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(10_00, 2).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 2).await?;

        let coupon = ctx
            .coupons
            .create_coupon(helpers::percentage_coupon("SAVE10", 10, None))
            .await?;

        // Someone else buys the stock out from under the cart.
        sqlx::query("UPDATE product_variants SET stock_quantity = 1 WHERE uuid = $1")
            .bind(variant.into_uuid())
            .execute(ctx.db.pool())
            .await?;

        let (billing, shipping) = checkout_addresses(&ctx).await?;

        let result = ctx
            .checkout
            .commit_checkout(ctx.customer_uuid, request(billing, shipping, Some("SAVE10")))
            .await;

        assert!(
            matches!(
                result,
                Err(CheckoutError::OutOfStock {
                    requested: 2,
                    available: 1,
                    ..
                })
            ),
            "expected OutOfStock, got {result:?}"
        );

        // Nothing was written: no order, cart intact, stock and coupon
        // untouched.
        let order_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(ctx.db.pool())
            .await?;
        assert_eq!(order_count, 0);

        let cart = ctx.carts.get_cart(ctx.customer_uuid).await?;
        assert_eq!(cart.total_items, 2);

        let detail = ctx.catalog.get_variant(variant).await?;
        assert_eq!(detail.stock_quantity, 1);

        let used_count: i32 = sqlx::query_scalar("SELECT used_count FROM coupons WHERE uuid = $1")
            .bind(coupon.uuid.into_uuid())
            .fetch_one(ctx.db.pool())
            .await?;
        assert_eq!(used_count, 0);

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_commits_for_the_last_unit_sell_it_once() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(20_00, 1).await?;

        let first = ctx.customer_uuid;
        let second = ctx.create_customer("rival@example.com").await?;

        ctx.carts.add_line(first, variant, 1).await?;
        ctx.carts.add_line(second, variant, 1).await?;

        let first_billing = ctx.seed_address(first, AddressKind::Billing).await?;
        let first_shipping = ctx.seed_address(first, AddressKind::Shipping).await?;
        let second_billing = ctx.seed_address(second, AddressKind::Billing).await?;
        let second_shipping = ctx.seed_address(second, AddressKind::Shipping).await?;

        let (left, right) = tokio::join!(
            ctx.checkout
                .commit_checkout(first, request(first_billing, first_shipping, None)),
            ctx.checkout
                .commit_checkout(second, request(second_billing, second_shipping, None)),
        );

        let successes = [&left, &right].iter().filter(|r| r.is_ok()).count();

        assert_eq!(successes, 1, "left: {left:?}, right: {right:?}");

        let loser = if left.is_ok() { right } else { left };

        assert!(
            matches!(
                loser,
                Err(CheckoutError::OutOfStock {
                    requested: 1,
                    available: 0,
                    ..
                })
            ),
            "expected OutOfStock for the loser, got {loser:?}"
        );

        let detail = ctx.catalog.get_variant(variant).await?;
        assert_eq!(detail.stock_quantity, 0);

        let order_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(ctx.db.pool())
            .await?;
        assert_eq!(order_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn get_order_unknown_number_returns_not_found() {
        let ctx = TestContext::new().await;

        let result = ctx.checkout.get_order(ctx.customer_uuid, "ORD-DEADBEEF").await;

        assert!(
            matches!(result, Err(CheckoutError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn get_order_of_other_customer_returns_not_found() -> TestResult {
        let ctx = TestContext::new().await;
        let variant = ctx.seed_variant(10_00, 5).await?;

        ctx.carts.add_line(ctx.customer_uuid, variant, 1).await?;

        let (billing, shipping) = checkout_addresses(&ctx).await?;

        let receipt = ctx
            .checkout
            .commit_checkout(ctx.customer_uuid, request(billing, shipping, None))
            .await?;

        let other = ctx.create_customer("other@example.com").await?;

        let result = ctx
            .checkout
            .get_order(other, &receipt.order.order_number)
            .await;

        assert!(
            matches!(result, Err(CheckoutError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }
}
