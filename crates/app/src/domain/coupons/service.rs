//! Coupons service.

use async_trait::async_trait;
use atelier::Discount;
use jiff::Timestamp;
use mockall::automock;
use tracing::info;

use crate::database::Db;

use super::{
    data::{CouponDiscount, NewCoupon},
    errors::CouponsServiceError,
    records::CouponRecord,
    repository::PgCouponsRepository,
};

#[derive(Debug, Clone)]
pub struct PgCouponsService {
    db: Db,
    repository: PgCouponsRepository,
}

impl PgCouponsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCouponsRepository::new(),
        }
    }
}

#[async_trait]
impl CouponsService for PgCouponsService {
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<CouponRecord, CouponsServiceError> {
        if coupon.code.trim().is_empty() {
            return Err(CouponsServiceError::InvalidData);
        }

        // Re-run the discount constructors so a hand-built value cannot
        // smuggle in a zero amount or an out-of-range percentage.
        match coupon.discount {
            Discount::PercentageOff { percent, cap } => {
                Discount::percentage(percent, cap)?;
            }
            Discount::FixedAmountOff { amount } => {
                Discount::fixed(amount)?;
            }
        }

        let mut tx = self.db.begin().await?;

        let created = self.repository.create_coupon(&mut tx, coupon).await?;

        tx.commit().await?;

        info!(coupon_uuid = %created.uuid, code = %created.code, "created coupon");

        Ok(created)
    }

    async fn evaluate(
        &self,
        code: &str,
        subtotal: u64,
        now: Timestamp,
    ) -> Result<CouponDiscount, CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let coupon = self
            .repository
            .find_by_code(&mut tx, code)
            .await?
            .ok_or(CouponsServiceError::NotFound)?;

        tx.commit().await?;

        let amount = coupon.evaluate(subtotal, now)?;

        Ok(CouponDiscount {
            coupon: coupon.uuid,
            code: coupon.code,
            description: coupon.description,
            amount,
        })
    }
}

#[automock]
#[async_trait]
pub trait CouponsService: Send + Sync {
    /// Creates a new coupon.
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<CouponRecord, CouponsServiceError>;

    /// Evaluate a coupon code against an order subtotal.
    ///
    /// Never counts a redemption; only a committed order does that.
    async fn evaluate(
        &self,
        code: &str,
        subtotal: u64,
        now: Timestamp,
    ) -> Result<CouponDiscount, CouponsServiceError>;
}

#[cfg(test)]
mod tests {
    use atelier::Discount;
    use jiff::{Timestamp, ToSpan};
    use testresult::TestResult;

    use crate::test::{TestContext, helpers};

    use super::*;

    #[tokio::test]
    async fn evaluate_percentage_coupon() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.coupons
            .create_coupon(helpers::percentage_coupon("SAVE15", 15, None))
            .await?;

        let discount = ctx
            .coupons
            .evaluate("SAVE15", 80_00, Timestamp::now())
            .await?;

        assert_eq!(discount.amount, 12_00);
        assert_eq!(discount.code, "SAVE15");

        Ok(())
    }

    #[tokio::test]
    async fn evaluate_caps_percentage_discount() -> TestResult {
        let ctx = TestContext::new().await;

        // 20% of 100.00 is 20.00, capped at 10.00.
        ctx.coupons
            .create_coupon(helpers::percentage_coupon("SAVE20", 20, Some(10_00)))
            .await?;

        let discount = ctx
            .coupons
            .evaluate("SAVE20", 100_00, Timestamp::now())
            .await?;

        assert_eq!(discount.amount, 10_00);

        Ok(())
    }

    #[tokio::test]
    async fn evaluate_fixed_coupon() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.coupons
            .create_coupon(helpers::fixed_coupon("FLAT5", 5_00))
            .await?;

        let discount = ctx
            .coupons
            .evaluate("FLAT5", 30_00, Timestamp::now())
            .await?;

        assert_eq!(discount.amount, 5_00);

        Ok(())
    }

    #[tokio::test]
    async fn evaluate_unknown_code_returns_not_found() {
        let ctx = TestContext::new().await;

        let result = ctx
            .coupons
            .evaluate("NO-SUCH-CODE", 30_00, Timestamp::now())
            .await;

        assert!(
            matches!(result, Err(CouponsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn evaluate_below_minimum_returns_the_minimum() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.coupons
            .create_coupon(NewCoupon {
                minimum_order_amount: 50_00,
                ..helpers::percentage_coupon("BIGCART", 10, None)
            })
            .await?;

        let result = ctx
            .coupons
            .evaluate("BIGCART", 49_99, Timestamp::now())
            .await;

        assert!(
            matches!(
                result,
                Err(CouponsServiceError::BelowMinimum { minimum: 50_00 })
            ),
            "expected BelowMinimum, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn evaluate_at_exact_minimum_succeeds() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.coupons
            .create_coupon(NewCoupon {
                minimum_order_amount: 50_00,
                ..helpers::percentage_coupon("EXACT", 10, None)
            })
            .await?;

        let discount = ctx
            .coupons
            .evaluate("EXACT", 50_00, Timestamp::now())
            .await?;

        assert_eq!(discount.amount, 5_00);

        Ok(())
    }

    #[tokio::test]
    async fn evaluate_expired_coupon_returns_invalid() -> TestResult {
        let ctx = TestContext::new().await;

        let now = Timestamp::now();

        ctx.coupons
            .create_coupon(NewCoupon {
                valid_from: now.saturating_sub(48.hours())?,
                valid_to: now.saturating_sub(24.hours())?,
                ..helpers::percentage_coupon("EXPIRED", 10, None)
            })
            .await?;

        let result = ctx.coupons.evaluate("EXPIRED", 80_00, now).await;

        assert!(
            matches!(result, Err(CouponsServiceError::Invalid)),
            "expected Invalid, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn evaluate_not_yet_valid_coupon_returns_invalid() -> TestResult {
        let ctx = TestContext::new().await;

        let now = Timestamp::now();

        ctx.coupons
            .create_coupon(NewCoupon {
                valid_from: now.saturating_add(24.hours())?,
                valid_to: now.saturating_add(48.hours())?,
                ..helpers::percentage_coupon("SOON", 10, None)
            })
            .await?;

        let result = ctx.coupons.evaluate("SOON", 80_00, now).await;

        assert!(
            matches!(result, Err(CouponsServiceError::Invalid)),
            "expected Invalid, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn evaluate_inactive_coupon_returns_invalid() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.coupons
            .create_coupon(NewCoupon {
                is_active: false,
                ..helpers::percentage_coupon("DISABLED", 10, None)
            })
            .await?;

        let result = ctx
            .coupons
            .evaluate("DISABLED", 80_00, Timestamp::now())
            .await;

        assert!(
            matches!(result, Err(CouponsServiceError::Invalid)),
            "expected Invalid, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn evaluate_used_up_coupon_returns_invalid() -> TestResult {
        let ctx = TestContext::new().await;

        let coupon = ctx
            .coupons
            .create_coupon(NewCoupon {
                usage_limit: Some(1),
                ..helpers::percentage_coupon("LASTONE", 10, None)
            })
            .await?;

        sqlx::query("UPDATE coupons SET used_count = usage_limit WHERE uuid = $1")
            .bind(coupon.uuid.into_uuid())
            .execute(ctx.db.pool())
            .await?;

        let result = ctx
            .coupons
            .evaluate("LASTONE", 80_00, Timestamp::now())
            .await;

        assert!(
            matches!(result, Err(CouponsServiceError::Invalid)),
            "expected Invalid, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn evaluate_never_counts_a_redemption() -> TestResult {
        let ctx = TestContext::new().await;

        let coupon = ctx
            .coupons
            .create_coupon(helpers::percentage_coupon("PREVIEW", 10, None))
            .await?;

        for _ in 0..3 {
            ctx.coupons
                .evaluate("PREVIEW", 80_00, Timestamp::now())
                .await?;
        }

        let used_count: i32 = sqlx::query_scalar("SELECT used_count FROM coupons WHERE uuid = $1")
            .bind(coupon.uuid.into_uuid())
            .fetch_one(ctx.db.pool())
            .await?;

        assert_eq!(used_count, 0);

        Ok(())
    }

    #[tokio::test]
    async fn create_coupon_duplicate_code_returns_already_exists() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.coupons
            .create_coupon(helpers::percentage_coupon("TWICE", 10, None))
            .await?;

        let result = ctx
            .coupons
            .create_coupon(helpers::percentage_coupon("TWICE", 20, None))
            .await;

        assert!(
            matches!(result, Err(CouponsServiceError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn create_coupon_blank_code_returns_invalid_data() {
        let ctx = TestContext::new().await;

        let result = ctx
            .coupons
            .create_coupon(NewCoupon {
                code: "   ".to_string(),
                ..helpers::percentage_coupon("IGNORED", 10, None)
            })
            .await;

        assert!(
            matches!(result, Err(CouponsServiceError::InvalidData)),
            "expected InvalidData, got {result:?}"
        );
    }

    #[tokio::test]
    async fn create_coupon_zero_percentage_returns_invalid_data() {
        let ctx = TestContext::new().await;

        let result = ctx
            .coupons
            .create_coupon(NewCoupon {
                discount: Discount::PercentageOff {
                    percent: 0,
                    cap: None,
                },
                ..helpers::percentage_coupon("ZERO", 10, None)
            })
            .await;

        assert!(
            matches!(result, Err(CouponsServiceError::InvalidData)),
            "expected InvalidData, got {result:?}"
        );
    }

    #[tokio::test]
    async fn create_coupon_inverted_window_returns_invalid_data() -> TestResult {
        let ctx = TestContext::new().await;

        let now = Timestamp::now();

        let result = ctx
            .coupons
            .create_coupon(NewCoupon {
                valid_from: now.saturating_add(24.hours())?,
                valid_to: now,
                ..helpers::percentage_coupon("BACKWARDS", 10, None)
            })
            .await;

        assert!(
            matches!(result, Err(CouponsServiceError::InvalidData)),
            "expected InvalidData, got {result:?}"
        );

        Ok(())
    }

    #[test]
    fn discount_constructors_reject_bad_values() {
        assert!(Discount::percentage(0, None).is_err());
        assert!(Discount::percentage(101, None).is_err());
        assert!(Discount::fixed(0).is_err());
    }
}
