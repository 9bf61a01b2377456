//! Pure checkout pricing arithmetic.
//!
//! All monetary values are integer minor units (cents for USD-like
//! currencies). Computation here is deterministic and side-effect free; the
//! persistence layer in `atelier-app` feeds it subtotals and discount
//! definitions and stores whatever it returns.

pub mod discounts;
pub mod pricing;

pub use discounts::{Discount, DiscountError};
pub use pricing::{PricingPolicy, ShippingPolicy, TaxPolicy, Totals};
