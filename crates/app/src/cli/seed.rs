//! Sample-data seeding for local development.

use atelier::Discount;
use atelier_app::{
    database::{self, Db},
    domain::{
        catalog::{
            CatalogService, PgCatalogService,
            data::{NewProduct, NewVariant},
            records::{ProductUuid, VariantUuid},
        },
        coupons::{CouponsService, PgCouponsService, data::NewCoupon, records::CouponUuid},
        customers::{
            CustomersService, PgCustomersService,
            data::{NewAddress, NewCustomer},
            records::{AddressKind, AddressUuid, CustomerUuid},
        },
    },
};
use clap::Args;
use jiff::{Timestamp, ToSpan};

const PRODUCTS: [(&str, &str, u64); 3] = [
    ("Canvas High Top", "SHOE-CAN", 45_00),
    ("Trail Runner", "SHOE-TRL", 89_00),
    ("Linen Shirt", "APP-LIN", 35_00),
];

const COLORS: [&str; 2] = ["Black", "White"];
const SIZES: [&str; 3] = ["41", "42", "43"];

#[derive(Debug, Args)]
pub(crate) struct SeedArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Stock assigned to every generated variant
    #[arg(long, default_value_t = 25)]
    stock: u32,
}

pub(crate) async fn run(args: SeedArgs) -> Result<(), String> {
    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let db = Db::new(pool);

    let catalog = PgCatalogService::new(db.clone());
    let coupons = PgCouponsService::new(db.clone());
    let customers = PgCustomersService::new(db);

    let mut variant_count = 0_u32;

    for (name, sku, price) in PRODUCTS {
        let product = catalog
            .create_product(NewProduct {
                uuid: ProductUuid::new(),
                name: name.to_string(),
                sku: sku.to_string(),
                base_price: price,
                discount_price: None,
            })
            .await
            .map_err(|error| format!("failed to create product {sku}: {error}"))?;

        for color in COLORS {
            for size in SIZES {
                catalog
                    .create_variant(NewVariant {
                        uuid: VariantUuid::new(),
                        product_uuid: product.uuid,
                        color: color.to_string(),
                        size: size.to_string(),
                        sku: format!("{sku}-{}-{size}", &color[..3].to_uppercase()),
                        stock_quantity: args.stock,
                        price_adjustment: 0,
                    })
                    .await
                    .map_err(|error| format!("failed to create variant of {sku}: {error}"))?;

                variant_count += 1;
            }
        }
    }

    let now = Timestamp::now();

    for coupon in [
        NewCoupon {
            uuid: CouponUuid::new(),
            code: "WELCOME10".to_string(),
            description: "10% off your first order".to_string(),
            discount: Discount::PercentageOff {
                percent: 10,
                cap: Some(20_00),
            },
            minimum_order_amount: 0,
            usage_limit: None,
            valid_from: now,
            valid_to: now
                .saturating_add(365.days())
                .map_err(|error| format!("failed to compute coupon expiry: {error}"))?,
            is_active: true,
        },
        NewCoupon {
            uuid: CouponUuid::new(),
            code: "FLAT5".to_string(),
            description: "5.00 off orders over 50.00".to_string(),
            discount: Discount::FixedAmountOff { amount: 5_00 },
            minimum_order_amount: 50_00,
            usage_limit: Some(100),
            valid_from: now,
            valid_to: now
                .saturating_add(90.days())
                .map_err(|error| format!("failed to compute coupon expiry: {error}"))?,
            is_active: true,
        },
    ] {
        let code = coupon.code.clone();

        coupons
            .create_coupon(coupon)
            .await
            .map_err(|error| format!("failed to create coupon {code}: {error}"))?;
    }

    let customer = customers
        .create_customer(NewCustomer {
            uuid: CustomerUuid::new(),
            email: "demo@example.com".to_string(),
            first_name: "Demo".to_string(),
            last_name: "Customer".to_string(),
            phone: "555-0100".to_string(),
        })
        .await
        .map_err(|error| format!("failed to create demo customer: {error}"))?;

    for kind in [AddressKind::Billing, AddressKind::Shipping] {
        customers
            .create_address(
                customer.uuid,
                NewAddress {
                    uuid: AddressUuid::new(),
                    kind,
                    first_name: "Demo".to_string(),
                    last_name: "Customer".to_string(),
                    company: String::new(),
                    address_line_1: "1 High Street".to_string(),
                    address_line_2: String::new(),
                    city: "Springfield".to_string(),
                    state: "IL".to_string(),
                    postal_code: "62701".to_string(),
                    country: "USA".to_string(),
                    phone: "555-0100".to_string(),
                    is_default: true,
                },
            )
            .await
            .map_err(|error| format!("failed to create demo address: {error}"))?;
    }

    println!(
        "seeded {} products with {variant_count} variants, 2 coupons, 1 demo customer",
        PRODUCTS.len()
    );

    Ok(())
}
