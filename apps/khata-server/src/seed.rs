//! # Demo Data
//!
//! A small shop with five products and two customers. Rahul buys on credit
//! and Priya pays by UPI, so the dashboard, history and receivables all have
//! something to show. Bills go through the billing engine like any other sale.

use tracing::info;

use khata_billing::{BillingEngine, BillingResult};
use khata_core::{
    NewCustomer, NewProduct, PaymentMethod, ProductFilter, SaleLine, SaleRequest, Store,
};

/// What the seed did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded { products: usize, customers: usize, bills: usize },
    /// The catalog already had products; nothing was written.
    Skipped { existing: usize },
}

fn product(name: &str, sku: &str, category: &str, price: i64, stock: i64, min: i64) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        sku: Some(sku.to_string()),
        category: category.to_string(),
        price,
        stock_quantity: stock,
        min_stock_level: min,
        unit: "pcs".to_string(),
    }
}

fn demo_products() -> Vec<NewProduct> {
    vec![
        product("Aashirvaad Atta (5kg)", "ATA-001", "Kirana", 23500, 20, 5),
        product("Tata Salt (1kg)", "SLT-001", "Kirana", 2500, 50, 10),
        product("Paracetamol 500mg", "MED-001", "Medical", 1500, 100, 20),
        product("Classmate Notebook", "STN-001", "Stationery", 4500, 30, 10),
        // Starts below its reorder level.
        product("Lux Soap (Set of 4)", "SOAP-001", "Kirana", 11000, 2, 5),
    ]
}

fn demo_customers() -> Vec<NewCustomer> {
    vec![
        NewCustomer {
            name: "Rahul Sharma".to_string(),
            phone: Some("9876543210".to_string()),
            address: Some("Flat 101, Omkar Apt".to_string()),
        },
        NewCustomer {
            name: "Priya Patel".to_string(),
            phone: Some("9876543211".to_string()),
            address: Some("Bungalow 5, Sunrise Society".to_string()),
        },
    ]
}

/// Loads the demo shop, only into an empty catalog.
pub async fn seed_demo<S: Store>(engine: &BillingEngine<S>) -> BillingResult<SeedOutcome> {
    let store = engine.store();

    let existing = store.list_products(&ProductFilter::default()).await?.len();
    if existing > 0 {
        info!(existing, "Catalog not empty, skipping demo seed");
        return Ok(SeedOutcome::Skipped { existing });
    }

    let mut products = Vec::new();
    for new in demo_products() {
        products.push(store.create_product(new).await?);
    }

    let mut customers = Vec::new();
    for new in demo_customers() {
        customers.push(store.create_customer(new).await?);
    }

    let (atta, salt, paracetamol) = (&products[0], &products[1], &products[2]);
    let (rahul, priya) = (&customers[0], &customers[1]);

    // 285.00 on credit
    engine
        .create_sale(
            SaleRequest::new(
                vec![
                    SaleLine { product_id: atta.id, quantity: 1, unit_price: atta.price },
                    SaleLine { product_id: salt.id, quantity: 2, unit_price: salt.price },
                ],
                PaymentMethod::Credit,
            )
            .for_customer(rahul.id),
        )
        .await?;

    engine
        .create_sale(
            SaleRequest::new(
                vec![SaleLine {
                    product_id: paracetamol.id,
                    quantity: 1,
                    unit_price: paracetamol.price,
                }],
                PaymentMethod::Upi,
            )
            .for_customer(priya.id),
        )
        .await?;

    let outcome = SeedOutcome::Seeded {
        products: products.len(),
        customers: customers.len(),
        bills: 2,
    };
    info!(?outcome, "Demo data loaded");
    Ok(outcome)
}
