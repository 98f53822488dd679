//! End-to-end billing scenarios, run against both the in-memory store and
//! an in-memory SQLite database.

use khata_billing::{BillingEngine, BillingError, Entity, FailPoint, MemoryStore};
use khata_core::{
    CatalogStore, CustomerFilter, LedgerStore, NewCustomer, NewProduct, PaymentMethod,
    PaymentRequest, ProductPatch, SaleLine, SaleRequest, Store, StoreError, TransactionKind,
    UnitOfWork, ValidationError,
};
use khata_db::{Database, DbConfig};
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

async fn sqlite() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

fn atta(stock: i64) -> NewProduct {
    NewProduct {
        name: "Aashirvaad Atta (5kg)".to_string(),
        sku: Some("ATA-001".to_string()),
        category: "Kirana".to_string(),
        price: 23500,
        stock_quantity: stock,
        min_stock_level: 5,
        unit: "pcs".to_string(),
    }
}

fn dal() -> NewProduct {
    NewProduct {
        name: "Toor Dal (1kg)".to_string(),
        sku: Some("DAL-002".to_string()),
        category: "Kirana".to_string(),
        price: 14000,
        stock_quantity: 50,
        min_stock_level: 10,
        unit: "kg".to_string(),
    }
}

fn rahul() -> NewCustomer {
    NewCustomer {
        name: "Rahul Sharma".to_string(),
        phone: Some("9876543210".to_string()),
        address: Some("12 MG Road".to_string()),
    }
}

fn line(product_id: i64, quantity: i64, unit_price: i64) -> SaleLine {
    SaleLine {
        product_id,
        quantity,
        unit_price,
    }
}

fn payment(customer_id: i64, amount: i64) -> PaymentRequest {
    PaymentRequest {
        customer_id,
        amount,
        payment_method: PaymentMethod::Cash,
        notes: None,
    }
}

/// Runs one scenario against each store implementation.
macro_rules! both_stores {
    ($scenario:ident) => {
        mod $scenario {
            #[tokio::test]
            async fn memory() {
                super::$scenario(khata_billing::MemoryStore::new()).await;
            }

            #[tokio::test]
            async fn sqlite() {
                super::$scenario(super::sqlite().await).await;
            }
        }
    };
}

// =============================================================================
// CreateSale
// =============================================================================

async fn credit_sale_moves_stock_and_balance<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(20)).await.unwrap();
    let customer = engine.store().create_customer(rahul()).await.unwrap();

    let sale = engine
        .create_sale(
            SaleRequest::new(vec![line(product.id, 1, 23500)], PaymentMethod::Credit)
                .for_customer(customer.id),
        )
        .await
        .unwrap();

    assert_eq!(sale.kind, TransactionKind::Sale);
    assert_eq!(sale.amount, 23500);
    assert_eq!(sale.customer_id, Some(customer.id));
    assert_eq!(sale.notes.as_deref(), Some("Credit added: 23500"));

    let product = engine.store().get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, 19);

    let customer = engine.store().get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(customer.credit_balance, 23500);

    let history = engine.store().history(Some(customer.id), 50).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].items.len(), 1);
    assert_eq!(history[0].items[0].subtotal, 23500);
}
both_stores!(credit_sale_moves_stock_and_balance);

async fn cash_sale_leaves_balance_untouched<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let atta = engine.store().create_product(atta(20)).await.unwrap();
    let dal = engine.store().create_product(dal()).await.unwrap();

    let sale = engine
        .create_sale(SaleRequest::new(
            vec![line(atta.id, 2, 23500), line(dal.id, 3, 14000)],
            PaymentMethod::Cash,
        ))
        .await
        .unwrap();

    assert_eq!(sale.amount, 2 * 23500 + 3 * 14000);
    assert_eq!(sale.customer_id, None);
    assert_eq!(sale.notes.as_deref(), Some("Full payment"));

    assert_eq!(
        engine.store().get_product(atta.id).await.unwrap().unwrap().stock_quantity,
        18
    );
    assert_eq!(
        engine.store().get_product(dal.id).await.unwrap().unwrap().stock_quantity,
        47
    );
}
both_stores!(cash_sale_leaves_balance_untouched);

async fn partial_payment_credits_the_remainder<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(20)).await.unwrap();
    let customer = engine.store().create_customer(rahul()).await.unwrap();

    engine
        .create_sale(
            SaleRequest::new(vec![line(product.id, 2, 23500)], PaymentMethod::Cash)
                .for_customer(customer.id)
                .paid(40000),
        )
        .await
        .unwrap();

    let customer = engine.store().get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(customer.credit_balance, 7000);
}
both_stores!(partial_payment_credits_the_remainder);

async fn duplicate_lines_sum_their_decrements<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(20)).await.unwrap();

    let sale = engine
        .create_sale(SaleRequest::new(
            vec![line(product.id, 2, 23500), line(product.id, 3, 23000)],
            PaymentMethod::Upi,
        ))
        .await
        .unwrap();

    assert_eq!(sale.amount, 2 * 23500 + 3 * 23000);
    let product = engine.store().get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, 15);

    let history = engine.store().history(None, 50).await.unwrap();
    assert_eq!(history[0].items.len(), 2);
}
both_stores!(duplicate_lines_sum_their_decrements);

async fn stock_may_go_negative<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(1)).await.unwrap();

    engine
        .create_sale(SaleRequest::new(
            vec![line(product.id, 3, 23500)],
            PaymentMethod::Cash,
        ))
        .await
        .unwrap();

    let product = engine.store().get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, -2);
    assert!(product.is_oversold());
}
both_stores!(stock_may_go_negative);

async fn unknown_product_changes_nothing<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(20)).await.unwrap();
    let customer = engine.store().create_customer(rahul()).await.unwrap();

    let err = engine
        .create_sale(
            SaleRequest::new(
                vec![line(product.id, 1, 23500), line(999, 1, 100)],
                PaymentMethod::Credit,
            )
            .for_customer(customer.id),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BillingError::NotFound {
            entity: Entity::Product,
            id: 999
        }
    ));

    assert_eq!(
        engine.store().get_product(product.id).await.unwrap().unwrap().stock_quantity,
        20
    );
    assert_eq!(
        engine.store().get_customer(customer.id).await.unwrap().unwrap().credit_balance,
        0
    );
    assert!(engine.store().history(None, 50).await.unwrap().is_empty());
}
both_stores!(unknown_product_changes_nothing);

async fn unknown_customer_is_not_found<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(20)).await.unwrap();

    let err = engine
        .create_sale(
            SaleRequest::new(vec![line(product.id, 1, 23500)], PaymentMethod::Credit)
                .for_customer(42),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BillingError::NotFound {
            entity: Entity::Customer,
            id: 42
        }
    ));
    assert_eq!(
        engine.store().get_product(product.id).await.unwrap().unwrap().stock_quantity,
        20
    );
}
both_stores!(unknown_customer_is_not_found);

async fn credit_without_customer_is_rejected<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(20)).await.unwrap();

    let err = engine
        .create_sale(SaleRequest::new(
            vec![line(product.id, 1, 23500)],
            PaymentMethod::Credit,
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BillingError::Validation(ValidationError::CreditWithoutCustomer { .. })
    ));
    assert_eq!(
        engine.store().get_product(product.id).await.unwrap().unwrap().stock_quantity,
        20
    );
}
both_stores!(credit_without_customer_is_rejected);

async fn walk_in_customer_is_created_with_the_sale<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(20)).await.unwrap();

    let sale = engine
        .create_sale(
            SaleRequest::new(vec![line(product.id, 1, 23500)], PaymentMethod::Credit)
                .walk_in("  Amit Kumar ", Some("9876543212".to_string())),
        )
        .await
        .unwrap();

    let customer_id = sale.customer_id.unwrap();
    let customer = engine.store().get_customer(customer_id).await.unwrap().unwrap();
    assert_eq!(customer.name, "Amit Kumar");
    assert_eq!(customer.phone.as_deref(), Some("9876543212"));
    assert_eq!(customer.credit_balance, 23500);
}
both_stores!(walk_in_customer_is_created_with_the_sale);

// =============================================================================
// RecordPayment
// =============================================================================

async fn payment_clears_and_floors_balance<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let customer = engine.store().create_customer(rahul()).await.unwrap();
    engine
        .store()
        .adjust_customer_balance(customer.id, 28500)
        .await
        .unwrap();

    let paid = engine.record_payment(payment(customer.id, 28500)).await.unwrap();
    assert_eq!(paid.kind, TransactionKind::Payment);
    assert_eq!(paid.amount, 28500);
    assert_eq!(
        paid.notes.as_deref(),
        Some("Payment received to clear credit balance")
    );
    assert_eq!(
        engine.store().get_customer(customer.id).await.unwrap().unwrap().credit_balance,
        0
    );

    // Paying into a zero balance is recorded but cannot push it negative.
    engine.record_payment(payment(customer.id, 100)).await.unwrap();
    assert_eq!(
        engine.store().get_customer(customer.id).await.unwrap().unwrap().credit_balance,
        0
    );
    assert_eq!(
        engine.store().history(Some(customer.id), 50).await.unwrap().len(),
        2
    );
}
both_stores!(payment_clears_and_floors_balance);

async fn payment_validation<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let customer = engine.store().create_customer(rahul()).await.unwrap();

    let err = engine.record_payment(payment(customer.id, 0)).await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::Validation(ValidationError::MustBePositive { .. })
    ));

    let mut on_credit = payment(customer.id, 100);
    on_credit.payment_method = PaymentMethod::Credit;
    let err = engine.record_payment(on_credit).await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::Validation(ValidationError::NotAllowed { .. })
    ));

    let err = engine.record_payment(payment(77, 100)).await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::NotFound {
            entity: Entity::Customer,
            id: 77
        }
    ));

    assert!(engine.store().history(None, 50).await.unwrap().is_empty());
}
both_stores!(payment_validation);

// =============================================================================
// Reads after billing
// =============================================================================

async fn dashboard_reflects_sales<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(6)).await.unwrap();
    let customer = engine.store().create_customer(rahul()).await.unwrap();

    engine
        .create_sale(
            SaleRequest::new(vec![line(product.id, 1, 23500)], PaymentMethod::Credit)
                .for_customer(customer.id),
        )
        .await
        .unwrap();
    engine.record_payment(payment(customer.id, 3500)).await.unwrap();

    let summary = engine.store().summary(chrono::Utc::now()).await.unwrap();
    assert_eq!(summary.total_low_stock, 1);
    assert_eq!(summary.total_receivables, 20000);
    assert_eq!(summary.today_sales, 23500);
    assert_eq!(summary.this_month_sales, 23500);

    let with_credit = engine
        .store()
        .list_customers(&CustomerFilter {
            has_credit: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(with_credit.len(), 1);
}
both_stores!(dashboard_reflects_sales);

// =============================================================================
// Arithmetic limits
// =============================================================================

async fn stock_overflow_is_refused<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(20)).await.unwrap();
    let giveaway = || SaleRequest::new(vec![line(product.id, i64::MAX, 0)], PaymentMethod::Cash);

    engine.create_sale(giveaway()).await.unwrap();
    let err = engine.create_sale(giveaway()).await.unwrap_err();
    assert!(
        matches!(err, BillingError::Storage(StoreError::Failed(_))),
        "{:?}",
        err
    );

    let stock = engine.store().get_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, 20 - i64::MAX);
    assert_eq!(engine.store().history(None, 50).await.unwrap().len(), 1);

    // A catalog edit fails as a whole, name included.
    let err = engine
        .store()
        .update_product(
            product.id,
            ProductPatch {
                name: Some("Atta (renamed)".to_string()),
                stock_delta: Some(-i64::MAX),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Failed(_)), "{:?}", err);

    let product = engine.store().get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.name, "Aashirvaad Atta (5kg)");
    assert_eq!(product.stock_quantity, 20 - i64::MAX);
}
both_stores!(stock_overflow_is_refused);

async fn balance_overflow_is_refused<S: Store>(store: S) {
    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(20)).await.unwrap();
    let customer = engine.store().create_customer(rahul()).await.unwrap();
    let on_credit = |price| {
        SaleRequest::new(vec![line(product.id, 1, price)], PaymentMethod::Credit)
            .for_customer(customer.id)
    };

    engine.create_sale(on_credit(i64::MAX)).await.unwrap();
    let err = engine.create_sale(on_credit(1)).await.unwrap_err();
    assert!(
        matches!(err, BillingError::Storage(StoreError::Failed(_))),
        "{:?}",
        err
    );

    // The stock decrement of the refused sale was rolled back with it.
    assert_eq!(
        engine.store().get_product(product.id).await.unwrap().unwrap().stock_quantity,
        19
    );
    assert_eq!(
        engine.store().get_customer(customer.id).await.unwrap().unwrap().credit_balance,
        i64::MAX
    );
    assert_eq!(engine.store().history(None, 50).await.unwrap().len(), 1);
}
both_stores!(balance_overflow_is_refused);

// =============================================================================
// Atomicity and concurrency
// =============================================================================

async fn concurrent_sales_lose_no_updates<S: Store>(store: S) {
    const N: i64 = 20;

    let engine = BillingEngine::new(store);
    let product = engine.store().create_product(atta(N)).await.unwrap();
    let customer = engine.store().create_customer(rahul()).await.unwrap();

    let handles: Vec<_> = (0..N)
        .map(|_| {
            let engine = engine.clone();
            let request = SaleRequest::new(vec![line(product.id, 1, 100)], PaymentMethod::Credit)
                .for_customer(customer.id);
            tokio::spawn(async move { engine.create_sale(request).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let product = engine.store().get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, 0);

    let customer = engine.store().get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(customer.credit_balance, N * 100);
    assert_eq!(engine.store().history(None, 500).await.unwrap().len(), N as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_lose_no_updates_memory() {
    concurrent_sales_lose_no_updates(MemoryStore::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_lose_no_updates_sqlite() {
    concurrent_sales_lose_no_updates(sqlite().await).await;
}

/// Several pooled connections against one file, so units of work contend
/// for SQLite's write lock instead of queueing for a single connection.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn file_database_serialises_mixed_writers() {
    const CREDIT_SALES: i64 = 30;
    const WALK_INS: i64 = 20;
    const PAYMENTS: i64 = 10;

    let dir = TempDir::new().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("khata.db")).max_connections(8))
        .await
        .unwrap();
    let engine = BillingEngine::new(db.clone());

    let product = db.create_product(atta(100)).await.unwrap();
    let customer = db.create_customer(rahul()).await.unwrap();

    // Opening balance large enough that no ordering reaches the floor.
    engine
        .create_sale(
            SaleRequest::new(vec![line(product.id, 1, 10_000)], PaymentMethod::Credit)
                .for_customer(customer.id),
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..CREDIT_SALES {
        let engine = engine.clone();
        let request = SaleRequest::new(vec![line(product.id, 1, 1000)], PaymentMethod::Credit)
            .for_customer(customer.id);
        handles.push(tokio::spawn(async move { engine.create_sale(request).await }));
    }
    for i in 0..WALK_INS {
        let engine = engine.clone();
        let request = SaleRequest::new(vec![line(product.id, 1, 1000)], PaymentMethod::Cash)
            .walk_in(format!("Walk-in {}", i), None);
        handles.push(tokio::spawn(async move { engine.create_sale(request).await }));
    }
    for _ in 0..PAYMENTS {
        let engine = engine.clone();
        let request = payment(customer.id, 500);
        handles.push(tokio::spawn(async move { engine.record_payment(request).await }));
    }

    let mut failures = Vec::new();
    for handle in handles {
        if let Err(err) = handle.await.unwrap() {
            failures.push(err);
        }
    }
    assert!(failures.is_empty(), "{:?}", failures);

    let product = db.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, 100 - 1 - CREDIT_SALES - WALK_INS);

    let customer = db.get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(
        customer.credit_balance,
        10_000 + CREDIT_SALES * 1000 - PAYMENTS * 500
    );

    let customers = db.list_customers(&CustomerFilter::default()).await.unwrap();
    assert_eq!(customers.len() as i64, 1 + WALK_INS);

    let history = db.history(None, 500).await.unwrap();
    assert_eq!(history.len() as i64, 1 + CREDIT_SALES + WALK_INS + PAYMENTS);

    db.close().await;
}

async fn unit_of_work_reads_its_own_writes<S: Store>(store: S) {
    let customer = store.create_customer(rahul()).await.unwrap();

    let mut work = store.begin().await.unwrap();
    work.adjust_customer_balance(customer.id, 7000).await.unwrap();
    let seen = work.get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(seen.credit_balance, 7000);
    assert!(work.get_customer(999).await.unwrap().is_none());
    work.rollback().await.unwrap();

    let customer = store.get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(customer.credit_balance, 0);
}
both_stores!(unit_of_work_reads_its_own_writes);

/// A failure at any step leaves stock, balances and the ledger untouched.
#[tokio::test]
async fn fault_at_any_step_rolls_back() {
    for step in [
        FailPoint::Begin,
        FailPoint::CreateCustomer,
        FailPoint::AdjustStock,
        FailPoint::AppendTransaction,
        FailPoint::AdjustBalance,
        FailPoint::Commit,
    ] {
        let store = MemoryStore::new();
        let engine = BillingEngine::new(store.clone());
        let product = store.create_product(atta(20)).await.unwrap();

        store.fail_on(step).await;
        let err = engine
            .create_sale(
                SaleRequest::new(vec![line(product.id, 2, 23500)], PaymentMethod::Credit)
                    .walk_in("Amit Kumar", None),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(err, BillingError::Storage(StoreError::Unavailable(_))),
            "{:?}: {:?}",
            step,
            err
        );
        assert!(err.is_retryable());

        let product = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 20, "{:?}", step);
        assert!(store.get_customer(1).await.unwrap().is_none(), "{:?}", step);
        assert_eq!(store.transaction_count().await, 0, "{:?}", step);

        // The fail point was one-shot; the retry goes through.
        engine
            .create_sale(
                SaleRequest::new(vec![line(product.id, 2, 23500)], PaymentMethod::Credit)
                    .walk_in("Amit Kumar", None),
            )
            .await
            .unwrap();
        assert_eq!(
            store.get_product(product.id).await.unwrap().unwrap().stock_quantity,
            18
        );
    }
}

#[tokio::test]
async fn failed_payment_leaves_balance() {
    let store = MemoryStore::new();
    let engine = BillingEngine::new(store.clone());
    let customer = store.create_customer(rahul()).await.unwrap();
    store.adjust_customer_balance(customer.id, 5000).await.unwrap();

    store.fail_on(FailPoint::AdjustBalance).await;
    engine
        .record_payment(payment(customer.id, 2000))
        .await
        .unwrap_err();

    let customer = store.get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(customer.credit_balance, 5000);
    assert_eq!(store.transaction_count().await, 0);
}
