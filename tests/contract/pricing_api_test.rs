// HTTP contract for the pricing endpoints and health probes.
//
// Decimal fields travel as JSON strings ("47.25"); requests may send either
// strings or numbers.

use std::str::FromStr;
use std::sync::Arc;

use actix_web::{test, web, App};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use sales_voucher::config::PricingConfig;
use sales_voucher::middleware::json_error_handler;
use sales_voucher::modules::pricing::InMemoryPricingSource;
use sales_voucher::modules::vouchers::InMemoryVoucherStore;
use sales_voucher::{configure_routes, AppState};

fn app_state() -> AppState {
    AppState::new(
        Arc::new(InMemoryPricingSource::new()),
        Arc::new(InMemoryVoucherStore::new()),
        PricingConfig::default(),
    )
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {}", other),
    }
}

fn line_request(customer_type: Option<&str>) -> Value {
    let mut body = json!({
        "line": {
            "finished_good": { "id": "fg-1", "title": "Basmati Rice" },
            "account_level4": { "id": "al4-1", "title": "Basmati Rice 5kg" },
            "quantity": "10",
            "rate": "5.00"
        },
        "invoice_date": "2024-07-01",
        "discounts": {
            "rule_sets": [{
                "debtor_account_id": "d-1",
                "sub_account_id": "s-1",
                "finished_good_id": "fg-1",
                "is_active": true,
                "rates": [{
                    "discount_type_id": "trade",
                    "title": "Trade Discount",
                    "type": "percentage",
                    "rate": "10",
                    "is_editable": true
                }]
            }]
        },
        "tax_rule_sets": [{
            "finished_good_id": "fg-1",
            "account_level4_id": "al4-1",
            "applicable_date": "2024-01-01",
            "is_active": true,
            "rules": [{
                "tax_type_id": "gst",
                "title": "GST",
                "type": "percentage",
                "registered_value": "5",
                "unregistered_value": "0",
                "is_editable": true,
                "transaction_type": "sale"
            }]
        }]
    });
    if let Some(customer_type) = customer_type {
        body["customer"] = json!({ "customer_type": customer_type });
    }
    body
}

#[actix_web::test]
async fn test_compute_line_for_registered_customer() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/pricing/lines")
        .set_json(line_request(Some("registered")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(decimal(&body["amount"]), dec!(50));
    assert_eq!(decimal(&body["net_amount_before_tax"]), dec!(45));
    assert_eq!(decimal(&body["net_amount"]), dec!(47.25));
    assert_eq!(body["discount_breakdown"][0]["discount_type_id"], "trade");
    assert_eq!(decimal(&body["discount_breakdown"][0]["value"]), dec!(5));
    assert_eq!(decimal(&body["tax_breakdown"][0]["value"]), dec!(2.25));
    assert_eq!(body["is_edited"], false);
}

#[actix_web::test]
async fn test_compute_line_defaults_to_unregistered() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/pricing/lines")
        .set_json(line_request(None))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["tax_breakdown"].as_array().unwrap().len(), 0);
    assert_eq!(decimal(&body["net_amount"]), dec!(45));
}

#[actix_web::test]
async fn test_compute_line_rejects_non_positive_quantity() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(configure_routes),
    )
    .await;

    let mut request = line_request(None);
    request["line"]["quantity"] = json!("-2");
    let req = test::TestRequest::post()
        .uri("/api/pricing/lines")
        .set_json(request)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], 400);
    assert!(body["error"]["message"].as_str().unwrap().starts_with("Validation error"));
}

#[actix_web::test]
async fn test_compute_line_rejects_amount_out_of_range() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(configure_routes),
    )
    .await;

    let mut request = line_request(Some("registered"));
    request["line"]["quantity"] = json!("100000000000000000000");
    request["line"]["rate"] = json!("100000000000000000000");
    let req = test::TestRequest::post()
        .uri("/api/pricing/lines")
        .set_json(request)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "Validation error: Amount out of range");
}

#[actix_web::test]
async fn test_malformed_body_uses_error_shape() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/pricing/lines")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"line\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], 400);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
}

#[actix_web::test]
async fn test_project_ledger_balances() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(configure_routes),
    )
    .await;

    // Price a line first, then project it
    let req = test::TestRequest::post()
        .uri("/api/pricing/lines")
        .set_json(line_request(Some("registered")))
        .to_request();
    let line: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/pricing/ledger")
        .set_json(json!({
            "items": [line],
            "customer": { "id": "s-1", "title": "Ali Traders" }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(decimal(&body["totals"]["total_amount"]), dec!(50));
    assert_eq!(decimal(&body["totals"]["discount_amount"]), dec!(5));
    assert_eq!(decimal(&body["totals"]["tax_amount"]), dec!(2.25));
    assert_eq!(decimal(&body["totals"]["net_amount"]), dec!(47.25));

    let ledger = &body["ledger"];
    assert_eq!(ledger["is_balanced"], true);
    assert_eq!(decimal(&ledger["totals"]["debit_total"]), dec!(52.25));
    assert_eq!(decimal(&ledger["totals"]["credit_total"]), dec!(52.25));
    assert_eq!(ledger["debit_rows"][0]["title"], "Ali Traders");
    assert_eq!(ledger["debit_rows"][0]["kind"], "customer");
}

#[actix_web::test]
async fn test_project_ledger_of_nothing() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/pricing/ledger")
        .set_json(json!({}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(decimal(&body["ledger"]["totals"]["debit_total"]), Decimal::ZERO);
    assert_eq!(body["ledger"]["is_balanced"], true);
}

#[actix_web::test]
async fn test_health_probe() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "sales-voucher");
}
