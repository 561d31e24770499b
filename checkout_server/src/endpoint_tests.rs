//! Endpoint tests: the real route table and handlers wired to a throwaway SQLite database.
use actix_web::{test, web, App};
use checkout_engine::{
    events::EventProducers,
    test_utils::prepare_env::{backdate_order, prepare_test_env, random_db_path, seed_product},
    OrderFlowApi,
    SqliteDatabase,
};
use serde_json::{json, Value};
use shop_common::Secret;

use crate::{
    config::{BankAccount, ServerConfig},
    helpers::calculate_hmac_hex,
    routes::health,
    server::{api_scope, webhook_scope},
};

/// Builds the same app the production server runs, minus the TLS/keep-alive plumbing.
macro_rules! test_app {
    ($db:expr, $config:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(OrderFlowApi::new(
                    $db.clone(),
                    $config.policy,
                    EventProducers::default(),
                )))
                .app_data(web::Data::new($config.clone()))
                .service(health)
                .service(api_scope::<SqliteDatabase>())
                .service(webhook_scope::<SqliteDatabase>()),
        )
        .await
    };
}

async fn test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    seed_product(&db, "prod-tea", "Oolong tea", &[("TEA-250G", 265_000, 10)]).await;
    db
}

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.bank = BankAccount {
        bank_code: "970422".to_string(),
        account_number: "0123456789".to_string(),
        account_name: "SHOP JSC".to_string(),
    };
    config
}

fn order_body() -> Value {
    json!({
        "customerId": "cust-1",
        "items": [{"productId": "prod-tea", "variantSku": "TEA-250G", "quantity": 2, "price": 265_000}],
        "shippingAddress": {
            "fullName": "Nguyen Van A",
            "phone": "0901234567",
            "street": "12 Ly Thuong Kiet",
            "district": "Quan 3",
            "city": "Ho Chi Minh"
        },
        "paymentMethod": "bank_transfer"
    })
}

#[actix_web::test]
async fn health_check_works() {
    let db = test_db().await;
    let app = test_app!(db, test_config());
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn checkout_payment_info_and_webhook_round_trip() {
    let db = test_db().await;
    let app = test_app!(db, test_config());

    let req = test::TestRequest::post().uri("/api/orders").set_json(order_body()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201);
    let order: Value = test::read_body_json(resp).await;
    let number = order["orderNumber"].as_str().expect("orderNumber missing").to_string();
    assert_eq!(order["totalAmount"].as_i64(), Some(530_000));
    assert_eq!(order["paymentStatus"].as_str(), Some("pending"));

    let req = test::TestRequest::get().uri(&format!("/api/orders/{number}/payment-info")).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let info: Value = test::read_body_json(resp).await;
    let qr = info["qrUrl"].as_str().unwrap();
    assert!(qr.starts_with("https://img.vietqr.io/image/970422-0123456789-compact2.png?amount=530000"));
    assert!(info["remainingSeconds"].as_i64().unwrap() > 0);
    assert_eq!(info["memo"].as_str(), Some(number.as_str()));

    let webhook = json!({"amount": 530_000, "content": format!("ck {number}"), "transactionId": "FT900"});
    let req = test::TestRequest::post().uri("/webhook/bank-transfer").set_json(&webhook).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let ack: Value = test::read_body_json(resp).await;
    assert_eq!(ack["success"].as_bool(), Some(true));
    assert_eq!(ack["orderNumber"].as_str(), Some(number.as_str()));

    // Redelivery acknowledges without settling twice.
    let req = test::TestRequest::post().uri("/webhook/bank-transfer").set_json(&webhook).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let ack: Value = test::read_body_json(resp).await;
    assert_eq!(ack["success"].as_bool(), Some(true));

    // The order is settled now, so the operator path reports the conflict.
    let req = test::TestRequest::post()
        .uri(&format!("/api/orders/{number}/confirm"))
        .insert_header(("x-operator", "alice"))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 409);
}

#[actix_web::test]
async fn validation_failures_map_to_client_errors() {
    let db = test_db().await;
    let app = test_app!(db, test_config());

    let mut body = order_body();
    body["items"] = json!([]);
    let req = test::TestRequest::post().uri("/api/orders").set_json(body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);

    let req = test::TestRequest::get().uri("/api/orders/ORD-19700101-0000/payment-info").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[actix_web::test]
async fn business_rejections_are_acknowledged_with_200() {
    let db = test_db().await;
    let app = test_app!(db, test_config());

    let req = test::TestRequest::post()
        .uri("/webhook/bank-transfer")
        .set_json(json!({"unexpected": "shape"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let ack: Value = test::read_body_json(resp).await;
    assert_eq!(ack["success"].as_bool(), Some(false));
    assert!(ack["error"].as_str().is_some());
}

#[actix_web::test]
async fn malformed_webhook_bodies_are_a_transport_error() {
    let db = test_db().await;
    let app = test_app!(db, test_config());

    let req = test::TestRequest::post().uri("/webhook/bank-transfer").set_payload("not json").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn webhook_signatures_are_enforced_when_configured() {
    let db = test_db().await;
    let mut config = test_config();
    config.webhook_secret = Some(Secret::new("topsecret".to_string()));
    let app = test_app!(db, config);

    let body = json!({"amount": 1000, "content": "DH99999999", "id": "FT950"}).to_string();

    let req = test::TestRequest::post().uri("/webhook/bank-transfer").set_payload(body.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    let req = test::TestRequest::post()
        .uri("/webhook/bank-transfer")
        .insert_header(("x-signature", "deadbeef"))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    let signature = calculate_hmac_hex("topsecret", body.as_bytes());
    let req = test::TestRequest::post()
        .uri("/webhook/bank-transfer")
        .insert_header(("x-signature", signature))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let req = test::TestRequest::post()
        .uri("/webhook/bank-transfer")
        .insert_header(("authorization", "Apikey topsecret"))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[actix_web::test]
async fn the_sweep_endpoint_reports_what_it_cancelled() {
    let db = test_db().await;
    let app = test_app!(db, test_config());

    let req = test::TestRequest::post().uri("/api/orders").set_json(order_body()).to_request();
    let resp = test::call_service(&app, req).await;
    let order: Value = test::read_body_json(resp).await;
    let number = order["orderNumber"].as_str().unwrap().to_string();
    backdate_order(&db, order["id"].as_i64().unwrap(), 31).await;

    let req = test::TestRequest::post().uri("/api/expire-orders").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let sweep: Value = test::read_body_json(resp).await;
    assert_eq!(sweep["cancelledCount"].as_i64(), Some(1));
    assert_eq!(sweep["cancelledOrders"][0].as_str(), Some(number.as_str()));
}
