use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer, Scope};
use checkout_engine::{
    events::{EventHandlers, EventHooks, EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    OrderFlowApi,
    SqliteDatabase,
    StorefrontDatabase,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    routes::{confirm_payment, health, payment_info, payment_webhook, place_order, trigger_sweep},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(16, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let worker = start_expiry_worker(db.clone(), config.policy, producers.clone());
    let srv = create_server_instance(config, db, producers)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    worker.abort();
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<actix_web::dev::Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let order_api = OrderFlowApi::new(db.clone(), config.policy, producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("shop::access_log"))
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(config.clone()))
            .service(health)
            .service(api_scope::<SqliteDatabase>())
            .service(webhook_scope::<SqliteDatabase>())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// The buyer- and operator-facing routes. Generic over the backend so the endpoint tests can build the same app the
/// production server runs.
pub fn api_scope<B: StorefrontDatabase + 'static>() -> Scope {
    web::scope("/api")
        .route("/orders", web::post().to(place_order::<B>))
        .route("/orders/{order_number}/payment-info", web::get().to(payment_info::<B>))
        .route("/orders/{order_number}/confirm", web::post().to(confirm_payment::<B>))
        .route("/expire-orders", web::post().to(trigger_sweep::<B>))
}

pub fn webhook_scope<B: StorefrontDatabase + 'static>() -> Scope {
    web::scope("/webhook").route("/bank-transfer", web::post().to(payment_webhook::<B>))
}

/// The default deployment reacts to engine events by logging them; fulfilment integrations replace these hooks.
pub fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|event: OrderPaidEvent| {
        Box::pin(async move {
            info!("📦️ Order {} is paid and ready for fulfilment", event.order.order_number);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_order_annulled(|event: OrderAnnulledEvent| {
        Box::pin(async move {
            info!("📦️ Order {} was annulled ({})", event.order.order_number, event.status);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}
