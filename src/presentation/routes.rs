use crate::presentation::handlers::{health_check, json_config, path_config, query_config};
use crate::presentation::{auth, customers, dashboard, leases, payments, shop_book};
use actix_web::web;

/// Registers the `/api` scope. Authentication is applied by wrapping the app
/// in `JwtAuthMiddleware`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .route("/health", web::get().to(health_check))
            .route("/auth/register", web::post().to(auth::register))
            .route("/auth/login", web::post().to(auth::login))
            .route("/auth/me", web::get().to(auth::me))
            .route("/auth/settings", web::put().to(auth::update_settings))
            .route("/dashboard", web::get().to(dashboard::summary))
            .service(
                web::resource("/customers")
                    .route(web::get().to(customers::list_customers))
                    .route(web::post().to(customers::create_customer)),
            )
            .service(
                web::resource("/customers/{id}")
                    .route(web::get().to(customers::get_customer))
                    .route(web::put().to(customers::update_customer))
                    .route(web::delete().to(customers::delete_customer)),
            )
            .route(
                "/customers/{id}/statement",
                web::get().to(customers::customer_statement),
            )
            .service(
                web::resource("/leases")
                    .route(web::get().to(leases::list_leases))
                    .route(web::post().to(leases::create_lease)),
            )
            .service(
                web::resource("/leases/{id}")
                    .route(web::get().to(leases::get_lease))
                    .route(web::put().to(leases::update_lease))
                    .route(web::delete().to(leases::delete_lease)),
            )
            .service(
                web::resource("/payments")
                    .route(web::get().to(payments::list_payments))
                    .route(web::post().to(payments::record_payment)),
            )
            .service(
                web::resource("/payments/{id}")
                    .route(web::get().to(payments::get_payment))
                    .route(web::put().to(payments::update_payment))
                    .route(web::delete().to(payments::delete_payment)),
            )
            .service(
                web::scope("/shop")
                    .service(
                        web::resource("/sales")
                            .route(web::get().to(shop_book::list_sales))
                            .route(web::post().to(shop_book::record_sale)),
                    )
                    .service(
                        web::resource("/collections")
                            .route(web::get().to(shop_book::list_collections))
                            .route(web::post().to(shop_book::record_collection)),
                    )
                    .service(
                        web::resource("/loans")
                            .route(web::get().to(shop_book::list_loans))
                            .route(web::post().to(shop_book::add_loan)),
                    )
                    .route("/loans/{id}", web::put().to(shop_book::update_loan_status))
                    .service(
                        web::resource("/billings")
                            .route(web::get().to(shop_book::list_billings))
                            .route(web::post().to(shop_book::add_billing)),
                    ),
            ),
    );
}
