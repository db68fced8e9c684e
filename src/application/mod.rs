pub mod auth_service;
pub mod customer_service;
pub mod dashboard_service;
pub mod ledger_service;
pub mod shop_book_service;
