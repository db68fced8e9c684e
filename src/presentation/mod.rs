pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod handlers;
pub mod leases;
pub mod middleware;
pub mod payments;
pub mod routes;
pub mod shop_book;
