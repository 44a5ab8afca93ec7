pub mod health;
pub mod requests;
pub mod routes;
