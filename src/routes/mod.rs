pub mod health;
pub mod match_routes;
