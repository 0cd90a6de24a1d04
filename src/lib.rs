//! Property discovery backend: cached personalized recommendations, map
//! viewport cell queries and per-neighborhood popularity rankings.
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
