pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod db;
pub mod docs;
pub mod error;
pub mod gateway;
pub mod model;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod utils;
