pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod server;
pub mod store;
pub mod web;
