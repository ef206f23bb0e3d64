// Catalog Admin - library root

pub mod access;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod http_client;
pub mod listing;
pub mod models;
pub mod session;
pub mod validation;
