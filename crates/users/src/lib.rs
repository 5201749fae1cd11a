pub mod models;
mod repository;
pub mod service;
