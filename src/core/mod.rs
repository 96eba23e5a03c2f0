//! Core domain types for the authentication and authorization engine.

pub mod models;
