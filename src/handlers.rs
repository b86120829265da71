// src/handlers.rs

pub mod auth;
pub mod billing;
pub mod documents;
pub mod invites;
pub mod observations;
pub mod permits;
pub mod tenancy;
