// src/models.rs

pub mod auth;
pub mod billing;
pub mod invite;
pub mod observation;
pub mod permit;
pub mod tenancy;
