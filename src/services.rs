// src/services.rs

pub mod auth;
pub mod billing_service;
pub mod document_service;
pub mod invite_service;
pub mod observation_service;
pub mod permit_service;
pub mod tenancy_service;
