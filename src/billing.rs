// src/billing.rs

// Integração com o gateway de pagamento (Razorpay)
pub mod gateway;
pub mod signature;
pub mod webhook;
