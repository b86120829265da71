// src/workflow.rs

// Regras de negócio puras (sem banco): os serviços carregam a entidade já
// filtrada pelo tenant, aplicam a transição aqui e persistem o resultado.
pub mod access;
pub mod observation;
pub mod permit;
