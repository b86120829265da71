// src/db.rs

pub mod billing_repo;
pub use billing_repo::BillingRepository;
pub mod invite_repo;
pub use invite_repo::InviteRepository;
pub mod observation_repo;
pub use observation_repo::ObservationRepository;
pub mod permit_repo;
pub use permit_repo::PermitRepository;
pub mod sequence;
pub use sequence::{MemoryPermitSequence, PermitSequence, PgPermitSequence};
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
