//! sqlx repositories backing [`PgStore`](super::PgStore)
//!
//! Each repository follows these patterns:
//! - Owner filters live in the WHERE clause of the statement that reads or writes
//! - Uses JOINs for list operations (no N+1)
//! - Handles duplicate edges via ON CONFLICT DO NOTHING (no check-then-insert)

pub mod users;
pub mod bursaries;
pub mod applications;
pub mod social;

pub use users::UserRepo;
pub use bursaries::BursaryRepo;
pub use applications::ApplicationRepo;
pub use social::SocialRepo;
