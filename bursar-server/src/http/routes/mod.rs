//! Route handlers organized by resource

pub mod applications;
pub mod auth;
pub mod bursaries;
pub mod health;
pub mod profiles;
pub mod social;
