//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod role;
pub mod user;
pub mod bursary;
pub mod application;
pub mod social;

pub use validation::ValidationError;
pub use role::Role;
pub use user::{Credentials, Email, NewUser, ProfileChanges, ProfileStats, PublicProfile, User, UserSummary};
pub use bursary::{parse_deadline, Bursary, BursaryChanges, BursaryListing, BursaryStatus, NewBursary};
pub use application::{
    Application, ApplicationDocument, ApplicationStatus, LearnerApplication, Motivation,
    NewDocument, ProviderApplication,
};
pub use social::{FeedPost, Post, PostContent, FEED_LIMIT};
