pub mod auth;
pub mod avatar;

pub use auth::{profile_for, AuthService};
pub use avatar::AvatarService;
