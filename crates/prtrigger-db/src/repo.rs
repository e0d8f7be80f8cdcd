//! PostgreSQL implementations of the core collaborator traits.

pub mod jobs;
pub mod pull_request;
pub mod state;
pub mod user;

pub use jobs::PgJobRunner;
pub use pull_request::PgPullRequestStore;
pub use state::PgStateStore;
pub use user::PgUserDirectory;
