//! Loan approval scoring service.
//!
//! Scores loan applications with a frozen preprocessing pipeline and a
//! decision forest, explains each decision through permutation-based
//! feature attribution, and appends every scored request to an append-only
//! SQLite audit trail. The HTTP layer is a thin shell over
//! [`logic::model::ScoringService`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
