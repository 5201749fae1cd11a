pub mod handler;
pub mod models;
mod repository;
pub mod service;

pub use models::{Goal, GoalStatus, GoalView};
pub use service::{GoalError, GoalService};
