use clap::Parser;
use database::Database;

pub mod auth;
pub mod money;
pub mod validation;

pub use money::{Money, MoneyError};
pub use validation::{FieldError, ValidationErrors};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:finance.db")]
    pub database_url: String,

    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Mark session cookies `Secure` (serve over HTTPS when set).
    #[arg(long, env = "SECURE_COOKIES", default_value_t = false)]
    pub secure_cookies: bool,
}
