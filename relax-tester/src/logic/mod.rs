pub mod bots;
pub mod reports;
pub mod selection;
pub mod tester;

pub use selection::{resolve_dates, resolve_games, resolve_locales, scenarios_for};
pub use tester::*;
