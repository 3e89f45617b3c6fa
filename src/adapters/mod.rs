pub mod api_football;
pub mod postgres;

pub use api_football::{fixture_ref_from_api, ApiFootballClient};
pub use postgres::{PostgresConnector, PostgresStore};
