pub mod directline;
pub mod error;
pub mod routes;

pub use directline::{DirectLineBroker, SessionToken};
pub use error::BrokerError;
