pub mod aggregate;
pub mod calendar;
pub mod compile;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod period;
pub mod request;
pub mod storage;
pub mod table;

pub use calendar::Calendar;
pub use error::{Error, Result};
