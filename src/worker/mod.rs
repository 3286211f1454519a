pub mod driver;
pub mod worker;

pub use driver::{PollConfig, PollingDriver};
