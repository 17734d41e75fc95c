pub mod context;
pub mod poller;
pub mod runner;

pub use context::ScenarioContext;
pub use poller::{PollOutcome, PollSettings, poll_until_terminal};
pub use runner::SuiteRunner;
