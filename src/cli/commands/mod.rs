mod fetch;
mod history;

pub use fetch::cmd_fetch;
pub use history::cmd_history;
