mod cli;
mod input;
mod ui;

pub use cli::Cli;
pub use input::Command;
pub use ui::UI;
