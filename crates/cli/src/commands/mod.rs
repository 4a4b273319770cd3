pub mod generate;
pub mod init;

pub use generate::{generate_command, load_config};
pub use init::init_command;
