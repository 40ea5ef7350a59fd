mod command;
mod listener;

pub use command::AdminCommand;
pub use listener::listen;
