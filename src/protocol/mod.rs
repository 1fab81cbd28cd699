pub mod command;
pub mod dispatch;
pub mod framer;
pub mod presence;
pub mod reply;
pub mod session;
