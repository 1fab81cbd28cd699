pub mod error;

pub mod base {
    pub mod address;
}

pub mod defs {
    pub mod cmd;
}

pub mod drivers;
pub mod protocol;
pub mod store;
pub mod config;
