//! Request handling shared by the TCP and HTTP transports

pub mod json;
