//! SQLHub command line front end
//!
//! The database abstraction itself lives in `sqlhub-databases`; this crate
//! wires it to a configuration file and a handful of commands.

pub mod cli;
