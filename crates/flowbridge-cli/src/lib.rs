//! Flowbridge CLI library: the command implementations behind the
//! `flowbridge` binary, exposed for integration tests.

pub mod commands;
