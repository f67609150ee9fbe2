//! Live deployment event broadcasting

pub mod bus;
