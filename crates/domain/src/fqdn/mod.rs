//! FQDN-based policy support: a TTL-governed cache of observed DNS answers
//! and the resolution of name selectors into the IPs currently behind them.

pub mod cache;
pub mod entity;
pub mod error;
pub mod matcher;
pub mod name;
pub mod resolver;
