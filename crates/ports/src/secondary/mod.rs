pub mod clock_port;
pub mod dns_cache_port;
