#![forbid(unsafe_code)]

pub mod fqdn_cache_service_impl;
