pub mod fqdn_resolution_port;
