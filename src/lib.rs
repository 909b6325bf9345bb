// osintgate - Authenticated HTTP gateway for OSINT command-line tools
// Library exports

pub mod cache; // Fingerprinted result cache (redis / memory)
pub mod config;
pub mod errors;
pub mod server; // HTTP surface
pub mod tools; // Command builders, process runner, dispatcher
