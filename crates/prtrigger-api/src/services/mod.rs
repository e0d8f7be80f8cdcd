//! Outbound service clients.

pub mod jenkins;

pub use jenkins::JenkinsTrigger;
