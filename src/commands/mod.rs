// Environment lifecycle commands
pub mod environment;

// Capability tables
pub mod fields;
