// Vehicle attributes and catalogue
pub mod vehicle;

// Price floor, breakdown and confidence rules
pub mod valuation;

// Feature names and model input rows
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
