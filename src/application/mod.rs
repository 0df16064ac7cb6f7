// Preprocessing, fitted pipeline and offline training
pub mod ml;

// Valuation orchestration
pub mod prediction_service;

// Static explanation content
pub mod explanation;
