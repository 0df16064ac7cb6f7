pub mod pipeline;
pub mod preprocessing;
pub mod training;
