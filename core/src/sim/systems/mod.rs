pub mod events;
pub mod policy;
pub mod scoring;
pub mod spillover;
