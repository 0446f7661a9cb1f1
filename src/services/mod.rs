// src/services/mod.rs

pub mod allocator;
pub mod audit;
pub mod credentials;
pub mod exam;
pub mod payment;
