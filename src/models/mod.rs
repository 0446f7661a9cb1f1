// src/models/mod.rs

pub mod admin;
pub mod audit;
pub mod category;
pub mod exam_session;
pub mod participant;
pub mod question;
pub mod verification;
