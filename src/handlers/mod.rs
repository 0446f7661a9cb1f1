// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod ebook;
pub mod exam;
pub mod multipart;
pub mod registration;
