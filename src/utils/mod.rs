// src/utils/mod.rs

pub mod client_addr;
pub mod hash;
pub mod html;
pub mod jwt;
