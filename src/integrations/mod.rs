// src/integrations/mod.rs

//! Collaborators outside the process: payment gateway, notification channel,
//! photo storage.

pub mod files;
pub mod gateway;
pub mod notifier;
