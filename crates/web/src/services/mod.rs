//! Business logic for the web app.
//!
//! # Services
//!
//! - `auth` - Registration, login, account edits and password reset
//! - `email` - SMTP email sending (password reset links)
//! - `stores` - Store writes with slug assignment, reviews, hearts and the
//!   aggregation views
//! - `uploads` - Store photo uploads

pub mod auth;
pub mod email;
pub mod stores;
pub mod uploads;
