//! keygate web server.
//!
//! This crate provides the HTTP surface of the keygate login gateway:
//! provider login and callback routes, the encrypted cookie session store,
//! and the guarded profile page.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod pages;
