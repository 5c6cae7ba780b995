//! # flavors-server
//!
//! HTTP front end for Festival Flavors: account registration and login,
//! recipe submission (typed or voice), and search over submitted recipes.

pub mod api;
pub mod config;
pub mod error;
pub mod forms;
pub mod geo;
pub mod media;
pub mod session;
pub mod transcribe;
