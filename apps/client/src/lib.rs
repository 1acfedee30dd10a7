//! Client for the Resume Refinery ATS analysis service: session handling,
//! résumé upload, result presentation and analysis history.

pub mod analysis;
pub mod api_client;
pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod session;
pub mod workflow;
