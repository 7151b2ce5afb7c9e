// src/lib.rs

//! yt-monitor library
//!
//! Polls channel pages, extracts a typed snapshot from each, and raises one
//! notification per newly observed upload, live broadcast or scheduled live.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
