//! Media Uploader Library
//!
//! Validates uploaded files and moves them into S3-compatible object storage
//! with the multipart upload protocol. The server binary is in main.rs.
//!
//! # Modules
//!
//! - `upload`: Validation, part planning, retrying part uploads, orchestration
//! - `storage`: Object storage backends (AWS SDK, in-memory)
//! - `routes`: HTTP endpoints

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;
pub mod upload;
