//! Jobwatch Core
//!
//! Core types shared by the Jobwatch service.
//!
//! This crate contains:
//! - Domain types: credentials, sessions and job records
//! - DTOs: request/response bodies for the HTTP adapter

pub mod domain;
pub mod dto;
