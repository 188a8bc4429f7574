//! Shared test fixtures

#![allow(dead_code)]

pub mod mock_backend;
pub mod mock_ml_service;
