// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod catalog;
pub mod config;
pub mod duckdb;
pub mod generator;
pub mod populate;
pub mod schema;
pub mod storage;
pub mod verify;
