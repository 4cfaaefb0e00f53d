#![forbid(unsafe_code)]
//! Client-side persistence: the stored auth session and nothing else.

pub mod repository;
pub mod sqlite;
