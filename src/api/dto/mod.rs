//! Data Transfer Objects for REST request/response serialization.

pub mod account_dto;

pub use account_dto::*;
