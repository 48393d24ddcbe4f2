//! Support chat persistence port and service.
//!
//! `ChatRepository` is implemented by the infrastructure layer;
//! `ChatService` writes through it and then broadcasts the committed change.

pub mod repository;
pub mod service;
