//! Library crate for karaoke-queue-back: song request queues for live karaoke
//! events, exposed to the binaries and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
