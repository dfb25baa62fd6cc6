//! Pub/Sub Tests
//!
//! Subscriber behaviour and frame classification over an in-memory socket.

#[path = "../common/mod.rs"]
mod common;

mod classify_tests;
mod subscriber_tests;
