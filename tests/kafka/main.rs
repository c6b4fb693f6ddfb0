//! Kafka E2E tests
//!
//! Run the tools against a real broker at `kafka:9092`. Ignored by default;
//! run with `cargo test --test kafka -- --ignored` once a broker is up.

mod broker_lib;
mod server_lib;
