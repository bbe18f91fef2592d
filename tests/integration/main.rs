// Each file in the tests directory is its own crate; this one gathers the
// integration modules under tests/integration/.

mod broker_test;
mod producer_bridge;
