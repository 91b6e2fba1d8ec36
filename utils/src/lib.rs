//! Helpers shared by the tests and benchmarks of `trie-collections`.

pub mod colliding;
pub mod model;

pub use colliding::CollidingKey;

/// Routes the crate's `log` output to the test harness. Set `RUST_LOG=trace`
/// to see trie growth, collisions and finalizations.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
