//! Benchmark orchestration for the effection structured-concurrency library.
//!
//! effection-bench provisions an isolated workspace pinning one effection
//! release alongside its comparison libraries (rxjs, effect, co), then drives
//! a measurement harness through one or more JavaScript runtimes as
//! subprocesses. Each runtime's harness output is validated and persisted as
//! an immutable JSON result record for downstream comparison tooling.

pub mod bench;
pub mod config;
pub mod ext;
pub mod request;
pub mod runtime;
pub mod schema;
pub mod stats;
pub mod workspace;

pub use bench::{Bench, BenchOpts, Summary};
pub use request::BenchmarkRequest;
pub use schema::{BenchmarkResult, Metadata, ScenarioResult};
