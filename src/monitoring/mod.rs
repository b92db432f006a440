/*!
 * Monitoring
 * Tracing subscriber setup for programs built on the crate
 */

mod tracer;

pub use tracer::{init_tracing, init_tracing_with, TraceFormat};
