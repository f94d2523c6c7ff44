//! Engine module housing the session runtime.
//!
//! This module exposes the capability traits and stock backends the scheduler
//! drives (`backend`) and the `SessionHandle` runtime that owns the scheduler
//! thread (`core`).

pub mod backend;
pub mod core;

pub use backend::{
    ClickEmitter, LiveRow, LogClickEmitter, ManualTimeSource, MemoryMetricSink, MetricSink,
    RefreshHook, RoundFileWriter, SystemTimeSource, TimeSource,
};
pub use core::{ParamPatch, SessionHandle, SessionStatus};
