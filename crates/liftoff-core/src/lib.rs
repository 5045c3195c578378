//! Liftoff Core - dispatcher and shared plumbing for mobile test orchestration
//!
//! Liftoff wraps three external tools: an app build/deployment CLI, a mobile
//! automation server, and a test runner. This crate owns the contract between
//! them and the rest of the program:
//!
//! - [`Dispatcher`]: one async operation per external action, each returning
//!   a [`Result`]
//! - [`settle`]: the fatal boundary used by the CLI (report, then exit)
//! - collaborator traits in [`traits`], implemented by `liftoff-adapters`
//! - configuration loading and validation in [`config`]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod output;
pub mod traits;
pub mod types;

pub use dispatch::{settle, Dispatcher, Terminator};
pub use error::{
    AutomationError, BuildToolError, ConfigError, LiftoffError, Result, TestError,
};
pub use output::{CollectingOutput, ConsoleOutput, Output, OutputEvent};
pub use traits::{AutomationServer, BuildTool, TestSuite};
pub use types::{BuildOutput, Capabilities, LoginMode, Platform, TestFile};
