//! Liftoff Adapters - production collaborators for the dispatcher
//!
//! - [`AppcCli`]: the Appcelerator build tool, driven through its CLI
//! - [`AppiumServer`]: the Appium server process and its WebDriver client
//! - [`MochaRunner`]: test file collection by glob, execution with mocha
//!
//! [`dispatcher`] wires all three from a loaded [`Config`].

pub mod appc;
pub mod appium;
pub mod mocha;
pub mod process;

use std::sync::Arc;

use liftoff_core::config::Config;
use liftoff_core::{Dispatcher, Output};

pub use appc::AppcCli;
pub use appium::AppiumServer;
pub use mocha::MochaRunner;
pub use process::{CommandOutput, OutputMode, ToolCommand};

/// Build a dispatcher backed by the real tools described in `config`
pub fn dispatcher(config: &Config, output: Arc<dyn Output>) -> Dispatcher {
    Dispatcher::new(
        Arc::new(AppcCli::from_config(&config.build)),
        Arc::new(AppiumServer::new(&config.automation)),
        Arc::new(MochaRunner::new(config.tests.clone())),
        output,
    )
}
