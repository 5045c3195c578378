//! CLI commands

mod app_path;
mod appc;
mod build;
mod client;
mod completions;
mod doctor;
mod init;
mod pipeline;
mod server;
mod setup;
mod test;

pub use app_path::AppPathCommand;
pub use appc::AppcCommand;
pub use build::{BuildCommand, PlatformArg};
pub use client::ClientCommand;
pub use completions::CompletionsCommand;
pub use doctor::DoctorCommand;
pub use init::InitCommand;
pub use pipeline::PipelineCommand;
pub use server::ServerCommand;
pub use setup::SetupCommand;
pub use test::TestCommand;
