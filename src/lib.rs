// Library surface for the binary, headless/integration tests and reuse.
// Nothing here owns the terminal; main.rs sets it up and drives the runner.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod history;
pub mod logging;
pub mod presenter;
pub mod runtime;
pub mod scores;
pub mod scoring;
pub mod session;
pub mod speech;
pub mod trial;
pub mod ui;
