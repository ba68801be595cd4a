// Library surface for headless/integration tests and reuse.
// The binary in main.rs only adds argument parsing and the terminal loop.
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod logging;
pub mod persistence;
pub mod round;
pub mod runtime;
pub mod scrambler;
pub mod session;
pub mod timers;
pub mod ui;
pub mod words;

pub use config::GameConfig;
pub use engine::{Action, GameState, Outcome, Status};
pub use error::GameError;
pub use session::{Intent, SaveStatus, SessionController, Snapshot};
