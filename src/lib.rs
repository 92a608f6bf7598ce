//! Scream Hero: a flappy-style game where microphone loudness makes the hero
//! jump. The engine lives in [`session`]; everything it talks to is behind
//! the traits in [`collab`].

pub mod app;
pub mod audio;
pub mod collab;
pub mod config;
pub mod error;
pub mod geometry;
pub mod loudness;
pub mod obstacle;
pub mod physics;
pub mod scoring;
pub mod session;
pub mod terminal;

pub use app::{App, Flow};
pub use collab::{AudioCapture, Clock, Command, Effects, Hud, InputSource, Mute, Renderer};
pub use config::{EngineConfig, Preset};
pub use error::{Error, Result};
pub use loudness::{Impulse, LoudnessGate};
pub use session::{EndReason, GameSession, Phase, Snapshot, TickOutcome};
