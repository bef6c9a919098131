//! Infrastructure backends for reaching the parameter server.
//!
//! Provides the `CommandRunner` abstraction for spawning external tools and
//! the `rosparam`-backed implementation of `ParamStore`. Command builders stay
//! pure; only `ProcessRunner` touches the operating system.

pub mod rosparam;
pub mod runner;

pub use rosparam::{RosparamCommand, RosparamStore};
pub use runner::{CommandRunner, MockRunner, ProcessRunner};
