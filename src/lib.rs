//! Local shell command provisioner.
//!
//! A configuration (`command` or `inline` lines, plus an optional
//! `execute_command` template) is normalized into one shell command line,
//! which is then run through a [`communicator::Communicator`].

pub mod cli;
pub mod communicator;
pub mod config;
pub mod error;
pub mod executor;
pub mod provisioner;
pub mod template;
pub mod ui;

pub use error::{ProvisionError, Result};
pub use provisioner::{Provisioner, ProvisionerState};
