//! Subcommands a batch can run

use std::fmt;

use serde::{Deserialize, Serialize};

/// The active subcommand of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Build,
    Launch,
    Test,
    Clean,
    Install,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Build => "build",
            Command::Launch => "launch",
            Command::Test => "test",
            Command::Clean => "clean",
            Command::Install => "install",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
