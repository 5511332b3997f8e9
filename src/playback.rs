//! Sequential playback of produced files through an external media player.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

/// A media player binary and the arguments placed before the file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Player {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            program: PathBuf::from("/usr/bin/afplay"),
            args: vec!["-q".to_string(), "1".to_string()],
        }
    }
}

impl Player {
    pub fn command(&self, file: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(file).stdin(Stdio::null());
        cmd
    }

    /// Play one file and wait for the player to exit.
    pub fn play(&self, file: &Path) -> io::Result<()> {
        let status = self.command(file).status()?;
        if !status.success() {
            return Err(io::Error::other(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }
        Ok(())
    }

    /// Play every file in order. A failing file is logged and skipped.
    ///
    /// Returns how many files played successfully.
    pub fn play_all<P: AsRef<Path>>(&self, files: &[P]) -> usize {
        let mut played = 0;
        for file in files {
            let file = file.as_ref();
            log::debug!("Playing {}", file.display());
            match self.play(file) {
                Ok(()) => played += 1,
                Err(err) => log::error!("Playing {} failed: {err}", file.display()),
            }
        }
        played
    }
}
