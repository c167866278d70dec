/*!
Reading from a file or stdin, and writing to a file or stdout
*/

use anyhow::Context;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// A file path, or `-` for stdin
#[derive(Debug, Clone)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    pub fn read(&self) -> anyhow::Result<Vec<u8>> {
        let data = match self {
            Input::Stdin => {
                let mut data = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut data)
                    .context("Failed to read stdin")?;
                data
            }
            Input::File(path) => std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        };
        debug!(bytes = data.len(), source = ?self, "Read input");
        Ok(data)
    }

    pub fn read_text(&self) -> anyhow::Result<String> {
        String::from_utf8(self.read()?).context("Input is not valid UTF-8")
    }
}

impl FromStr for Input {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "-" => Input::Stdin,
            path => Input::File(PathBuf::from(path)),
        })
    }
}

/// A file path, or stdout when not given
#[derive(Debug, Clone, Default)]
pub enum Output {
    #[default]
    Stdout,
    File(PathBuf),
}

impl Output {
    pub fn write(&self, data: &[u8]) -> anyhow::Result<()> {
        match self {
            Output::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(data)?;
                stdout.flush()?;
            }
            Output::File(path) => std::fs::write(path, data)
                .with_context(|| format!("Failed to write {}", path.display()))?,
        }
        debug!(bytes = data.len(), destination = ?self, "Wrote output");
        Ok(())
    }

    /// Write text, ending it with a newline on a terminal
    pub fn write_text(&self, text: &str) -> anyhow::Result<()> {
        match self {
            Output::Stdout => self.write(format!("{text}\n").as_bytes()),
            Output::File(_) => self.write(text.as_bytes()),
        }
    }
}

impl FromStr for Output {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "" | "-" => Output::Stdout,
            path => Output::File(PathBuf::from(path)),
        })
    }
}
