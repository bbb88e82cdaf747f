//! Device selection: explicit index, automatic single-device choice, or an
//! interactive prompt.
//!
//! Operator interaction goes through a [`Prompt`], so the blocking terminal
//! loop can be replaced with a scripted sequence of answers.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::debug;

use crate::gpu::device::Device;

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("GPU index {0} not found")]
    DeviceNotFound(u32),

    #[error("no GPUs to select from")]
    NoDevices,

    #[error("input closed before a GPU was selected")]
    InputClosed,

    #[error("prompt I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Operator-facing text channel.
pub trait Prompt {
    /// Show a line to the operator.
    fn say(&mut self, line: &str);

    /// Ask a question and read one answer. `Ok(None)` means end of input.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>>;
}

/// Prompt on the process's stdin/stdout.
#[derive(Debug, Default)]
pub struct StdioPrompt;

impl Prompt for StdioPrompt {
    fn say(&mut self, line: &str) {
        println!("{line}");
    }

    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{question}")?;
        stdout.flush()?;

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer)? {
            0 => Ok(None),
            _ => Ok(Some(answer)),
        }
    }
}

/// Prompt fed from a fixed list of answers; records everything shown.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,

    /// Lines passed to [`Prompt::say`].
    pub shown: Vec<String>,

    /// Number of questions asked.
    pub asked: usize,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            shown: Vec::new(),
            asked: 0,
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn say(&mut self, line: &str) {
        self.shown.push(line.to_string());
    }

    fn ask(&mut self, _question: &str) -> io::Result<Option<String>> {
        self.asked += 1;
        Ok(self.answers.pop_front())
    }
}

/// Resolve the device to use.
///
/// An explicit index must match a probed device. Otherwise a single device is
/// picked automatically, and with several the operator is asked until a valid
/// index is given.
pub fn select_device(
    devices: &[Device],
    explicit: Option<u32>,
    prompt: &mut dyn Prompt,
) -> Result<Device, SelectionError> {
    if devices.is_empty() {
        return Err(SelectionError::NoDevices);
    }

    if let Some(index) = explicit {
        return find(devices, index)
            .cloned()
            .ok_or(SelectionError::DeviceNotFound(index));
    }

    prompt.say("Detected NVIDIA GPU(s):");
    for device in devices {
        prompt.say(&format!("  {device}"));
    }
    prompt.say("");

    if let [only] = devices {
        prompt.say(&format!("Auto-selecting: {}", only.name));
        return Ok(only.clone());
    }

    loop {
        let answer = prompt
            .ask("Select GPU index to use: ")?
            .ok_or(SelectionError::InputClosed)?;

        match answer.trim().parse::<i64>() {
            Ok(index) => match u32::try_from(index).ok().and_then(|i| find(devices, i)) {
                Some(device) => return Ok(device.clone()),
                None => prompt.say("Invalid index."),
            },
            Err(_) => {
                debug!(answer = answer.trim(), "Non-numeric GPU selection");
                prompt.say("Please enter a number.");
            }
        }
    }
}

fn find(devices: &[Device], index: u32) -> Option<&Device> {
    devices.iter().find(|d| d.index == index)
}
