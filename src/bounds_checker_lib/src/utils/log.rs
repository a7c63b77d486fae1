//! Structs and functions for generating log messages and diagnostic notes.

use crate::prelude::*;

/// Configuration of the diagnostic output of an analysis run.
///
/// All flags are read-only after initialization and are threaded through the
/// operations that emit diagnostics as part of a [`Diagnostics`] collector;
/// none of them changes analysis results.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(default)]
pub struct Config {
    /// Include the relational constraint store when rendering abstract
    /// memories. The store itself is always computed.
    pub relational_domain_enabled: bool,
    /// At level 1 and above, debug renderings include provenance traces and
    /// update decisions are logged.
    pub debug_level: u64,
    /// Emit notes destined for the per-procedure HTML debug output.
    pub write_html: bool,
}

impl Config {
    /// Parse the configuration from a JSON value.
    pub fn from_json(json: &serde_json::Value) -> Result<Config, Error> {
        serde_json::from_value(json.clone())
            .map_err(|err| anyhow!("Could not parse analysis config: {err}"))
    }
}

/// A generic log message.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct LogMessage {
    /// The log message.
    pub text: String,
    /// The severity/type of the log message.
    pub level: LogLevel,
    /// The program point that the message is related to.
    pub location: Option<Tid>,
    /// The analysis where the message originated.
    pub source: Option<String>,
}

impl LogMessage {
    /// Create a new `Info`-level log message.
    pub fn new_info(text: impl Into<String>) -> LogMessage {
        LogMessage {
            text: text.into(),
            level: LogLevel::Info,
            location: None,
            source: None,
        }
    }

    /// Create a new `Debug`-level log message.
    pub fn new_debug(text: impl Into<String>) -> LogMessage {
        LogMessage {
            text: text.into(),
            level: LogLevel::Debug,
            location: None,
            source: None,
        }
    }

    /// Create a new `Error`-level log message.
    pub fn new_error(text: impl Into<String>) -> LogMessage {
        LogMessage {
            text: text.into(),
            level: LogLevel::Error,
            location: None,
            source: None,
        }
    }

    /// Associate a specific program point to the log message.
    pub fn location(mut self, location: Tid) -> LogMessage {
        self.location = Some(location);
        self
    }

    /// Set the name of the source analysis for the log message.
    pub fn source(mut self, source: impl Into<String>) -> LogMessage {
        self.source = Some(source.into());
        self
    }
}

impl std::fmt::Display for LogMessage {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            LogLevel::Debug => write!(formatter, "DEBUG: ")?,
            LogLevel::Error => write!(formatter, "ERROR: ")?,
            LogLevel::Info => write!(formatter, "INFO: ")?,
        }
        if let (Some(source), Some(location)) = (&self.source, &self.location) {
            write!(formatter, "{source} @ {location}: ")?;
        } else if let Some(source) = &self.source {
            write!(formatter, "{source}: ")?;
        } else if let Some(location) = &self.location {
            write!(formatter, "{location}: ")?;
        }
        write!(formatter, "{}", self.text)
    }
}

/// The severity/type of a log message.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum LogLevel {
    /// Messages intended for debugging.
    Debug,
    /// Errors encountered during the analysis.
    Error,
    /// Non-error messages intended for the user.
    Info,
}

/// Collects the diagnostic-only notes of a single analysis run.
///
/// The collector owns the [`Config`] so that domain operations do not read
/// process-global state. Notes gated off by the configuration are dropped at
/// the collection point; collecting a note never changes analysis results.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    config: Config,
    messages: Vec<LogMessage>,
}

impl Diagnostics {
    /// Create a new collector with the given configuration.
    pub fn new(config: Config) -> Diagnostics {
        Diagnostics {
            config,
            messages: Vec::new(),
        }
    }

    /// Get the configuration of the collector.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Record a note destined for the per-procedure HTML debug output.
    /// The message is only rendered (and only collected) if HTML output is enabled.
    pub fn html_note(&mut self, text: impl FnOnce() -> String) {
        if self.config.write_html {
            self.messages.push(LogMessage::new_debug(text()));
        }
    }

    /// Record a note shown at debug level 1 and above.
    pub fn debug_note(&mut self, text: impl FnOnce() -> String) {
        if self.config.debug_level >= 1 {
            self.messages.push(LogMessage::new_debug(text()));
        }
    }

    /// Get the messages collected so far.
    pub fn messages(&self) -> &[LogMessage] {
        &self.messages
    }

    /// Drain the messages collected so far.
    pub fn take_messages(&mut self) -> Vec<LogMessage> {
        std::mem::take(&mut self.messages)
    }
}
