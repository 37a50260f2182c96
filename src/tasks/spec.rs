//! # Task descriptor: the immutable, normalized shape of one shell task.
//!
//! A [`TaskSpec`] can be created:
//! - **Explicitly** with [`TaskSpec::new`] plus `with_*` builders
//! - **From raw config** with [`TaskSpec::from_config`] (defaulting,
//!   type checks, unknown-key detection)
//!
//! ## Rules
//! - `command` is required and non-empty.
//! - `stop-stage` defaults to `post-process`; `block` and `stop-on-fail`
//!   default to `false`.
//! - A blocking task may not start at the `startup` stage.
//! - Unknown raw keys are never an error; the scheduler reports them as
//!   [`EventKind::OptionIgnored`](crate::EventKind::OptionIgnored) warnings.

use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::stage::Stage;

/// Raw config keys a task descriptor understands.
///
/// `start-stage` is accepted but ignored here: the scheduler supplies the
/// start stage when building the task, not the user.
pub const KNOWN_KEYS: [&str; 8] = [
    "start-stage",
    "stop-stage",
    "block",
    "stop-on-fail",
    "label",
    "command",
    "out",
    "err",
];

/// Immutable descriptor of one shell task bound to lifecycle stages.
///
/// ## Example
/// ```rust
/// use stagexec::{Stage, TaskSpec};
///
/// let spec = TaskSpec::new("tar czf backup.tgz data/", Stage::Prepare)
///     .with_stop(Stage::Prepare)
///     .with_block(true)
///     .with_label("backup");
///
/// assert!(spec.validate().is_ok());
/// assert_eq!(spec.stop(), Stage::Prepare);
/// ```
#[derive(Debug, Clone)]
pub struct TaskSpec {
    command: String,
    start: Stage,
    stop: Stage,
    block: bool,
    stop_on_fail: bool,
    label: Option<String>,
    out: Option<String>,
    err: Option<String>,
}

impl TaskSpec {
    /// Creates a descriptor with defaults: stop at `post-process`,
    /// non-blocking, failures ignored, no label, generated sink names.
    pub fn new(command: impl Into<String>, start: Stage) -> Self {
        Self {
            command: command.into(),
            start,
            stop: Stage::DEFAULT_STOP,
            block: false,
            stop_on_fail: false,
            label: None,
            out: None,
            err: None,
        }
    }

    /// Builds a descriptor from a raw config map.
    ///
    /// Applies defaults, checks field types, and validates the result. The
    /// start stage is stamped by the caller (the scheduler), matching how
    /// tasks are declared per-stage in host config. Unknown keys are left for
    /// the caller to report; see [`TaskSpec::unknown_keys`].
    pub fn from_config(start: Stage, raw: &Map<String, Value>) -> Result<Self, ConfigError> {
        let command = match raw.get("command") {
            None | Some(Value::Null) => return Err(ConfigError::MissingCommand),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(ConfigError::NotAString { key: "command" }),
        };

        let stop = match raw.get("stop-stage") {
            None | Some(Value::Null) => Stage::DEFAULT_STOP,
            Some(Value::String(s)) => s.parse()?,
            Some(_) => return Err(ConfigError::NotAString { key: "stop-stage" }),
        };

        let spec = Self {
            command,
            start,
            stop,
            block: bool_field(raw, "block")?,
            stop_on_fail: bool_field(raw, "stop-on-fail")?,
            label: string_field(raw, "label")?,
            out: string_field(raw, "out")?,
            err: string_field(raw, "err")?,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Returns the raw keys that no task descriptor understands.
    ///
    /// These are ignored with a warning, never an error.
    pub fn unknown_keys(raw: &Map<String, Value>) -> Vec<&str> {
        raw.keys()
            .map(String::as_str)
            .filter(|key| !KNOWN_KEYS.contains(key))
            .collect()
    }

    /// Checks the invariants a well-formed descriptor must hold.
    ///
    /// Called by [`from_config`](Self::from_config) and again when the spec
    /// is added to the scheduler, so builder-constructed specs are covered
    /// too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.is_empty() {
            return Err(ConfigError::MissingCommand);
        }
        if self.block && !self.start.allows_blocking() {
            return Err(ConfigError::BlockingOnStartup);
        }
        Ok(())
    }

    /// Returns a new spec with an updated stop stage.
    pub fn with_stop(mut self, stop: Stage) -> Self {
        self.stop = stop;
        self
    }

    /// Returns a new spec with the blocking flag set.
    pub fn with_block(mut self, block: bool) -> Self {
        self.block = block;
        self
    }

    /// Returns a new spec with the stop-on-fail flag set.
    pub fn with_stop_on_fail(mut self, stop_on_fail: bool) -> Self {
        self.stop_on_fail = stop_on_fail;
        self
    }

    /// Returns a new spec with a label (used as the sink filename prefix).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns a new spec with an explicit stdout sink path.
    pub fn with_out(mut self, out: impl Into<String>) -> Self {
        self.out = Some(out.into());
        self
    }

    /// Returns a new spec with an explicit stderr sink path.
    pub fn with_err(mut self, err: impl Into<String>) -> Self {
        self.err = Some(err.into());
        self
    }

    /// The shell command line.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Stage at which the task is launched.
    pub fn start(&self) -> Stage {
        self.start
    }

    /// Stage at which the task is terminated and removed.
    pub fn stop(&self) -> Stage {
        self.stop
    }

    /// Whether the start stage must wait for this task to finish.
    pub fn block(&self) -> bool {
        self.block
    }

    /// Whether a non-zero exit escalates to a run-wide abort.
    pub fn stop_on_fail(&self) -> bool {
        self.stop_on_fail
    }

    /// Optional label; doubles as the sink filename prefix.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Explicit stdout sink path, if configured.
    pub fn out(&self) -> Option<&str> {
        self.out.as_deref()
    }

    /// Explicit stderr sink path, if configured.
    pub fn err(&self) -> Option<&str> {
        self.err.as_deref()
    }
}

fn bool_field(raw: &Map<String, Value>, key: &'static str) -> Result<bool, ConfigError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(ConfigError::NotABoolean {
            key,
            value: other.to_string(),
        }),
    }
}

fn string_field(raw: &Map<String, Value>, key: &'static str) -> Result<Option<String>, ConfigError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ConfigError::NotAString { key }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().expect("test config must be a map").clone()
    }

    #[test]
    fn test_defaults_applied() {
        let spec = TaskSpec::from_config(Stage::Prepare, &raw(json!({"command": "echo hi"})))
            .expect("minimal config is valid");
        assert_eq!(spec.command(), "echo hi");
        assert_eq!(spec.start(), Stage::Prepare);
        assert_eq!(spec.stop(), Stage::PostProcess);
        assert!(!spec.block());
        assert!(!spec.stop_on_fail());
        assert!(spec.label().is_none());
    }

    #[test]
    fn test_missing_command_rejected() {
        let err = TaskSpec::from_config(Stage::Prepare, &raw(json!({}))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCommand));

        let err =
            TaskSpec::from_config(Stage::Prepare, &raw(json!({"command": null}))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCommand));
    }

    #[test]
    fn test_empty_command_rejected() {
        let err = TaskSpec::from_config(Stage::Prepare, &raw(json!({"command": ""}))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCommand));
    }

    #[test]
    fn test_bad_stop_stage_rejected() {
        let cfg = raw(json!({"command": "true", "stop-stage": "cleanup"}));
        let err = TaskSpec::from_config(Stage::Prepare, &cfg).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownStage { stage } if stage == "cleanup"));
    }

    #[test]
    fn test_non_boolean_flags_rejected() {
        let cfg = raw(json!({"command": "true", "block": "yes"}));
        let err = TaskSpec::from_config(Stage::Prepare, &cfg).unwrap_err();
        assert!(matches!(err, ConfigError::NotABoolean { key: "block", .. }));

        let cfg = raw(json!({"command": "true", "stop-on-fail": 1}));
        let err = TaskSpec::from_config(Stage::Prepare, &cfg).unwrap_err();
        assert!(matches!(err, ConfigError::NotABoolean { key: "stop-on-fail", .. }));
    }

    #[test]
    fn test_blocking_on_startup_rejected() {
        let cfg = raw(json!({"command": "true", "block": true}));
        let err = TaskSpec::from_config(Stage::Startup, &cfg).unwrap_err();
        assert!(matches!(err, ConfigError::BlockingOnStartup));

        // Builder path hits the same invariant through validate().
        let spec = TaskSpec::new("true", Stage::Startup).with_block(true);
        assert!(matches!(
            spec.validate().unwrap_err(),
            ConfigError::BlockingOnStartup
        ));
    }

    #[test]
    fn test_blocking_allowed_elsewhere() {
        let cfg = raw(json!({"command": "true", "block": true}));
        for stage in [Stage::Prepare, Stage::Check, Stage::PostProcess, Stage::Shutdown] {
            assert!(TaskSpec::from_config(stage, &cfg).is_ok());
        }
    }

    #[test]
    fn test_optional_fields_picked_up() {
        let cfg = raw(json!({
            "command": "make check",
            "stop-stage": "shutdown",
            "block": true,
            "stop-on-fail": true,
            "label": "checker",
            "out": "checker.log",
            "err": "checker-errors.log",
        }));
        let spec = TaskSpec::from_config(Stage::Check, &cfg).unwrap();
        assert_eq!(spec.stop(), Stage::Shutdown);
        assert!(spec.block());
        assert!(spec.stop_on_fail());
        assert_eq!(spec.label(), Some("checker"));
        assert_eq!(spec.out(), Some("checker.log"));
        assert_eq!(spec.err(), Some("checker-errors.log"));
    }

    #[test]
    fn test_unknown_keys_reported_not_rejected() {
        let cfg = raw(json!({"command": "true", "cmd": "legacy", "retries": 3}));
        let mut unknown = TaskSpec::unknown_keys(&cfg);
        unknown.sort_unstable();
        assert_eq!(unknown, vec!["cmd", "retries"]);
        assert!(TaskSpec::from_config(Stage::Prepare, &cfg).is_ok());
    }

    #[test]
    fn test_start_stage_key_is_known() {
        // The scheduler stamps start-stage into raw maps; it must not be
        // reported as unknown.
        let cfg = raw(json!({"command": "true", "start-stage": "prepare"}));
        assert!(TaskSpec::unknown_keys(&cfg).is_empty());
    }
}
