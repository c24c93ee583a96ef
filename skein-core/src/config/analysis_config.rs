//! Predicate flags and engine knobs.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Which predicates the engine runs, plus behavioral knobs.
///
/// Every field defaults to the `standard()` preset when deserialized from
/// a partial document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // ---- Predicates ----
    pub send_on_closed: bool,
    pub receive_on_closed: bool,
    pub close_on_closed: bool,
    pub concurrent_recv: bool,
    pub select_without_partner: bool,
    pub leak: bool,
    pub done_before_add: bool,
    pub cyclic_deadlock: bool,
    pub resource_deadlock: bool,
    pub unlock_before_lock: bool,
    pub mixed_deadlock: bool,

    // ---- Knobs ----
    /// Assume FIFO delivery on buffered channels (adds the extra
    /// most-recent-send/recv sync edges).
    pub assume_fifo: bool,
    /// Do not draw happens-before edges from mutex critical sections
    /// (the must-happen-before underapproximation for the strong clock too).
    pub ignore_critical_sections: bool,
    /// Record fuzzing flow candidates alongside results.
    pub fuzzing: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl AnalysisConfig {
    /// Every predicate enabled, knobs off.
    pub fn full() -> Self {
        Self {
            send_on_closed: true,
            receive_on_closed: true,
            close_on_closed: true,
            concurrent_recv: true,
            select_without_partner: true,
            leak: true,
            done_before_add: true,
            cyclic_deadlock: true,
            resource_deadlock: true,
            unlock_before_lock: true,
            mixed_deadlock: true,
            assume_fifo: false,
            ignore_critical_sections: false,
            fuzzing: false,
        }
    }

    /// The default predicate set: everything except the mixed-deadlock
    /// refinement.
    pub fn standard() -> Self {
        Self {
            mixed_deadlock: false,
            ..Self::full()
        }
    }

    /// Only the panic-class predicates (closed-channel family, negative
    /// wait-group). Useful for quick scans of very large traces.
    pub fn minimal() -> Self {
        Self {
            send_on_closed: true,
            receive_on_closed: true,
            close_on_closed: true,
            concurrent_recv: false,
            select_without_partner: false,
            leak: false,
            done_before_add: true,
            cyclic_deadlock: false,
            resource_deadlock: false,
            unlock_before_lock: false,
            mixed_deadlock: false,
            assume_fifo: false,
            ignore_critical_sections: false,
            fuzzing: false,
        }
    }

    /// Load from a TOML document. Missing fields fall back to `standard()`.
    pub fn from_toml_str(doc: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(doc)?)
    }

    /// Toggle one predicate by its configuration name, as passed by the
    /// (external) command line.
    pub fn set_predicate(&mut self, name: &str, enabled: bool) -> Result<(), ConfigError> {
        match name {
            "send_on_closed" => self.send_on_closed = enabled,
            "receive_on_closed" => self.receive_on_closed = enabled,
            "close_on_closed" => self.close_on_closed = enabled,
            "concurrent_recv" => self.concurrent_recv = enabled,
            "select_without_partner" => self.select_without_partner = enabled,
            "leak" => self.leak = enabled,
            "done_before_add" => self.done_before_add = enabled,
            "cyclic_deadlock" => self.cyclic_deadlock = enabled,
            "resource_deadlock" => self.resource_deadlock = enabled,
            "unlock_before_lock" => self.unlock_before_lock = enabled,
            "mixed_deadlock" => self.mixed_deadlock = enabled,
            _ => {
                return Err(ConfigError::UnknownPredicate {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }
}
