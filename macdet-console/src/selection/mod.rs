//! Cascading testbed/subtype selection
//!
//! Selection is a two-level state machine over the catalog:
//!
//! ```text
//! (none) --select_testbed--> testbed chosen --select_subtype--> ready
//!              |                                                  ^
//!              +------------- exactly one subtype ----------------+
//! ```
//!
//! Every transition that lands on a concrete subtype yields a [`SampleTarget`],
//! which is the controller's readiness signal. The controller never fetches
//! anything itself.

use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Which catalog level a lookup failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Testbed,
    Subtype,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Testbed => write!(f, "testbed"),
            EntryKind::Subtype => write!(f, "subtype"),
        }
    }
}

/// Errors from selection transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Unknown {kind}: {name}")]
    NotFound { kind: EntryKind, name: String },

    #[error("No subtypes available for testbed {0}")]
    NoSubtypes(String),
}

impl SelectionError {
    fn testbed(name: &str) -> Self {
        Self::NotFound {
            kind: EntryKind::Testbed,
            name: name.to_string(),
        }
    }

    fn subtype(name: &str) -> Self {
        Self::NotFound {
            kind: EntryKind::Subtype,
            name: name.to_string(),
        }
    }
}

/// Where the text for an inference run comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Manual,
    Sampled,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::Manual => write!(f, "manual"),
            InputMode::Sampled => write!(f, "sampled"),
        }
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(InputMode::Manual),
            "sampled" | "sampling" => Ok(InputMode::Sampled),
            other => Err(format!("unknown input mode: {}", other)),
        }
    }
}

/// Current selection. `subtype` is only ever set together with `testbed`,
/// and both always name an existing catalog pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub mode: InputMode,
    pub testbed: Option<String>,
    pub subtype: Option<String>,
}

/// A fully resolved selection, ready to be sampled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTarget {
    pub testbed: String,
    pub subtype: String,
    pub file_path: String,
}

/// Result of choosing a testbed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestbedChoice {
    /// Subtype names offered for the testbed, in catalog order
    pub subtypes: Vec<String>,

    /// Set when the testbed had a single subtype and it was auto-selected
    pub ready: Option<SampleTarget>,
}

/// Tracks input mode and the cascading testbed/subtype choice
pub struct SelectionController {
    catalog: Arc<Catalog>,
    selection: Selection,
    choices: Vec<String>,
}

impl SelectionController {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            selection: Selection::default(),
            choices: Vec::new(),
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn mode(&self) -> InputMode {
        self.selection.mode
    }

    /// Subtype choices for the selected testbed
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Switch input mode. The testbed/subtype choice is kept.
    pub fn set_mode(&mut self, mode: InputMode) {
        if self.selection.mode != mode {
            info!(from = %self.selection.mode, to = %mode, "Input mode changed");
        }
        self.selection = Selection {
            mode,
            ..self.selection.clone()
        };
    }

    /// Choose a testbed. On any error the previous selection is left intact.
    pub fn select_testbed(&mut self, name: &str) -> Result<TestbedChoice, SelectionError> {
        let testbed = self
            .catalog
            .get(name)
            .ok_or_else(|| SelectionError::testbed(name))?;

        if testbed.subtypes.is_empty() {
            return Err(SelectionError::NoSubtypes(name.to_string()));
        }

        let subtypes = testbed.subtype_names();
        let ready = match testbed.subtypes.as_slice() {
            [only] => {
                info!(testbed = name, subtype = %only.subtype, "Single subtype, auto-selecting");
                Some(SampleTarget {
                    testbed: testbed.name.clone(),
                    subtype: only.subtype.clone(),
                    file_path: only.file_path.clone(),
                })
            }
            _ => None,
        };

        self.selection = Selection {
            mode: self.selection.mode,
            testbed: Some(testbed.name.clone()),
            subtype: ready.as_ref().map(|t| t.subtype.clone()),
        };
        self.choices = subtypes.clone();

        debug!(testbed = name, choices = subtypes.len(), "Testbed selected");
        Ok(TestbedChoice { subtypes, ready })
    }

    /// Choose a subtype of the currently selected testbed
    pub fn select_subtype(&mut self, name: &str) -> Result<SampleTarget, SelectionError> {
        let testbed_name = self
            .selection
            .testbed
            .clone()
            .ok_or_else(|| SelectionError::subtype(name))?;

        let subtype = self
            .catalog
            .resolve(&testbed_name, name)
            .ok_or_else(|| SelectionError::subtype(name))?;

        let target = SampleTarget {
            testbed: testbed_name.clone(),
            subtype: subtype.subtype.clone(),
            file_path: subtype.file_path.clone(),
        };

        self.selection = Selection {
            mode: self.selection.mode,
            testbed: Some(testbed_name),
            subtype: Some(target.subtype.clone()),
        };

        debug!(testbed = %target.testbed, subtype = %target.subtype, "Subtype selected");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Subtype, Testbed};

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::from_testbeds(vec![
            Testbed::new("T1", vec![Subtype::new("s1", "/x")]),
            Testbed::new(
                "T2",
                vec![Subtype::new("a", "t2/a.csv"), Subtype::new("b", "t2/b.csv")],
            ),
            Testbed::new("Empty", vec![]),
        ]))
    }

    #[test]
    fn test_single_subtype_auto_collapses() {
        let mut controller = SelectionController::new(catalog());
        let choice = controller.select_testbed("T1").unwrap();

        assert_eq!(choice.subtypes, vec!["s1".to_string()]);
        assert_eq!(
            choice.ready,
            Some(SampleTarget {
                testbed: "T1".to_string(),
                subtype: "s1".to_string(),
                file_path: "/x".to_string(),
            })
        );
        assert_eq!(controller.selection().subtype.as_deref(), Some("s1"));
    }

    #[test]
    fn test_multiple_subtypes_wait_for_choice() {
        let mut controller = SelectionController::new(catalog());
        let choice = controller.select_testbed("T2").unwrap();

        assert!(choice.ready.is_none());
        assert_eq!(controller.choices(), &["a".to_string(), "b".to_string()]);
        assert_eq!(controller.selection().testbed.as_deref(), Some("T2"));
        assert!(controller.selection().subtype.is_none());

        let target = controller.select_subtype("b").unwrap();
        assert_eq!(target.file_path, "t2/b.csv");
        assert_eq!(controller.selection().subtype.as_deref(), Some("b"));
    }

    #[test]
    fn test_zero_subtypes_is_an_error() {
        let mut controller = SelectionController::new(catalog());
        controller.select_testbed("T2").unwrap();

        assert_eq!(
            controller.select_testbed("Empty"),
            Err(SelectionError::NoSubtypes("Empty".to_string()))
        );
        // Previous selection survives the failed transition
        assert_eq!(controller.selection().testbed.as_deref(), Some("T2"));
    }

    #[test]
    fn test_unknown_testbed() {
        let mut controller = SelectionController::new(catalog());
        let err = controller.select_testbed("nope").unwrap_err();
        assert_eq!(
            err,
            SelectionError::NotFound {
                kind: EntryKind::Testbed,
                name: "nope".to_string()
            }
        );
        assert_eq!(controller.selection(), &Selection::default());
    }

    #[test]
    fn test_subtype_must_belong_to_selected_testbed() {
        let mut controller = SelectionController::new(catalog());

        // Nothing selected yet
        assert!(matches!(
            controller.select_subtype("a"),
            Err(SelectionError::NotFound { kind: EntryKind::Subtype, .. })
        ));

        controller.select_testbed("T2").unwrap();
        assert!(matches!(
            controller.select_subtype("s1"),
            Err(SelectionError::NotFound { kind: EntryKind::Subtype, .. })
        ));
    }

    #[test]
    fn test_reselecting_testbed_resets_subtype() {
        let mut controller = SelectionController::new(catalog());
        controller.select_testbed("T1").unwrap();
        controller.select_testbed("T2").unwrap();

        assert_eq!(controller.selection().testbed.as_deref(), Some("T2"));
        assert!(controller.selection().subtype.is_none());
    }

    #[test]
    fn test_mode_switch_keeps_choice() {
        let mut controller = SelectionController::new(catalog());
        controller.set_mode(InputMode::Sampled);
        controller.select_testbed("T1").unwrap();
        controller.set_mode(InputMode::Manual);

        assert_eq!(controller.mode(), InputMode::Manual);
        assert_eq!(controller.selection().subtype.as_deref(), Some("s1"));
    }

    #[test]
    fn test_input_mode_parsing() {
        assert_eq!("manual".parse::<InputMode>(), Ok(InputMode::Manual));
        assert_eq!("Sampled".parse::<InputMode>(), Ok(InputMode::Sampled));
        assert!("other".parse::<InputMode>().is_err());
    }
}
