// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the people making handouts.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how a front end presents it; `retriable` tells the caller
// whether trying again (possibly at a lower quality) is worthwhile.

use crate::error::NotesForgeError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth another attempt, usually with lighter settings.
    Transient,
    /// The user must change something (settings, files, mask).
    ActionRequired,
    /// Retrying will not help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether the caller may reasonably retry.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `NotesForgeError` into a `HumanError`.
pub fn humanize_error(err: &NotesForgeError) -> HumanError {
    match err {
        NotesForgeError::InvalidInput(detail) => {
            if detail.contains("mask") {
                HumanError {
                    message: "The person-removal mask doesn't fit this page.".into(),
                    suggestion: "Run person detection again on the page as it is now, then retry.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if detail.contains("margin") || detail.contains("padding") || detail.contains("grid") {
                HumanError {
                    message: "These layout settings don't fit on the page.".into(),
                    suggestion: format!("Reduce the margin or padding, or use fewer rows and columns. ({detail})"),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if detail.contains("no pages") {
                HumanError {
                    message: "There's nothing to put in the document.".into(),
                    suggestion: "Select at least one page or image, then try again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "One of the pages couldn't be read.".into(),
                    suggestion: format!("Try removing the page and adding it again. ({detail})"),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            }
        }

        NotesForgeError::Config(detail) => HumanError {
            message: "A cleanup setting is out of range.".into(),
            suggestion: format!("Reset the advanced settings to their defaults. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        NotesForgeError::Encoding { page_index, .. } => HumanError {
            message: format!("Page {} couldn't be added to the document.", page_index + 1),
            suggestion: "Try again with a lower quality setting, or remove that page.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        NotesForgeError::Composition(_) => HumanError {
            message: "The PDF couldn't be created.".into(),
            suggestion: "Try again with a lower quality setting or fewer pages.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        NotesForgeError::Segmentation(_) => HumanError {
            message: "Person detection didn't work on this page.".into(),
            suggestion: "Turn off person removal for this page, or try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        NotesForgeError::Serialization(_) => HumanError {
            message: "The saved settings couldn't be read.".into(),
            suggestion: "The settings file may be damaged. Reset to defaults and try again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_failure_is_transient_and_names_page() {
        let err = NotesForgeError::Encoding {
            page_index: 2,
            reason: "codec rejected buffer".into(),
        };
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
        assert!(human.message.contains("Page 3"));
    }

    #[test]
    fn layout_problem_is_action_required() {
        let err = NotesForgeError::InvalidInput("margin 400pt leaves no room".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn mask_mismatch_gets_its_own_message() {
        let err = NotesForgeError::InvalidInput("mask 10x10 does not match page 0 (20x20)".into());
        assert!(humanize_error(&err).message.contains("mask"));
    }

    #[test]
    fn broken_settings_file_is_permanent() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let human = humanize_error(&NotesForgeError::from(json_err));
        assert_eq!(human.severity, Severity::Permanent);
    }
}
