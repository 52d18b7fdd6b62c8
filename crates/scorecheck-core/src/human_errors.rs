// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator-facing hints for preparation failures.
//
// The envelope carries the technical message for the calling process; these
// hints go to stderr for whoever is running the shim by hand.

use crate::error::ScorecheckError;

/// A plain-language error with an actionable suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What to try next.
    pub suggestion: String,
}

/// Convert a `ScorecheckError` into a `HumanError`.
pub fn humanize_error(err: &ScorecheckError) -> HumanError {
    match err {
        ScorecheckError::Decode(_) => HumanError {
            message: "The input is not a readable image.".into(),
            suggestion: "Check that the capture is a complete JPEG or PNG file and was not truncated during upload.".into(),
        },

        ScorecheckError::OutOfBounds { rect, width, height } => HumanError {
            message: "The crop region does not fit inside this screenshot.".into(),
            suggestion: format!(
                "The image is {width}x{height} but the region ends at ({}, {}). Use a preset matching the capture resolution.",
                rect.left as u64 + rect.width as u64,
                rect.top as u64 + rect.height as u64,
            ),
        },

        ScorecheckError::UnknownOperation(name) => HumanError {
            message: format!("'{name}' is not a known operation."),
            suggestion: format!(
                "Choose one of: {}.",
                crate::types::Operation::ALL
                    .iter()
                    .map(|op| op.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        },

        ScorecheckError::InvalidParameter(detail) => HumanError {
            message: "One of the options is malformed.".into(),
            suggestion: format!("Fix the option and run again. ({detail})"),
        },

        ScorecheckError::Encode(_) => HumanError {
            message: "The processed image could not be encoded.".into(),
            suggestion: "This usually means the image is empty after cropping. Check the crop region.".into(),
        },

        ScorecheckError::InputRead { path, source } => {
            if source.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The input file could not be found.".into(),
                    suggestion: format!("Check the path {}.", path.display()),
                }
            } else {
                HumanError {
                    message: "The input file could not be read.".into(),
                    suggestion: format!("Check the permissions on {}.", path.display()),
                }
            }
        }

        ScorecheckError::OutputWrite { path, .. } => HumanError {
            message: "The result could not be saved.".into(),
            suggestion: format!(
                "Make sure the folder for {} exists and is writable.",
                path.display()
            ),
        },

        ScorecheckError::ConfigRead { path, .. } => HumanError {
            message: "The configuration file could not be read.".into(),
            suggestion: format!(
                "Check that {} exists, or drop --config to use the defaults.",
                path.display()
            ),
        },

        ScorecheckError::Config(_) | ScorecheckError::Serialization(_) => HumanError {
            message: "The configuration file is invalid.".into(),
            suggestion: "Compare it against the defaults printed by --print-config.".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CropRect;
    use std::path::PathBuf;

    #[test]
    fn out_of_bounds_names_the_far_corner() {
        let err = ScorecheckError::OutOfBounds {
            rect: CropRect::new(1214, 430, 2267, 1209),
            width: 1920,
            height: 1080,
        };
        let human = humanize_error(&err);
        assert!(
            human.suggestion.contains("(3481, 1639)"),
            "{}",
            human.suggestion
        );
        assert!(human.suggestion.contains("1920x1080"));
    }

    #[test]
    fn unknown_operation_lists_choices() {
        let human = humanize_error(&ScorecheckError::UnknownOperation("blur".into()));
        assert!(human.suggestion.contains("preprocess_binary_ocr"));
        assert!(human.message.contains("blur"));
    }

    #[test]
    fn missing_input_points_at_path() {
        let err = ScorecheckError::InputRead {
            path: PathBuf::from("uploads/boxscore.jpeg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let human = humanize_error(&err);
        assert_eq!(human.message, "The input file could not be found.");
        assert!(human.suggestion.contains("uploads/boxscore.jpeg"));
    }

    #[test]
    fn unreadable_config_points_at_path() {
        let err = ScorecheckError::ConfigRead {
            path: PathBuf::from("prep.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let human = humanize_error(&err);
        assert!(human.message.contains("configuration"));
        assert!(human.suggestion.contains("prep.json"));
    }
}
