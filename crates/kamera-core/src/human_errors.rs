// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for inspectors using the tool.
//
// Every technical error is mapped to plain Norwegian with a short suggestion.
// Report failures are deliberately generic: the detail goes to the log.

use crate::error::KameraError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user must correct the input (missing record, bad archive).
    ActionRequired,
    /// Cannot be fixed by retrying: damaged file, broken database.
    Permanent,
    /// Disk or filesystem hiccup; retrying may help.
    Transient,
}

/// A human-readable error with a message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as a heading).
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `KameraError` into a `HumanError`.
pub fn humanize_error(err: &KameraError) -> HumanError {
    match err {
        KameraError::NotFound { entity, id } => HumanError {
            message: format!("Fant ikke {} {id}.", norwegian_entity(entity)),
            suggestion: "Kontroller ID-en og prøv igjen.".into(),
            severity: Severity::ActionRequired,
        },

        KameraError::Validation(detail) => HumanError {
            message: "Ugyldig forespørsel.".into(),
            suggestion: detail.clone(),
            severity: Severity::ActionRequired,
        },

        KameraError::Database(_) => HumanError {
            message: "Databasen svarte ikke som forventet.".into(),
            suggestion: "Prøv igjen. Kontakt administrator hvis feilen vedvarer.".into(),
            severity: Severity::Permanent,
        },

        KameraError::PdfError(_) => HumanError {
            message: "Det er et problem med PDF-filen.".into(),
            suggestion: "Filen kan være skadet. Åpne den på en datamaskin for å kontrollere den, eller last opp en annen fil.".into(),
            severity: Severity::Permanent,
        },

        KameraError::ImageError(_) => HumanError {
            message: "Det er et problem med bildet.".into(),
            suggestion: "Lagre bildet som JPEG eller PNG og prøv igjen.".into(),
            severity: Severity::Permanent,
        },

        KameraError::Render(_) => HumanError {
            message: "Kunne ikke generere rapporten.".into(),
            suggestion: "Prøv igjen om litt.".into(),
            severity: Severity::Transient,
        },

        KameraError::Archive(_) => HumanError {
            message: "Arkivet kunne ikke behandles.".into(),
            suggestion: "Kontroller at filen er en gyldig eksport (ZIP med data.json).".into(),
            severity: Severity::ActionRequired,
        },

        KameraError::IntegrityMismatch { .. } => HumanError {
            message: "En vedlagt fil er endret siden eksporten.".into(),
            suggestion: "Eksporter prosjektet på nytt fra kilden.".into(),
            severity: Severity::Permanent,
        },

        KameraError::Io(_) => HumanError {
            message: "Kunne ikke lese eller skrive en fil.".into(),
            suggestion: "Kontroller ledig diskplass og tilgangsrettigheter.".into(),
            severity: Severity::Transient,
        },

        KameraError::Serialization(_) => HumanError {
            message: "Dataene har et ukjent format.".into(),
            suggestion: "Filen kan være fra en annen versjon av programmet.".into(),
            severity: Severity::Permanent,
        },
    }
}

fn norwegian_entity(entity: &str) -> &'static str {
    match entity {
        "project" => "prosjekt",
        "package" => "testpakke",
        "line" => "rørseksjon",
        "remark" => "merknad",
        _ => "posten",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_entity_in_norwegian() {
        let human = humanize_error(&KameraError::not_found("project", 42));
        assert_eq!(human.message, "Fant ikke prosjekt 42.");
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn render_failures_stay_generic() {
        let human = humanize_error(&KameraError::Render("stream closed at offset 812".into()));
        assert!(!human.message.contains("812"));
        assert!(!human.suggestion.contains("812"));
    }

    #[test]
    fn validation_detail_becomes_the_suggestion() {
        let human = humanize_error(&KameraError::Validation("Ingen pakker i prosjektet".into()));
        assert_eq!(human.suggestion, "Ingen pakker i prosjektet");
    }
}
