// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain records for camera inspection projects.
//
// Ownership runs Project → TestPackage → PdfLine → Remark. The hydrated
// `FullPackage` tree is the only input the report pipeline accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric primary key assigned by the record store.
pub type RecordId = i64;

/// An inspection project, identified externally by its project number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: RecordId,
    pub project_number: String,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
}

/// A named collection of inspected pipe sections under one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPackage {
    pub id: RecordId,
    pub project_id: RecordId,
    pub name: String,
    /// Free-text comment. Empty when the user left it blank.
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub pipe_type: Option<String>,
    #[serde(default)]
    pub lining: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TestPackage {
    /// Pipe type, treating a blank string as absent.
    pub fn pipe_type(&self) -> Option<&str> {
        non_blank(self.pipe_type.as_deref())
    }

    /// Lining classification, treating a blank string as absent.
    pub fn lining(&self) -> Option<&str> {
        non_blank(self.lining.as_deref())
    }
}

/// One inspected pipe section, optionally carrying an ISO drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfLine {
    pub id: RecordId,
    pub test_package_id: RecordId,
    pub name: String,
    /// Stored `/uploads/pdfs/...` reference to the attached drawing.
    #[serde(default)]
    pub pdf_path: Option<String>,
    /// Display ordering key. Not guaranteed unique within a package.
    pub line_number: i64,
    pub created_at: DateTime<Utc>,
}

impl PdfLine {
    /// Drawing reference, treating a blank string as absent.
    pub fn drawing(&self) -> Option<&str> {
        non_blank(self.pdf_path.as_deref())
    }
}

/// A photo evidence entry attached to a pipe section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remark {
    pub id: RecordId,
    pub pdf_line_id: RecordId,
    /// Stored `/uploads/remarks/...` reference. Empty for file-less imports.
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Hydrated tree
// ---------------------------------------------------------------------------

/// A pipe section together with its remarks, ordered by creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullLine {
    #[serde(flatten)]
    pub line: PdfLine,
    #[serde(default)]
    pub remarks: Vec<Remark>,
}

impl FullLine {
    pub fn remark_count(&self) -> usize {
        self.remarks.len()
    }
}

/// A fully hydrated package: the package row, its owning project and every
/// line (ordered by line number) with its remarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullPackage {
    #[serde(flatten)]
    pub package: TestPackage,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(rename = "pdfLines", default)]
    pub lines: Vec<FullLine>,
}

impl FullPackage {
    /// Total number of remarks across every line.
    pub fn total_remarks(&self) -> usize {
        self.lines.iter().map(FullLine::remark_count).sum()
    }

    /// Whether at least one line carries at least one remark.
    pub fn has_remarks(&self) -> bool {
        self.lines.iter().any(|line| !line.remarks.is_empty())
    }

    /// Whether at least one line references a drawing.
    pub fn has_drawings(&self) -> bool {
        self.lines.iter().any(|line| line.line.drawing().is_some())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Input payloads
// ---------------------------------------------------------------------------

/// Fields for creating or fully updating a test package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageFields {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub pipe_type: Option<String>,
    #[serde(default)]
    pub lining: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: RecordId, remarks: usize) -> FullLine {
        let now = Utc::now();
        FullLine {
            line: PdfLine {
                id,
                test_package_id: 1,
                name: format!("L{id}"),
                pdf_path: None,
                line_number: id,
                created_at: now,
            },
            remarks: (0..remarks)
                .map(|i| Remark {
                    id: i as RecordId,
                    pdf_line_id: id,
                    image_path: String::new(),
                    comment: String::new(),
                    created_at: now,
                })
                .collect(),
        }
    }

    fn package(lines: Vec<FullLine>) -> FullPackage {
        FullPackage {
            package: TestPackage {
                id: 1,
                project_id: 1,
                name: "P".into(),
                comment: String::new(),
                pipe_type: Some("  ".into()),
                lining: Some("Epoxy".into()),
                created_at: Utc::now(),
            },
            project: None,
            lines,
        }
    }

    #[test]
    fn totals_sum_over_lines() {
        let pkg = package(vec![line(1, 2), line(2, 0), line(3, 3)]);
        assert_eq!(pkg.total_remarks(), 5);
        assert!(pkg.has_remarks());
        assert!(!pkg.has_drawings());
    }

    #[test]
    fn no_remarks_when_every_line_is_empty() {
        let pkg = package(vec![line(1, 0)]);
        assert!(!pkg.has_remarks());
    }

    #[test]
    fn blank_classifications_are_absent() {
        let pkg = package(Vec::new());
        assert_eq!(pkg.package.pipe_type(), None);
        assert_eq!(pkg.package.lining(), Some("Epoxy"));
    }

    #[test]
    fn hydrated_tree_uses_pdf_lines_key() {
        let pkg = package(vec![line(7, 1)]);
        let json = serde_json::to_value(&pkg).expect("serialize");
        assert_eq!(json["name"], "P");
        assert_eq!(json["pdfLines"][0]["line_number"], 7);
        assert_eq!(json["pdfLines"][0]["remarks"].as_array().map(Vec::len), Some(1));

        let back: FullPackage = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, pkg);
    }
}
