use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCategory {
    Name,
    Mesh,
    Hierarchy,
    Material,
    Animation,
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationItem {
    /// Stable code for the rule (e.g. "FACE_VERTEX_OUT_OF_RANGE").
    pub code: String,
    pub message: String,
    pub severity: ValidationSeverity,
    pub category: ValidationCategory,
    /// Whether `autofix` can repair this issue.
    pub auto_fixable: bool,
}

impl ValidationItem {
    pub fn error(code: &str, category: ValidationCategory, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
            severity: ValidationSeverity::Error,
            category,
            auto_fixable: false,
        }
    }

    pub fn warning(code: &str, category: ValidationCategory, message: String) -> Self {
        Self {
            severity: ValidationSeverity::Warning,
            ..Self::error(code, category, message)
        }
    }

    pub fn fixable(mut self) -> Self {
        self.auto_fixable = true;
        self
    }
}

impl fmt::Display for ValidationItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            ValidationSeverity::Error => "error",
            ValidationSeverity::Warning => "warning",
        };
        write!(f, "{}[{}]: {}", severity, self.code, self.message)?;
        if self.auto_fixable {
            write!(f, " (fixable)")?;
        }
        Ok(())
    }
}

/// Findings for one asset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub items: Vec<ValidationItem>,
    pub error_count: u32,
    pub warning_count: u32,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// No errors. Warnings do not make an asset invalid.
    pub fn is_valid(&self) -> bool {
        self.error_count == 0
    }

    pub fn add(&mut self, item: ValidationItem) {
        match item.severity {
            ValidationSeverity::Error => self.error_count += 1,
            ValidationSeverity::Warning => self.warning_count += 1,
        }
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ValidationItem>) {
        for item in items {
            self.add(item);
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.items.iter().any(|i| i.code == code)
    }

    /// Number of findings with `code` that autofix can repair.
    pub fn fixable_count(&self, code: &str) -> u32 {
        self.items
            .iter()
            .filter(|i| i.auto_fixable && i.code == code)
            .count() as u32
    }
}
