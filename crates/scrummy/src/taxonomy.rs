//! # Label Taxonomy
//!
//! Workflow placement is encoded in `type: value` labels:
//!
//! - **Stage**: `stage: <column name>` - which column every card of the parent sits in
//! - **Project**: `project: <board name>` - which boards the parent has a card in
//!
//! Label names are typed by users, so every comparison trims surrounding
//! whitespace and ignores case. Labels are parsed once into a [`TypedLabel`]
//! and carried through the reconcilers in that form.

use std::fmt;

use crate::error::SyncError;
use crate::models::Label;

/// Label types the engine acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    /// `stage: <column>`
    Stage,
    /// `project: <board>`
    Project,
}

impl LabelKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stage => "stage",
            Self::Project => "project",
        }
    }

    fn from_type(label_type: &str) -> Option<Self> {
        match label_type {
            "stage" => Some(Self::Stage),
            "project" => Some(Self::Project),
            _ => None,
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trimmed, lower-cased form used for every name comparison.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case and whitespace insensitive name equality.
#[must_use]
pub fn same_name(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Everything before the first `:`, normalized.
pub fn type_of(name: &str) -> Result<String, SyncError> {
    name.split_once(':')
        .map(|(label_type, _)| normalize(label_type))
        .ok_or_else(|| SyncError::MalformedLabel(name.to_string()))
}

/// Everything after the first `:`, normalized.
pub fn value_of(name: &str) -> Result<String, SyncError> {
    name.split_once(':')
        .map(|(_, value)| normalize(value))
        .ok_or_else(|| SyncError::MalformedLabel(name.to_string()))
}

/// A label whose type the engine understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedLabel {
    pub kind: LabelKind,
    /// Normalized value.
    pub value: String,
    /// Name exactly as it exists on the remote side.
    pub name: String,
}

impl TypedLabel {
    /// Parse a label name.
    ///
    /// Returns `Ok(None)` for well-formed labels of a type the engine ignores
    /// (`priority: high`), and `MalformedLabel` when there is no type at all.
    pub fn parse(name: &str) -> Result<Option<Self>, SyncError> {
        let label_type = type_of(name)?;
        let Some(kind) = LabelKind::from_type(&label_type) else {
            return Ok(None);
        };

        Ok(Some(Self {
            kind,
            value: value_of(name)?,
            name: name.to_string(),
        }))
    }

    /// Canonical label for a value taken from a board or column name.
    #[must_use]
    pub fn canonical(kind: LabelKind, display_value: &str) -> Self {
        Self {
            kind,
            value: normalize(display_value),
            name: format!("{kind}: {}", display_value.trim()),
        }
    }

    /// Whether this label's value names `other` (a column or board name).
    #[must_use]
    pub fn names(&self, other: &str) -> bool {
        self.value == normalize(other)
    }

    /// Whether two labels are the same remote label.
    #[must_use]
    pub fn same_label(&self, other: &Self) -> bool {
        same_name(&self.name, &other.name)
    }
}

/// All labels of `kind`. Labels without a type are skipped, not errors.
#[must_use]
pub fn find_by_type(labels: &[Label], kind: LabelKind) -> Vec<TypedLabel> {
    labels
        .iter()
        .filter_map(|label| TypedLabel::parse(&label.name).ok().flatten())
        .filter(|typed| typed.kind == kind)
        .collect()
}

/// The single label of `kind`, or `None` when there is none.
///
/// More than one is a corrupted parent and fails with `AmbiguousLabel`.
pub fn find_at_most_one_by_type(
    labels: &[Label],
    kind: LabelKind,
) -> Result<Option<TypedLabel>, SyncError> {
    let mut found = find_by_type(labels, kind);
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        _ => Err(SyncError::AmbiguousLabel {
            kind: kind.to_string(),
            labels: found.into_iter().map(|l| l.name).collect(),
        }),
    }
}

/// The single label of `kind`.
pub fn find_exactly_one_by_type(labels: &[Label], kind: LabelKind) -> Result<TypedLabel, SyncError> {
    find_at_most_one_by_type(labels, kind)?
        .ok_or_else(|| SyncError::LabelNotFound(kind.to_string()))
}

/// The label `kind: value`, compared case and whitespace insensitively.
pub fn match_type_value<'a>(
    labels: &'a [Label],
    kind: LabelKind,
    value: &str,
) -> Result<&'a Label, SyncError> {
    let wanted = normalize(value);
    labels
        .iter()
        .find(|label| {
            TypedLabel::parse(&label.name)
                .ok()
                .flatten()
                .is_some_and(|typed| typed.kind == kind && typed.value == wanted)
        })
        .ok_or_else(|| SyncError::LabelNotFound(format!("{kind}: {}", value.trim())))
}
