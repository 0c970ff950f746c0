//! Element kind allow-lists
//!
//! Each call site that sanitizes a document picks an [`AllowList`]: the
//! permitted `type` tokens for items, holes and lines, plus a policy for the
//! collections the downstream editor cannot rebuild from plain JSON.
//! The shipped call sites are named by [`AllowListProfile`].

use crate::error::{SceneError, SceneResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Furnishing catalog of the editor's autosave path
const AUTOSAVE_ITEM_KINDS: &[&str] = &[
    "sofa",
    "table",
    "sedia",
    "armchairs",
    "bench",
    "bookcase",
    "wardrobe",
    "kitchen",
    "sink",
    "fridge",
    "tv",
    "desk",
    "conditioner",
    "trash",
    "umbrella-stand",
    "hanger",
    "coat-hook",
    "cube",
    "projector",
    "blackboard",
    "camera",
    "balcony",
    "simple-stair",
    "chairdesk",
    "hub",
    "hiroos",
    "school-desk",
    "school-desk-double",
    "double school desk",
    "child chair desk",
    "canteen table",
    "canteen cart",
    "cleaning cart",
    "fire-extinguisher",
    "smoke-detector",
    "radiator-old-style",
    "termosifone_alluminio",
    "recycling-bins",
    "router_wifi",
    "schneider",
    "teaching-post",
    "text",
    "three- phase panel",
    "naspo",
    "monitor_pc",
    "metal_detector",
    "multimedia chalkboard",
    "image",
    "pannello_elettrico",
    "round column",
    "square column",
];

/// Generic furniture catalog used by generated designs
const IMPORT_ITEM_KINDS: &[&str] = &[
    "bed",
    "wardrobe",
    "desk",
    "chair",
    "chairdesk",
    "deskoffice",
    "sofa",
    "armchairs",
    "tv",
    "table",
    "bookcase",
    "fridge",
    "kitchen",
    "sink",
    "radiator-modern-style",
    "trash",
    "coat-hook",
    "umbrella-stand",
    "recycling-bins",
    "smoke-detector",
    "fire-extinguisher",
    "monitor-pc",
    "router-wifi",
    "air-conditioner",
    "hanger",
    "image",
    "text",
    "blackboard",
    "camera",
    "projector",
    "bench",
    "balcony",
    "column",
    "column-square",
    "cube",
    "simple-stair",
];

const HOLE_KINDS: &[&str] = &[
    "door",
    "double door",
    "sliding door",
    "window",
    "sash window",
    "venetian-blind-window",
    "window-curtain",
    "gate",
    "panic door",
    "double panic door",
];

const LINE_KINDS: &[&str] = &["wall"];

/// A set of permitted `type` tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindSet(BTreeSet<String>);

impl KindSet {
    /// Build from static tokens
    #[must_use]
    pub fn from_static(kinds: &[&str]) -> Self {
        kinds.iter().copied().collect()
    }

    /// Membership test
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.0.contains(kind)
    }

    /// Number of permitted kinds
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing is permitted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate tokens in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for KindSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// What the sanitizer does with a whole collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementPolicy {
    /// Keep entries that pass the per-element checks
    #[default]
    Retain,
    /// Empty the collection unconditionally
    Discard,
}

fn discard() -> ElementPolicy {
    ElementPolicy::Discard
}

/// Permitted element kinds and collection policies for one call site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowList {
    /// Name used in logs and cache keys
    pub name: String,
    /// Permitted item kinds
    #[serde(default)]
    pub item_kinds: KindSet,
    /// Permitted hole kinds
    #[serde(default)]
    pub hole_kinds: KindSet,
    /// Permitted line kinds
    #[serde(default)]
    pub line_kinds: KindSet,
    /// Policy for `items`
    #[serde(default)]
    pub items: ElementPolicy,
    /// Policy for `areas`
    #[serde(default = "discard")]
    pub areas: ElementPolicy,
}

impl AllowList {
    /// New allow-list with the shared hole and line vocabularies
    #[must_use]
    pub fn new(name: impl Into<String>, item_kinds: KindSet) -> Self {
        Self {
            name: name.into(),
            item_kinds,
            hole_kinds: KindSet::from_static(HOLE_KINDS),
            line_kinds: KindSet::from_static(LINE_KINDS),
            items: ElementPolicy::Retain,
            areas: ElementPolicy::Discard,
        }
    }

    /// With a different hole vocabulary
    #[must_use]
    pub fn with_hole_kinds(mut self, kinds: KindSet) -> Self {
        self.hole_kinds = kinds;
        self
    }

    /// With a different line vocabulary
    #[must_use]
    pub fn with_line_kinds(mut self, kinds: KindSet) -> Self {
        self.line_kinds = kinds;
        self
    }

    /// With an items policy
    #[must_use]
    pub fn with_items(mut self, policy: ElementPolicy) -> Self {
        self.items = policy;
        self
    }

    /// With an areas policy
    #[must_use]
    pub fn with_areas(mut self, policy: ElementPolicy) -> Self {
        self.areas = policy;
        self
    }

    /// Is `kind` a permitted item kind
    #[inline]
    #[must_use]
    pub fn permits_item(&self, kind: &str) -> bool {
        self.item_kinds.contains(kind)
    }

    /// Is `kind` a permitted hole kind
    #[inline]
    #[must_use]
    pub fn permits_hole(&self, kind: &str) -> bool {
        self.hole_kinds.contains(kind)
    }

    /// Is `kind` a permitted line kind
    #[inline]
    #[must_use]
    pub fn permits_line(&self, kind: &str) -> bool {
        self.line_kinds.contains(kind)
    }

    /// Reject configurations that would erase every wall
    ///
    /// # Errors
    /// `SceneError::InvalidAllowList` on an empty name or empty line vocabulary.
    pub fn validate(&self) -> SceneResult<()> {
        if self.name.trim().is_empty() {
            return Err(SceneError::InvalidAllowList("name is empty".to_string()));
        }
        if self.line_kinds.is_empty() {
            return Err(SceneError::InvalidAllowList(format!(
                "{}: no line kinds permitted",
                self.name
            )));
        }
        Ok(())
    }
}

impl Default for AllowList {
    fn default() -> Self {
        AllowListProfile::Autosave.allow_list()
    }
}

/// The allow-lists shipped for the two document entry points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllowListProfile {
    /// Reloading the browser-local autosave slot
    #[default]
    Autosave,
    /// Generated or externally authored documents
    ExternalImport,
}

impl AllowListProfile {
    /// Profile name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            AllowListProfile::Autosave => "autosave",
            AllowListProfile::ExternalImport => "external-import",
        }
    }

    /// Materialize the allow-list
    ///
    /// Both profiles discard `areas`: the editor rejects plain-JSON areas
    /// with "element does not exist in catalog". The import profile also
    /// discards `items`, which the editor needs as wrapped value objects.
    #[must_use]
    pub fn allow_list(self) -> AllowList {
        match self {
            AllowListProfile::Autosave => {
                AllowList::new(self.name(), KindSet::from_static(AUTOSAVE_ITEM_KINDS))
            }
            AllowListProfile::ExternalImport => {
                AllowList::new(self.name(), KindSet::from_static(IMPORT_ITEM_KINDS))
                    .with_items(ElementPolicy::Discard)
            }
        }
    }
}

impl fmt::Display for AllowListProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AllowListProfile {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "autosave" => Ok(Self::Autosave),
            "import" | "external-import" => Ok(Self::ExternalImport),
            other => Err(SceneError::InvalidAllowList(format!(
                "unknown profile: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autosave_profile_vocabulary() {
        let list = AllowListProfile::Autosave.allow_list();
        assert!(list.permits_item("sofa"));
        assert!(list.permits_item("round column"));
        assert!(list.permits_item("text"));
        assert!(!list.permits_item("alien-spaceship"));
        assert!(list.permits_hole("double panic door"));
        assert!(!list.permits_hole("wall"));
        assert!(list.permits_line("wall"));
        assert_eq!(list.line_kinds.len(), 1);
        assert_eq!(list.items, ElementPolicy::Retain);
        assert_eq!(list.areas, ElementPolicy::Discard);
    }

    #[test]
    fn import_profile_discards_items() {
        let list = AllowListProfile::ExternalImport.allow_list();
        assert!(list.permits_item("bed"));
        assert!(!list.permits_item("sedia"));
        assert_eq!(list.items, ElementPolicy::Discard);
        assert_eq!(list.areas, ElementPolicy::Discard);
        assert_eq!(list.hole_kinds, AllowListProfile::Autosave.allow_list().hole_kinds);
    }

    #[test]
    fn profile_parse() {
        assert_eq!("autosave".parse::<AllowListProfile>().unwrap(), AllowListProfile::Autosave);
        assert_eq!(
            "import".parse::<AllowListProfile>().unwrap(),
            AllowListProfile::ExternalImport
        );
        assert!("other".parse::<AllowListProfile>().is_err());
    }

    #[test]
    fn validate_rejects_empty_lines() {
        let list = AllowList::new("custom", KindSet::default()).with_line_kinds(KindSet::default());
        assert!(list.validate().is_err());
        assert!(AllowList::default().validate().is_ok());
    }

    #[test]
    fn deserializes_with_defaults() {
        let list: AllowList = serde_json::from_value(serde_json::json!({
            "name": "kiosk",
            "item_kinds": ["sofa"],
            "line_kinds": ["wall"]
        }))
        .unwrap();
        assert!(list.permits_item("sofa"));
        assert!(list.hole_kinds.is_empty());
        assert_eq!(list.items, ElementPolicy::Retain);
        assert_eq!(list.areas, ElementPolicy::Discard);
    }
}
