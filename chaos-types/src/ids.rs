//! Instance identity and healthy-set algebra.

use std::collections::BTreeSet;
use std::fmt;

/// Opaque identifier of a compute instance, as reported by the control plane.
///
/// Only compared, never parsed.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(String);

impl InstanceId {
    /// Wrap a control-plane identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Instances whose target-health state was "healthy" at one observation.
///
/// Built fresh on every poll. Backed by an ordered set so that display and
/// victim selection are deterministic, but carries no ordering meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthySet(BTreeSet<InstanceId>);

impl HealthySet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of healthy instances.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no instance is healthy.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `id` is in the set.
    pub fn contains(&self, id: &InstanceId) -> bool {
        self.0.contains(id)
    }

    /// Insert an instance. Returns false if it was already present.
    pub fn insert(&mut self, id: InstanceId) -> bool {
        self.0.insert(id)
    }

    /// Iterate in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &InstanceId> {
        self.0.iter()
    }

    /// The lowest identifier, if any.
    pub fn first(&self) -> Option<&InstanceId> {
        self.0.iter().next()
    }

    /// Members of `self` missing from `later`.
    pub fn removed_in(&self, later: &HealthySet) -> Vec<InstanceId> {
        self.0.difference(&later.0).cloned().collect()
    }

    /// Members of `later` missing from `self`.
    pub fn added_in(&self, later: &HealthySet) -> Vec<InstanceId> {
        later.0.difference(&self.0).cloned().collect()
    }
}

impl FromIterator<InstanceId> for HealthySet {
    fn from_iter<I: IntoIterator<Item = InstanceId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for HealthySet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(InstanceId::from).collect())
    }
}

impl fmt::Display for HealthySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", id)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_ignores_duplicates() {
        let set: HealthySet = ["i-b", "i-a", "i-b"].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.first(), Some(&InstanceId::from("i-a")));
    }

    #[test]
    fn removed_and_added() {
        let before: HealthySet = ["i-a", "i-b"].into_iter().collect();
        let after: HealthySet = ["i-b", "i-c"].into_iter().collect();

        assert_eq!(before.removed_in(&after), vec![InstanceId::from("i-a")]);
        assert_eq!(before.added_in(&after), vec![InstanceId::from("i-c")]);
    }

    #[test]
    fn display_lists_members() {
        let set: HealthySet = ["i-2", "i-1"].into_iter().collect();
        assert_eq!(set.to_string(), "[i-1, i-2]");
        assert_eq!(HealthySet::new().to_string(), "[]");
    }

    #[test]
    fn instance_id_debug_and_display() {
        let id = InstanceId::new("i-0abc");
        assert_eq!(id.to_string(), "i-0abc");
        assert_eq!(format!("{:?}", id), "InstanceId(i-0abc)");
    }
}
