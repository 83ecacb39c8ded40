//! Category masks and the pair table deciding how two bodies interact.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CollisionError;

/// Bitmask tagging a body with one or more categories.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryMask(pub u32);

impl CategoryMask {
    pub const NONE: CategoryMask = CategoryMask(0);

    /// Single-bit mask; `NONE` for an index past the last bit.
    pub fn bit(index: u32) -> Self {
        1u32.checked_shl(index).map_or(CategoryMask::NONE, CategoryMask)
    }

    pub fn contains(self, other: CategoryMask) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn intersects(self, other: CategoryMask) -> bool {
        (self.0 & other.0) != 0
    }

    /// Iterate over the single-bit masks set in `self`.
    pub fn bits(self) -> impl Iterator<Item = CategoryMask> {
        let mut rest = self.0;
        std::iter::from_fn(move || {
            if rest == 0 {
                return None;
            }
            let low = rest & rest.wrapping_neg();
            rest &= rest - 1;
            Some(CategoryMask(low))
        })
    }
}

impl std::ops::BitOr for CategoryMask {
    type Output = CategoryMask;

    fn bitor(self, rhs: CategoryMask) -> CategoryMask {
        CategoryMask(self.0 | rhs.0)
    }
}

/// Names to bits, one bit per category, at most 32.
#[derive(Clone, Debug, Default)]
pub struct CategoryRegistry {
    names: Vec<String>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category and return its bit.
    pub fn register(&mut self, name: &str) -> Result<CategoryMask, CollisionError> {
        if self.names.iter().any(|n| n == name) {
            return Err(CollisionError::DuplicateCategory(name.to_string()));
        }
        if self.names.len() >= 32 {
            return Err(CollisionError::RegistryFull);
        }
        self.names.push(name.to_string());
        Ok(CategoryMask::bit(self.names.len() as u32 - 1))
    }

    pub fn get(&self, name: &str) -> Option<CategoryMask> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| CategoryMask::bit(i as u32))
    }

    pub fn require(&self, name: &str) -> Result<CategoryMask, CollisionError> {
        self.get(name)
            .ok_or_else(|| CollisionError::UnknownCategory(name.to_string()))
    }

    /// Union of several named categories.
    pub fn mask_of(&self, names: &[&str]) -> Result<CategoryMask, CollisionError> {
        names
            .iter()
            .try_fold(CategoryMask::NONE, |acc, n| Ok(acc | self.require(n)?))
    }

    pub fn name_of(&self, mask: CategoryMask) -> Option<&str> {
        let index = mask.0.trailing_zeros() as usize;
        if mask.0.count_ones() != 1 {
            return None;
        }
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Interaction between two categories. Variants are ordered by strength.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    /// Pass through each other.
    #[default]
    Ignore,
    /// Report a contact without correcting positions.
    Sense,
    /// Rigid blocking between two moving bodies.
    Block,
    /// The snappable side is stood on or pushes the other; only the other is corrected.
    Snap,
}

/// Declarative rule as found in a config file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub a: String,
    pub b: String,
    pub interaction: Interaction,
}

/// Symmetric lookup table (category A, category B) -> interaction.
#[derive(Clone, Debug, Default)]
pub struct CollisionPolicy {
    rules: HashMap<(u32, u32), Interaction>,
    // Union of every bit named by a rule
    paired: u32,
}

impl CollisionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a policy from named rules, resolving names through `registry`.
    pub fn from_rules(
        registry: &CategoryRegistry,
        rules: &[PolicyRule],
    ) -> Result<Self, CollisionError> {
        let mut policy = Self::new();
        for rule in rules {
            let a = registry.require(&rule.a)?;
            let b = registry.require(&rule.b)?;
            policy.set(a, b, rule.interaction);
        }
        Ok(policy)
    }

    pub fn from_json_str(registry: &CategoryRegistry, json: &str) -> Result<Self, CollisionError> {
        let rules: Vec<PolicyRule> = serde_json::from_str(json)?;
        Self::from_rules(registry, &rules)
    }

    /// Set the interaction for every bit pair of `a` x `b` (order-independent).
    pub fn set(&mut self, a: CategoryMask, b: CategoryMask, interaction: Interaction) {
        for bit_a in a.bits() {
            for bit_b in b.bits() {
                self.rules.insert(Self::key(bit_a, bit_b), interaction);
            }
        }
        self.paired |= a.0 | b.0;
    }

    /// Strongest interaction over all bit pairs; `Ignore` when nothing is defined.
    pub fn interaction(&self, a: CategoryMask, b: CategoryMask) -> Interaction {
        let mut best = Interaction::Ignore;
        let (a, b) = (CategoryMask(a.0 & self.paired), CategoryMask(b.0 & self.paired));
        for bit_a in a.bits() {
            for bit_b in b.bits() {
                if best == Interaction::Snap {
                    return best;
                }
                if let Some(&i) = self.rules.get(&Self::key(bit_a, bit_b)) {
                    best = best.max(i);
                }
            }
        }
        best
    }

    fn key(a: CategoryMask, b: CategoryMask) -> (u32, u32) {
        if a.0 <= b.0 { (a.0, b.0) } else { (b.0, a.0) }
    }
}
