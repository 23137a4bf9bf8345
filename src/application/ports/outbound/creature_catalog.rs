//! Creature catalog port - where `place_creature` looks up stat blocks

use crate::domain::entities::CreatureTemplate;

/// Lookup of creature templates by name
///
/// Implementations match case-insensitively, preferring an exact name over a
/// prefix match.
pub trait CreatureCatalog: Send + Sync {
    fn find(&self, name: &str) -> Option<CreatureTemplate>;

    /// All known creature names, for listing in the DM UI
    fn names(&self) -> Vec<String>;
}
