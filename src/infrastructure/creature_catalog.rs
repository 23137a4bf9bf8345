//! In-memory creature catalog
//!
//! Ships a handful of common stat blocks and can be extended from a JSON file
//! holding an array of creature templates. Entries loaded from the file replace
//! built-ins with the same name.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::outbound::CreatureCatalog;
use crate::domain::entities::{CreatureSize, CreatureTemplate, MovementSpeeds};

#[derive(Debug, Clone, Default)]
pub struct InMemoryCreatureCatalog {
    /// Keyed by lowercase name
    templates: BTreeMap<String, CreatureTemplate>,
}

impl InMemoryCreatureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog preloaded with the built-in stat blocks
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for template in builtin_templates() {
            catalog.insert(template);
        }
        catalog
    }

    pub fn insert(&mut self, template: CreatureTemplate) {
        self.templates
            .insert(template.name.to_lowercase(), template);
    }

    /// Merge templates from a JSON array
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize> {
        let templates: Vec<CreatureTemplate> = serde_json::from_str(json)
            .context("Creature catalog must be a JSON array of templates")?;
        let count = templates.len();
        for template in templates {
            self.insert(template);
        }
        Ok(count)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read creature catalog {}", path.display()))?;
        let count = self
            .extend_from_json(&json)
            .with_context(|| format!("Failed to parse creature catalog {}", path.display()))?;
        tracing::info!(path = %path.display(), count, "Loaded creature templates");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl CreatureCatalog for InMemoryCreatureCatalog {
    fn find(&self, name: &str) -> Option<CreatureTemplate> {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.templates
            .get(&key)
            .or_else(|| {
                self.templates
                    .iter()
                    .find(|(name, _)| name.starts_with(&key))
                    .map(|(_, template)| template)
            })
            .cloned()
    }

    fn names(&self) -> Vec<String> {
        self.templates.values().map(|t| t.name.clone()).collect()
    }
}

fn builtin_templates() -> Vec<CreatureTemplate> {
    vec![
        CreatureTemplate::new("Goblin", CreatureSize::Small, 7, 15).with_initiative(2),
        CreatureTemplate::new("Orc", CreatureSize::Medium, 15, 13).with_initiative(1),
        CreatureTemplate::new("Skeleton", CreatureSize::Medium, 13, 13).with_initiative(2),
        CreatureTemplate::new("Wolf", CreatureSize::Medium, 11, 13)
            .with_speeds(MovementSpeeds::walking(40))
            .with_initiative(2),
        CreatureTemplate::new("Ogre", CreatureSize::Large, 59, 11)
            .with_speeds(MovementSpeeds::walking(40))
            .with_initiative(-1),
        CreatureTemplate::new("Adult Red Dragon", CreatureSize::Huge, 256, 19)
            .with_speeds(MovementSpeeds {
                walk: 40,
                fly: 80,
                swim: 0,
                climb: 40,
                burrow: 0,
            })
            .with_legendary(3, 3)
            .with_recharge("Fire Breath", 5),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_beats_prefix() {
        let mut catalog = InMemoryCreatureCatalog::with_builtins();
        catalog.insert(CreatureTemplate::new("Orc War Chief", CreatureSize::Medium, 93, 16));

        assert_eq!(catalog.find("orc").map(|t| t.hp), Some(15));
        assert_eq!(catalog.find("Orc War").map(|t| t.hp), Some(93));
        assert_eq!(catalog.find("adult").map(|t| t.name), Some("Adult Red Dragon".into()));
        assert!(catalog.find("Beholder").is_none());
        assert!(catalog.find("  ").is_none());
    }

    #[test]
    fn test_dragon_has_legendary_pools() {
        let dragon = InMemoryCreatureCatalog::with_builtins()
            .find("Adult Red Dragon")
            .unwrap();
        assert_eq!(dragon.legendary_actions, Some(3));
        assert_eq!(dragon.legendary_resistances, Some(3));
        assert_eq!(dragon.recharge_abilities.len(), 1);
        assert_eq!(dragon.speeds.fly, 80);
    }

    #[test]
    fn test_json_replaces_and_extends() {
        let mut catalog = InMemoryCreatureCatalog::with_builtins();
        let before = catalog.len();
        let loaded = catalog
            .extend_from_json(
                r#"[
                    {"name": "Goblin", "size": "small", "hp": 12, "armorClass": 15},
                    {"name": "Owlbear", "size": "large", "hp": 59, "armorClass": 13,
                     "speeds": {"walk": 40}}
                ]"#,
            )
            .unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(catalog.len(), before + 1);
        assert_eq!(catalog.find("goblin").map(|t| t.hp), Some(12));
        assert_eq!(catalog.find("Owlbear").map(|t| t.speeds.walk), Some(40));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let mut catalog = InMemoryCreatureCatalog::new();
        assert!(catalog.extend_from_json("{\"name\": \"Goblin\"}").is_err());
        assert!(catalog.is_empty());
    }
}
