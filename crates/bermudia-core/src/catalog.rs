//! Read-only game content: territories, questions and treasures.
//!
//! Loaded once at startup from a YAML file and shared by reference. The
//! loader validates cross references so lookups at request time only fail
//! for ids a client made up.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use bermudia_types::{
    Entity, IslandId, Question, QuestionId, Territory, TerritoryId, Treasure, TreasureId,
};

use crate::error::ActionError;

/// Errors that can occur when loading content.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Failed to read the content file from disk.
    #[error("failed to read content file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse content YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The content parsed but refers to things that do not exist.
    #[error("invalid content: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for CatalogError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    start_territory: TerritoryId,
    territories: Vec<Territory>,
    #[serde(default)]
    questions: Vec<Question>,
    #[serde(default)]
    treasures: Vec<Treasure>,
}

/// Static content, indexed by key.
#[derive(Debug, Clone)]
pub struct Catalog {
    start_territory: TerritoryId,
    territories: BTreeMap<TerritoryId, Territory>,
    questions: BTreeMap<QuestionId, Question>,
    treasures: BTreeMap<TreasureId, Treasure>,
}

impl Catalog {
    /// Load content from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file cannot be read, parsed or
    /// validated.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate content from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Yaml`] for malformed YAML and
    /// [`CatalogError::Invalid`] for dangling references.
    pub fn parse(yaml: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yml::from_str(yaml)?;
        let catalog = Self {
            start_territory: file.start_territory,
            territories: file
                .territories
                .into_iter()
                .map(|t| (t.id.clone(), t))
                .collect(),
            questions: file
                .questions
                .into_iter()
                .map(|q| (q.id.clone(), q))
                .collect(),
            treasures: file
                .treasures
                .into_iter()
                .map(|t| (t.id.clone(), t))
                .collect(),
        };
        catalog.validate()?;
        tracing::info!(
            territories = catalog.territories.len(),
            questions = catalog.questions.len(),
            treasures = catalog.treasures.len(),
            "Content catalog loaded"
        );
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if !self.territories.contains_key(&self.start_territory) {
            return Err(CatalogError::Invalid(format!(
                "start territory {} is not defined",
                self.start_territory
            )));
        }

        let mut all_islands = BTreeSet::new();
        for territory in self.territories.values() {
            let known: BTreeSet<&IslandId> = territory.islands.iter().map(|i| &i.id).collect();
            let dangling = std::iter::once(&territory.start_island)
                .chain(territory.edges.iter().flat_map(|e| [&e.from, &e.to]))
                .chain(territory.refuel_islands.iter())
                .chain(territory.terminal_islands.iter())
                .find(|island| !known.contains(island));
            if let Some(island) = dangling {
                return Err(CatalogError::Invalid(format!(
                    "territory {} refers to unknown island {island}",
                    territory.id
                )));
            }
            all_islands.extend(known);
        }

        if let Some(treasure) = self
            .treasures
            .values()
            .find(|t| !all_islands.contains(&t.island))
        {
            return Err(CatalogError::Invalid(format!(
                "treasure {} is on unknown island {}",
                treasure.id, treasure.island
            )));
        }

        if let Some((question, territory)) = self.questions.values().find_map(|q| {
            q.territory
                .as_ref()
                .filter(|t| !self.territories.contains_key(*t))
                .map(|t| (&q.id, t))
        }) {
            return Err(CatalogError::Invalid(format!(
                "question {question} belongs to unknown territory {territory}"
            )));
        }
        Ok(())
    }

    /// Territory new players start in.
    pub fn start_territory(&self) -> Result<&Territory, ActionError> {
        self.territory(&self.start_territory)
    }

    /// Look up a territory.
    pub fn territory(&self, id: &TerritoryId) -> Result<&Territory, ActionError> {
        self.territories
            .get(id)
            .ok_or_else(|| ActionError::not_found(Entity::Territory, id))
    }

    /// Look up a question.
    pub fn question(&self, id: &QuestionId) -> Result<&Question, ActionError> {
        self.questions
            .get(id)
            .ok_or_else(|| ActionError::not_found(Entity::Question, id))
    }

    /// Every territory, in key order.
    pub fn territories(&self) -> impl Iterator<Item = &Territory> {
        self.territories.values()
    }

    /// Every question, in key order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.values()
    }

    /// Look up a treasure.
    pub fn treasure(&self, id: &TreasureId) -> Result<&Treasure, ActionError> {
        self.treasures
            .get(id)
            .ok_or_else(|| ActionError::not_found(Entity::Treasure, id))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! A small catalog shared by service tests.

    use super::Catalog;

    pub(crate) const CONTENT: &str = r"
startTerritory: bermuda
territories:
  - id: bermuda
    name: Bermuda
    startIsland: a
    islands:
      - { id: a, name: Alpha }
      - { id: b, name: Beta }
      - { id: c, name: Gamma }
    edges:
      - { from: a, to: b }
      - { from: b, to: c }
      - { from: c, to: a }
    refuelIslands: [b]
    terminalIslands: [c]
  - id: sargasso
    name: Sargasso
    startIsland: x
    islands:
      - { id: x, name: Xi }
      - { id: y, name: Ypsilon }
    edges:
      - { from: x, to: y }
    refuelIslands: [x]
    terminalIslands: [y]
questions:
  - { id: q1, territory: bermuda, knowledgeAmount: 10, resubmittable: true, rewardWorth: 0 }
  - { id: q2, territory: bermuda, knowledgeAmount: 20, resubmittable: false, rewardWorth: 100 }
  - { id: q3, territory: sargasso, knowledgeAmount: 50, resubmittable: true, rewardWorth: 0 }
treasures:
  - { id: chest-b, island: b }
  - { id: chest-a, island: a }
";

    #[allow(clippy::unwrap_used)]
    pub(crate) fn catalog() -> Catalog {
        Catalog::parse(CONTENT).unwrap()
    }
}
