//! Knowledge bars and migration between territories.
//!
//! A player leaves a territory from one of its terminal islands. Moving
//! into a territory never visited before is free once the player knows
//! enough about the territory they came from; otherwise it costs coins.
//! Returning to a visited territory is always free.

use std::collections::BTreeMap;

use serde::Serialize;

use bermudia_ledger::deduct;
use bermudia_types::{
    Answer, AnswerStatus, Cost, Entity, Player, PlayerUpdateEvent, PlayerUpdateReason, Question,
    ResourceKind, Territory, TerritoryId,
};

use crate::config::EconomyConfig;
use crate::error::{GameError, Violation};
use crate::player::with_resources;

/// Knowledge a player gathered in one territory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBar {
    /// Territory the questions belong to.
    pub territory_id: TerritoryId,
    /// Knowledge from correctly answered questions.
    pub value: i32,
    /// Knowledge the territory offers in total.
    pub total: i32,
}

/// Sum knowledge per territory, counting only fully correct answers.
///
/// Questions without a territory are ignored. Bars come out in territory
/// key order.
pub fn knowledge_bars<'a>(
    questions: impl IntoIterator<Item = &'a Question>,
    answers: &[Answer],
) -> Vec<KnowledgeBar> {
    let mut bars: BTreeMap<&TerritoryId, (i32, i32)> = BTreeMap::new();
    for question in questions {
        let Some(territory) = question.territory.as_ref() else {
            continue;
        };
        let solved = answers
            .iter()
            .any(|a| a.question_id == question.id && a.status == AnswerStatus::Correct);
        let (value, total) = bars.entry(territory).or_insert((0, 0));
        *total = total.saturating_add(question.knowledge_amount);
        if solved {
            *value = value.saturating_add(question.knowledge_amount);
        }
    }
    bars.into_iter()
        .map(|(territory, (value, total))| KnowledgeBar {
            territory_id: territory.clone(),
            value,
            total,
        })
        .collect()
}

/// How a player relates to a destination territory.
///
/// Options are listed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MigrationStatus {
    /// Visited before, not the current territory.
    Visited,
    /// The territory the player is in.
    Resident,
    /// Never visited.
    Untouched,
}

/// One destination as seen from the player's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOption {
    /// Destination key.
    pub territory_id: TerritoryId,
    /// Destination display name.
    pub territory_name: String,
    /// Relation of the player to the destination.
    pub status: MigrationStatus,
    /// Price charged when `must_pay_cost` is set.
    pub migration_cost: Cost,
    /// Whether moving there costs coins.
    pub must_pay_cost: bool,
    /// Whether the move would succeed.
    pub feasible: bool,
    /// Why not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Violation>,
}

/// Feasibility of migrating anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateCheck {
    /// Territory whose knowledge decides the cost: the last one visited.
    pub knowledge_criteria_territory: TerritoryId,
    /// Knowledge gathered there.
    pub knowledge_value: i32,
    /// Knowledge that waives the cost.
    pub min_acceptable_knowledge: i32,
    /// Every territory, visited first, then the current one, then the rest.
    pub options: Vec<MigrationOption>,
}

impl MigrateCheck {
    /// Whether the knowledge requirement is met.
    pub const fn knowledge_passed(&self) -> bool {
        self.knowledge_value >= self.min_acceptable_knowledge
    }

    /// The option for `territory`, if it exists.
    pub fn option(&self, territory: &TerritoryId) -> Option<&MigrationOption> {
        self.options.iter().find(|o| &o.territory_id == territory)
    }
}

/// Report where `player` can migrate from `current`.
pub fn migrate_check(
    player: &Player,
    bars: &[KnowledgeBar],
    current: &Territory,
    territories: &[&Territory],
    config: &EconomyConfig,
) -> MigrateCheck {
    let criteria = player
        .visited_territories
        .last()
        .unwrap_or(&player.territory)
        .clone();
    let (knowledge_value, min_acceptable_knowledge) = bars
        .iter()
        .find(|bar| bar.territory_id == criteria)
        .map_or((0, 0), |bar| {
            (bar.value, bar.total.min(config.migration_min_knowledge))
        });

    let mut check = MigrateCheck {
        knowledge_criteria_territory: criteria,
        knowledge_value,
        min_acceptable_knowledge,
        options: Vec::with_capacity(territories.len()),
    };
    let passed = check.knowledge_passed();
    let at_terminal = current.is_terminal_island(&player.island);
    check.options = territories
        .iter()
        .map(|territory| option_for(player, territory, passed, at_terminal, config))
        .collect();
    check.options.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then_with(|| a.territory_id.cmp(&b.territory_id))
    });
    check
}

fn option_for(
    player: &Player,
    territory: &Territory,
    knowledge_passed: bool,
    at_terminal: bool,
    config: &EconomyConfig,
) -> MigrationOption {
    let status = if player.territory == territory.id {
        MigrationStatus::Resident
    } else if player.visited_territories.contains(&territory.id) {
        MigrationStatus::Visited
    } else {
        MigrationStatus::Untouched
    };
    let migration_cost = Cost::of(ResourceKind::Coin, config.migration_coin_cost);
    let must_pay_cost = status == MigrationStatus::Untouched && !knowledge_passed;

    let reason = if status == MigrationStatus::Resident {
        Some(Violation::AlreadyInTerritory)
    } else if !at_terminal {
        Some(Violation::NotAtTerminalIsland)
    } else if must_pay_cost && deduct(&player.resources, &migration_cost).is_err() {
        Some(Violation::CannotAffordMigration)
    } else {
        None
    };

    MigrationOption {
        territory_id: territory.id.clone(),
        territory_name: territory.name.clone(),
        status,
        migration_cost,
        must_pay_cost,
        feasible: reason.is_none(),
        reason,
    }
}

/// Move `player` to the start island of territory `to`.
///
/// The player arrives unanchored and the destination is appended to the
/// visited list the first time.
pub fn migrate(
    player: &Player,
    bars: &[KnowledgeBar],
    current: &Territory,
    territories: &[&Territory],
    to: &TerritoryId,
    config: &EconomyConfig,
) -> Result<PlayerUpdateEvent, GameError> {
    let destination = territories
        .iter()
        .find(|t| &t.id == to)
        .ok_or_else(|| GameError::not_found(Entity::Territory, to))?;
    let check = migrate_check(player, bars, current, territories, config);
    let option = check
        .option(to)
        .ok_or_else(|| GameError::not_found(Entity::Territory, to))?;
    if let Some(reason) = &option.reason {
        return Err(reason.clone().into());
    }

    let resources = if option.must_pay_cost {
        deduct(&player.resources, &option.migration_cost)?
    } else {
        player.resources
    };
    let mut visited = player.visited_territories.clone();
    if !visited.contains(to) {
        visited.push(to.clone());
    }
    let moved = Player {
        territory: destination.id.clone(),
        island: destination.start_island.clone(),
        anchored: false,
        visited_territories: visited,
        ..with_resources(player, resources)
    };
    Ok(PlayerUpdateEvent::new(PlayerUpdateReason::Migration, moved))
}
