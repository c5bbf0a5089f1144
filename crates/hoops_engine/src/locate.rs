//! Boxscore table lookup, as an ordered list of strategies.
//!
//! Each strategy is asked, role by role, for a table not yet claimed by an
//! earlier match. Later strategies only see the roles still missing.

use ego_tree::NodeId;
use scraper::{ElementRef, Html};

use crate::extract::{descendant_elements, is_table};
use crate::Role;

pub trait RoleTableStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Table for `role`, skipping any node in `taken`.
    fn locate<'a>(&self, document: &'a Html, role: Role, taken: &[NodeId])
        -> Option<ElementRef<'a>>;
}

/// A table matched to a role, with the strategy that found it.
#[derive(Debug, Clone, Copy)]
pub struct RoleMatch<'a> {
    pub role: Role,
    pub table: ElementRef<'a>,
    pub strategy: &'static str,
    /// Position of the strategy in the list; zero is the preferred lookup.
    pub tier: usize,
}

/// Runs `strategies` in order until every role has a table.
pub fn locate_role_tables<'a>(
    document: &'a Html,
    strategies: &[Box<dyn RoleTableStrategy>],
) -> Vec<RoleMatch<'a>> {
    let mut found: Vec<RoleMatch<'a>> = Vec::with_capacity(Role::ALL.len());
    for (tier, strategy) in strategies.iter().enumerate() {
        for role in Role::ALL {
            if found.iter().any(|m| m.role == role) {
                continue;
            }
            let taken: Vec<NodeId> = found.iter().map(|m| m.table.id()).collect();
            if let Some(table) = strategy.locate(document, role, &taken) {
                found.push(RoleMatch {
                    role,
                    table,
                    strategy: strategy.name(),
                    tier,
                });
            }
        }
        if found.len() == Role::ALL.len() {
            break;
        }
    }
    found.sort_by_key(|m| Role::ALL.iter().position(|r| *r == m.role));
    found
}

/// Named containers, lookup tiers 1 to 3.
pub fn default_strategies() -> Vec<Box<dyn RoleTableStrategy>> {
    vec![
        Box::new(NamedContainers::default()),
        Box::new(CombinedContainer::default()),
        Box::new(PositionalFallback),
    ]
}

fn element_by_id<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    descendant_elements(document.root_element()).find(|el| el.value().id() == Some(id))
}

fn tables_within<'a>(container: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    descendant_elements(container).filter(is_table)
}

/// One container id per role.
#[derive(Debug, Clone)]
pub struct NamedContainers {
    pub visitors: String,
    pub home: String,
}

impl Default for NamedContainers {
    fn default() -> Self {
        Self {
            visitors: "div_box-score-visitor".to_string(),
            home: "div_box-score-home".to_string(),
        }
    }
}

impl RoleTableStrategy for NamedContainers {
    fn name(&self) -> &'static str {
        "named-containers"
    }

    fn locate<'a>(
        &self,
        document: &'a Html,
        role: Role,
        taken: &[NodeId],
    ) -> Option<ElementRef<'a>> {
        let id = match role {
            Role::Visitors => &self.visitors,
            Role::Home => &self.home,
        };
        let container = element_by_id(document, id)?;
        tables_within(container)
            .next()
            .filter(|table| !taken.contains(&table.id()))
    }
}

/// A single container holding both tables in role order.
#[derive(Debug, Clone)]
pub struct CombinedContainer {
    pub id: String,
}

impl Default for CombinedContainer {
    fn default() -> Self {
        Self {
            id: "div_box-score".to_string(),
        }
    }
}

impl RoleTableStrategy for CombinedContainer {
    fn name(&self) -> &'static str {
        "combined-container"
    }

    fn locate<'a>(
        &self,
        document: &'a Html,
        role: Role,
        taken: &[NodeId],
    ) -> Option<ElementRef<'a>> {
        let container = element_by_id(document, &self.id)?;
        let index = Role::ALL.iter().position(|r| *r == role)?;
        tables_within(container)
            .nth(index)
            .filter(|table| !taken.contains(&table.id()))
    }
}

/// First unclaimed table of the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalFallback;

impl RoleTableStrategy for PositionalFallback {
    fn name(&self) -> &'static str {
        "positional-fallback"
    }

    fn locate<'a>(
        &self,
        document: &'a Html,
        _role: Role,
        taken: &[NodeId],
    ) -> Option<ElementRef<'a>> {
        descendant_elements(document.root_element())
            .filter(is_table)
            .find(|table| !taken.contains(&table.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(matches: &[RoleMatch<'_>]) -> Vec<(Role, &'static str)> {
        matches.iter().map(|m| (m.role, m.strategy)).collect()
    }

    #[test]
    fn named_containers_win() {
        let doc = Html::parse_document(
            r#"<table id="line"></table>
               <div id="div_box-score-home"><table id="h"></table></div>
               <div id="div_box-score-visitor"><table id="v"></table></div>"#,
        );
        let found = locate_role_tables(&doc, &default_strategies());
        assert_eq!(
            roles(&found),
            vec![
                (Role::Visitors, "named-containers"),
                (Role::Home, "named-containers")
            ]
        );
        assert_eq!(found[0].table.value().id(), Some("v"));
        assert_eq!(found[1].table.value().id(), Some("h"));
    }

    #[test]
    fn combined_container_keeps_page_order() {
        let doc = Html::parse_document(
            r#"<div id="div_box-score"><table id="a"></table><table id="b"></table></div>"#,
        );
        let found = locate_role_tables(&doc, &default_strategies());
        assert_eq!(found[0].table.value().id(), Some("a"));
        assert_eq!(found[1].table.value().id(), Some("b"));
        assert!(found.iter().all(|m| m.tier == 1));
    }

    #[test]
    fn fallback_fills_missing_role_with_unclaimed_table() {
        let doc = Html::parse_document(
            r#"<div id="div_box-score-visitor"><table id="v"></table></div>
               <table id="other"></table>"#,
        );
        let found = locate_role_tables(&doc, &default_strategies());
        assert_eq!(
            roles(&found),
            vec![
                (Role::Visitors, "named-containers"),
                (Role::Home, "positional-fallback")
            ]
        );
        assert_eq!(found[1].table.value().id(), Some("other"));
    }
}
