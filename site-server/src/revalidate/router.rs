//! Maps change notifications onto cache invalidation targets.
//!
//! Routing is driven by a `RoutingTable`: one rule for the primary entity
//! table and one rule per child table. `route` performs no I/O and never
//! fails; a notification that maps to nothing yields an empty list.

use serde_json::Value;
use tracing::{debug, info};

use super::types::{ChangeNotification, InvalidationTarget, Operation};

/// Rule for the primary entity table.
#[derive(Debug, Clone)]
pub struct EntityRule {
    pub table: String,
    /// Field holding the URL slug of the detail page
    pub slug_field: String,
    /// Field whose change moves an entity on or off the listing page
    pub status_field: String,
    /// Detail pages live at `{detail_path_prefix}/{slug}`
    pub detail_path_prefix: String,
    pub listing_path: String,
    pub sitemap_path: String,
}

/// Rule for a table whose rows belong to an entity.
#[derive(Debug, Clone)]
pub struct ChildRule {
    pub table: String,
    /// Field holding the owning entity's id
    pub parent_field: String,
}

#[derive(Debug, Clone)]
pub struct RoutingTable {
    pub entity: EntityRule,
    pub children: Vec<ChildRule>,
    /// Child changes invalidate the tag `{tag_prefix}{parent_id}`
    pub tag_prefix: String,
}

/// Child tables of `brokers`, all keyed by `broker_id`.
pub const BROKER_CHILD_TABLES: &[&str] = &[
    "broker_regulations",
    "broker_accounts",
    "broker_products",
    "broker_payment_methods",
    "broker_faqs",
    "broker_pros_cons",
    "broker_content_blocks",
];

/// Cache tag attached to a broker's pages.
pub fn broker_tag(broker_id: &str) -> String {
    format!("broker-{}", broker_id)
}

impl RoutingTable {
    /// The routing table of the broker review site.
    pub fn brokers() -> Self {
        RoutingTable {
            entity: EntityRule {
                table: "brokers".to_string(),
                slug_field: "slug".to_string(),
                status_field: "status".to_string(),
                detail_path_prefix: "/brokers".to_string(),
                listing_path: "/brokers".to_string(),
                sitemap_path: "/sitemap.xml".to_string(),
            },
            children: BROKER_CHILD_TABLES
                .iter()
                .map(|table| ChildRule {
                    table: table.to_string(),
                    parent_field: "broker_id".to_string(),
                })
                .collect(),
            tag_prefix: "broker-".to_string(),
        }
    }

    /// Path of the listing page, used as the manual trigger fallback.
    pub fn listing_path(&self) -> &str {
        &self.entity.listing_path
    }

    /// Compute the invalidation targets for a notification.
    pub fn route(&self, notification: &ChangeNotification) -> Vec<InvalidationTarget> {
        let mut targets = Vec::new();

        if notification.table == self.entity.table {
            self.route_entity(notification, &mut targets);
        } else if let Some(rule) = self.children.iter().find(|c| c.table == notification.table) {
            self.route_child(rule, notification, &mut targets);
        } else {
            info!(table = %notification.table, "webhook_table_unhandled");
        }

        dedup(targets)
    }

    fn route_entity(&self, n: &ChangeNotification, targets: &mut Vec<InvalidationTarget>) {
        let rule = &self.entity;

        match n.operation {
            Operation::Insert | Operation::Update => {
                match n.current(&rule.slug_field).and_then(id_string) {
                    Some(slug) => targets.push(InvalidationTarget::Path(format!(
                        "{}/{}",
                        rule.detail_path_prefix, slug
                    ))),
                    None => info!(
                        table = %n.table,
                        field = %rule.slug_field,
                        "webhook_slug_unresolved"
                    ),
                }

                // Without the previous row there is nothing to compare against.
                if n.operation == Operation::Update && n.previous_record.is_some() {
                    let before = n.previous(&rule.status_field);
                    let after = n.current(&rule.status_field);
                    if before != after {
                        debug!(?before, ?after, "webhook_status_changed");
                        targets.push(InvalidationTarget::path(rule.listing_path.clone()));
                    }
                }
            }
            Operation::Delete => {
                targets.push(InvalidationTarget::path(rule.listing_path.clone()));
            }
        }

        if matches!(n.operation, Operation::Insert | Operation::Delete) {
            targets.push(InvalidationTarget::path(rule.sitemap_path.clone()));
        }
    }

    fn route_child(
        &self,
        rule: &ChildRule,
        n: &ChangeNotification,
        targets: &mut Vec<InvalidationTarget>,
    ) {
        let parent_id = n
            .current(&rule.parent_field)
            .and_then(id_string)
            .or_else(|| n.previous(&rule.parent_field).and_then(id_string));

        match parent_id {
            Some(id) => targets.push(InvalidationTarget::Tag(format!("{}{}", self.tag_prefix, id))),
            None => info!(
                table = %n.table,
                field = %rule.parent_field,
                "webhook_parent_unresolved"
            ),
        }
    }
}

/// Render an id-like JSON value; blank strings and non-scalars resolve to nothing.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn dedup(targets: Vec<InvalidationTarget>) -> Vec<InvalidationTarget> {
    let mut unique: Vec<InvalidationTarget> = Vec::with_capacity(targets.len());
    for target in targets {
        if !unique.contains(&target) {
            unique.push(target);
        }
    }
    unique
}
