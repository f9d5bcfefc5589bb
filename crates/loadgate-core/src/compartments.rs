//! The agent's fillable compartments as an arena tree.
//!
//! The host reports the vehicle and everything attached to it as a flat
//! list of [`VehicleDescriptor`]s. The tree is rebuilt from that list once
//! per tick and walked iteratively, so no live entity references are held
//! across ticks and implements attached to implements need no recursion.

use std::collections::BTreeMap;

use loadgate_types::{CompartmentSnapshot, EntityId, VehicleDescriptor};
use tracing::debug;

/// Addresses one compartment on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompartmentRef {
    /// The owning entity.
    pub entity: EntityId,
    /// Compartment index on that entity.
    pub index: usize,
}

#[derive(Debug, Clone)]
struct Node {
    entity: EntityId,
    compartments: Vec<CompartmentSnapshot>,
    children: Vec<usize>,
}

/// Arena of the agent's vehicle and attachments.
#[derive(Debug, Clone, Default)]
pub struct CompartmentTree {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    by_entity: BTreeMap<EntityId, usize>,
}

impl CompartmentTree {
    /// Build the tree. Descriptors whose parent is unknown are treated as
    /// roots; duplicate entities keep their first descriptor.
    pub fn build(descriptors: Vec<VehicleDescriptor>) -> Self {
        let mut tree = Self::default();
        let mut parents = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if tree.by_entity.contains_key(&descriptor.entity) {
                debug!(entity = %descriptor.entity, "Duplicate vehicle descriptor ignored");
                continue;
            }
            let slot = tree.nodes.len();
            tree.by_entity.insert(descriptor.entity, slot);
            parents.push(descriptor.parent);
            tree.nodes.push(Node {
                entity: descriptor.entity,
                compartments: descriptor.compartments,
                children: Vec::new(),
            });
        }

        for (slot, parent) in parents.into_iter().enumerate() {
            let parent_slot = parent
                .and_then(|p| tree.by_entity.get(&p).copied())
                .filter(|&p| p != slot);
            match parent_slot.and_then(|p| tree.nodes.get_mut(p)) {
                Some(parent_node) => parent_node.children.push(slot),
                None => tree.roots.push(slot),
            }
        }
        tree
    }

    /// Whether the agent has no fillable entity at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the entity belongs to the agent.
    pub fn contains_entity(&self, entity: EntityId) -> bool {
        self.by_entity.contains_key(&entity)
    }

    /// Look up a compartment.
    pub fn get(&self, at: CompartmentRef) -> Option<&CompartmentSnapshot> {
        let slot = *self.by_entity.get(&at.entity)?;
        self.nodes
            .get(slot)?
            .compartments
            .iter()
            .find(|c| c.index == at.index)
    }

    /// Compartments of a single entity.
    pub fn compartments_of(&self, entity: EntityId) -> &[CompartmentSnapshot] {
        self.by_entity
            .get(&entity)
            .and_then(|&slot| self.nodes.get(slot))
            .map_or(&[], |n| n.compartments.as_slice())
    }

    /// Every compartment, depth-first from the root vehicle, children in
    /// attachment order. A cyclic parent chain is visited once.
    pub fn depth_first(&self) -> Vec<(CompartmentRef, &CompartmentSnapshot)> {
        let mut out = Vec::new();
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();

        // Nodes caught in a parent cycle have no root; append them last.
        let mut pending_orphans = true;
        loop {
            while let Some(slot) = stack.pop() {
                let Some(seen) = visited.get_mut(slot) else {
                    continue;
                };
                if *seen {
                    continue;
                }
                *seen = true;
                let Some(node) = self.nodes.get(slot) else {
                    continue;
                };
                for c in &node.compartments {
                    out.push((
                        CompartmentRef {
                            entity: node.entity,
                            index: c.index,
                        },
                        c,
                    ));
                }
                stack.extend(node.children.iter().rev().copied());
            }
            if !pending_orphans {
                break;
            }
            pending_orphans = false;
            stack.extend(
                visited
                    .iter()
                    .enumerate()
                    .filter(|(_, seen)| !**seen)
                    .map(|(slot, _)| slot)
                    .rev(),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use loadgate_types::MaterialType;
    use rust_decimal_macros::dec;

    use super::*;

    fn comp(index: usize) -> CompartmentSnapshot {
        CompartmentSnapshot {
            index,
            capacity: dec!(100),
            level: dec!(0),
            material: None,
            supported: vec![MaterialType::from("WHEAT")],
            cover_closing: false,
        }
    }

    fn vehicle(entity: EntityId, parent: Option<EntityId>, n: usize) -> VehicleDescriptor {
        VehicleDescriptor {
            entity,
            parent,
            compartments: (0..n).map(comp).collect(),
        }
    }

    #[test]
    fn walks_nested_implements_depth_first() {
        let tractor = EntityId::new();
        let trailer_a = EntityId::new();
        let trailer_b = EntityId::new();
        let dolly = EntityId::new();
        // Listed out of order on purpose.
        let tree = CompartmentTree::build(vec![
            vehicle(dolly, Some(trailer_a), 1),
            vehicle(trailer_b, Some(tractor), 1),
            vehicle(tractor, None, 1),
            vehicle(trailer_a, Some(tractor), 2),
        ]);

        let order: Vec<(EntityId, usize)> = tree
            .depth_first()
            .into_iter()
            .map(|(r, _)| (r.entity, r.index))
            .collect();
        assert_eq!(
            order,
            vec![
                (tractor, 0),
                (trailer_b, 0),
                (trailer_a, 0),
                (trailer_a, 1),
                (dolly, 0),
            ]
        );
    }

    #[test]
    fn lookup_by_ref() {
        let tractor = EntityId::new();
        let tree = CompartmentTree::build(vec![vehicle(tractor, None, 2)]);
        assert!(tree.get(CompartmentRef { entity: tractor, index: 1 }).is_some());
        assert!(tree.get(CompartmentRef { entity: tractor, index: 2 }).is_none());
        assert!(tree.get(CompartmentRef { entity: EntityId::new(), index: 0 }).is_none());
        assert_eq!(tree.compartments_of(tractor).len(), 2);
    }

    #[test]
    fn cyclic_parents_are_visited_once() {
        let a = EntityId::new();
        let b = EntityId::new();
        let tree = CompartmentTree::build(vec![vehicle(a, Some(b), 1), vehicle(b, Some(a), 1)]);
        assert_eq!(tree.depth_first().len(), 2);
    }

    #[test]
    fn unknown_parent_becomes_root() {
        let a = EntityId::new();
        let tree = CompartmentTree::build(vec![vehicle(a, Some(EntityId::new()), 1)]);
        assert_eq!(tree.depth_first().len(), 1);
        assert!(tree.contains_entity(a));
    }
}
