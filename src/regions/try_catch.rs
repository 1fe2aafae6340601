//! Try/catch overlay.
//!
//! Handlers are structured like any other code, then grafted onto the
//! finished tree: handlers sharing an identical covered block range become
//! one [`Region::TryCatch`] node wrapping the smallest subtree (or the
//! smallest contiguous slice of a sequence) that contains every covered
//! block. Inner ranges wrap before outer ones so nested protected regions
//! nest in the output, and existing nodes are never reordered.

use std::collections::BTreeSet;

use crate::diag::Diagnostic;
use crate::ir::{BlockId, HandlerId, MethodUnit};
use crate::regions::maker::RegionMaker;
use crate::regions::{HandlerRegion, Region};
use crate::Result;

impl RegionMaker<'_> {
    /// Structures every handler's body, in exception-table order.
    ///
    /// Runs after the normal-flow traversal, so a handler that rejoins
    /// already-claimed code stops there. The handler's own merge with
    /// normal flow is its post-dominator; stopping on it is expected and
    /// leaves no marker.
    pub(crate) fn structure_handlers(&mut self) -> Result<Vec<(HandlerId, Region)>> {
        let mut bodies = Vec::new();
        for info in &self.unit.handlers {
            if info.range.is_empty() {
                self.notes.push(Diagnostic::info(format!(
                    "`{}`: handler at {} covers no blocks, dropped",
                    self.unit.name, info.block
                )));
                bodies.push((info.id, Region::Sequence(Vec::new())));
                continue;
            }
            if self.processed.contains(info.block.index()) {
                self.notes.push(Diagnostic::warning(format!(
                    "`{}`: handler entry {} already claimed by another region",
                    self.unit.name, info.block
                )));
                bodies.push((info.id, Region::Sequence(Vec::new())));
                continue;
            }
            let natural = self.dom.post_idom(info.block);
            let exits: Vec<BlockId> = natural.into_iter().collect();
            self.stack.push(&exits);
            let body = self.traverse_from(info.block, natural);
            self.stack.pop();
            bodies.push((info.id, body?));
        }
        Ok(bodies)
    }
}

struct HandlerGroup {
    range: BTreeSet<usize>,
    handlers: Vec<HandlerRegion>,
}

/// Wraps protected spans of `root` in [`Region::TryCatch`] nodes.
pub(crate) fn overlay(
    unit: &MethodUnit,
    root: Region,
    mut bodies: Vec<(HandlerId, Region)>,
    notes: &mut Vec<Diagnostic>,
) -> Region {
    if unit.handlers.is_empty() {
        return root;
    }

    let mut groups: Vec<HandlerGroup> = Vec::new();
    for info in &unit.handlers {
        if info.range.is_empty() {
            continue;
        }
        let body = bodies
            .iter_mut()
            .find(|(id, _)| *id == info.id)
            .map(|(_, body)| std::mem::replace(body, Region::Sequence(Vec::new())))
            .unwrap_or(Region::Sequence(Vec::new()));
        let handler = HandlerRegion {
            id: info.id,
            catch_type: info.catch_type.clone(),
            body,
        };
        let range: BTreeSet<usize> = info.range.iter().map(|block| block.index()).collect();
        match groups.iter_mut().find(|group| group.range == range) {
            Some(group) => group.handlers.push(handler),
            None => groups.push(HandlerGroup {
                range,
                handlers: vec![handler],
            }),
        }
    }

    // Smaller ranges wrap first so nested protected spans nest inside the
    // wider ones.
    groups.sort_by_key(|group| group.range.len());

    let mut root = root;
    for group in groups {
        let mut pending = Some(group.handlers);
        root = wrap(root, &group.range, &mut pending);
        if let Some(handlers) = pending.take() {
            notes.push(Diagnostic::warning(format!(
                "`{}`: protected range not contiguous in the structured tree, \
                 wrapping the whole method",
                unit.name
            )));
            root = Region::TryCatch {
                body: Box::new(root),
                handlers,
            };
        }
    }
    root
}

/// Recursively wraps the tightest part of `region` containing all of
/// `range`. Consumes `pending` at the wrap point; when it comes back
/// `Some`, no containing subtree was found.
fn wrap(
    region: Region,
    range: &BTreeSet<usize>,
    pending: &mut Option<Vec<HandlerRegion>>,
) -> Region {
    if pending.is_none() || !covers(&region, range) {
        return region;
    }
    match region {
        Region::Sequence(mut children) => {
            let mut first = None;
            let mut last = 0;
            for (index, child) in children.iter().enumerate() {
                if intersects(child, range) {
                    if first.is_none() {
                        first = Some(index);
                    }
                    last = index;
                }
            }
            let Some(first) = first else {
                return wrap_node(Region::Sequence(children), pending);
            };
            if first == last {
                // A single child holds the whole range; wrap deeper.
                let child = children.remove(first);
                children.insert(first, wrap(child, range, pending));
                Region::Sequence(children)
            } else {
                let tail = children.split_off(last + 1);
                let span = children.split_off(first);
                children.push(wrap_node(Region::Sequence(span), pending));
                children.extend(tail);
                Region::Sequence(children)
            }
        }
        Region::If {
            cond,
            op,
            then,
            otherwise,
        } => {
            if covers(&then, range) {
                Region::If {
                    cond,
                    op,
                    then: Box::new(wrap(*then, range, pending)),
                    otherwise,
                }
            } else if otherwise.as_deref().is_some_and(|arm| covers(arm, range)) {
                let otherwise = otherwise.map(|arm| Box::new(wrap(*arm, range, pending)));
                Region::If {
                    cond,
                    op,
                    then,
                    otherwise,
                }
            } else {
                wrap_node(
                    Region::If {
                        cond,
                        op,
                        then,
                        otherwise,
                    },
                    pending,
                )
            }
        }
        Region::Loop {
            id,
            kind,
            header,
            cond,
            body,
        } => {
            if covers(&body, range) {
                Region::Loop {
                    id,
                    kind,
                    header,
                    cond,
                    body: Box::new(wrap(*body, range, pending)),
                }
            } else {
                wrap_node(
                    Region::Loop {
                        id,
                        kind,
                        header,
                        cond,
                        body,
                    },
                    pending,
                )
            }
        }
        Region::Switch {
            header,
            mut cases,
            default,
        } => {
            if let Some(index) = cases.iter().position(|case| covers(&case.body, range)) {
                let body = std::mem::replace(&mut cases[index].body, Region::Sequence(Vec::new()));
                cases[index].body = wrap(body, range, pending);
                Region::Switch {
                    header,
                    cases,
                    default,
                }
            } else if default.as_deref().is_some_and(|arm| covers(arm, range)) {
                let default = default.map(|arm| Box::new(wrap(*arm, range, pending)));
                Region::Switch {
                    header,
                    cases,
                    default,
                }
            } else {
                wrap_node(
                    Region::Switch {
                        header,
                        cases,
                        default,
                    },
                    pending,
                )
            }
        }
        Region::TryCatch { body, handlers } => {
            if covers(&body, range) {
                Region::TryCatch {
                    body: Box::new(wrap(*body, range, pending)),
                    handlers,
                }
            } else {
                wrap_node(Region::TryCatch { body, handlers }, pending)
            }
        }
        other @ (Region::Block(_) | Region::Edge { .. }) => wrap_node(other, pending),
    }
}

fn wrap_node(region: Region, pending: &mut Option<Vec<HandlerRegion>>) -> Region {
    match pending.take() {
        Some(handlers) => Region::TryCatch {
            body: Box::new(region),
            handlers,
        },
        None => region,
    }
}

fn covers(region: &Region, range: &BTreeSet<usize>) -> bool {
    let owned: BTreeSet<usize> = region.block_ids().iter().map(|id| id.index()).collect();
    range.iter().all(|block| owned.contains(block))
}

fn intersects(region: &Region, range: &BTreeSet<usize>) -> bool {
    region
        .block_ids()
        .iter()
        .any(|id| range.contains(&id.index()))
}
