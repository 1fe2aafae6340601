//! Fixed-point type propagation.
//!
//! The engine folds each variable's seeded bounds together with the
//! current types of its move/phi neighbors, requeueing neighbors whenever
//! a variable's type changes. Definition bounds fold first so a concrete
//! producer outranks a weaker consumer requirement. A bound that cannot
//! merge is skipped and reported once per variable; the variable keeps
//! the last bound that did merge.
//!
//! Variables that a pathological bound mix keeps flip-flopping are frozen
//! after a fixed number of changes so the worklist always drains.

use std::collections::VecDeque;

use crate::diag::Diagnostic;
use crate::ir::MethodUnit;
use crate::ssa::{CodeVarId, SsaVarId};
use crate::typeinf::bounds::{collect_bounds, TypeBounds};
use crate::types::{ArgType, TypeHierarchy};
use crate::utils::BitSet;

/// Changes one variable may go through before it is frozen.
const CHANGE_LIMIT: u8 = 20;

/// Resolves a type for every SSA and source-level variable of the unit.
///
/// Conflicts and unresolved variables degrade to diagnostics, never to
/// errors: downstream passes always receive a usable type.
pub fn infer_types(unit: &mut MethodUnit, clsp: &dyn TypeHierarchy) {
    let bounds = collect_bounds(unit);
    let count = unit.arena.ssa_count();
    let mut current: Vec<ArgType> = vec![ArgType::UNKNOWN; count];
    let mut conflicts: Vec<Option<(ArgType, ArgType)>> = vec![None; count];
    let mut changes = vec![0u8; count];
    let mut frozen = BitSet::with_capacity(count);

    let mut queue: VecDeque<usize> = (0..count).collect();
    let mut queued = BitSet::with_capacity(count);
    for index in 0..count {
        queued.insert(index);
    }

    while let Some(index) = queue.pop_front() {
        queued.remove(index);
        if frozen.contains(index) {
            continue;
        }

        let mut ty = ArgType::UNKNOWN;
        let mut conflict: Option<(ArgType, ArgType)> = None;
        for bound in bounds.assigns[index].iter().chain(bounds.uses[index].iter()) {
            merge_into(&mut ty, bound, clsp, &mut conflict);
        }
        for neighbor in &bounds.neighbors[index] {
            let neighbor_ty = current[neighbor.index()].clone();
            merge_into(&mut ty, &neighbor_ty, clsp, &mut conflict);
        }
        if conflicts[index].is_none() {
            conflicts[index] = conflict;
        }

        if ty != current[index] {
            changes[index] += 1;
            if changes[index] > CHANGE_LIMIT {
                frozen.insert(index);
                continue;
            }
            current[index] = ty;
            for neighbor in &bounds.neighbors[index] {
                let n = neighbor.index();
                if !queued.contains(n) && !frozen.contains(n) {
                    queued.insert(n);
                    queue.push_back(n);
                }
            }
        }
    }

    finalize(unit, &bounds, current, &conflicts, &frozen, clsp);
}

fn merge_into(
    acc: &mut ArgType,
    bound: &ArgType,
    clsp: &dyn TypeHierarchy,
    conflict: &mut Option<(ArgType, ArgType)>,
) {
    match acc.merge(bound, clsp) {
        Some(merged) => *acc = merged,
        None => {
            if conflict.is_none() {
                *conflict = Some((acc.clone(), bound.clone()));
            }
        }
    }
}

fn finalize(
    unit: &mut MethodUnit,
    bounds: &TypeBounds,
    mut current: Vec<ArgType>,
    conflicts: &[Option<(ArgType, ArgType)>],
    frozen: &BitSet,
    clsp: &dyn TypeHierarchy,
) {
    let mut notes: Vec<Diagnostic> = Vec::new();
    for index in 0..current.len() {
        let var = unit.arena.var(SsaVarId::new(index));
        if let Some((a, b)) = &conflicts[index] {
            notes.push(Diagnostic::warning(format!(
                "type conflict on v{}_{} in `{}`: {} does not merge with {}",
                var.reg, var.version, unit.name, a, b
            )));
        }
        if frozen.contains(index) {
            notes.push(Diagnostic::warning(format!(
                "type inference did not settle for v{}_{} in `{}`, keeping {}",
                var.reg, var.version, unit.name, current[index]
            )));
        }
        if !current[index].is_resolved() {
            let picked = current[index].select_canonical();
            // Skip the note for versions nothing constrains at all; an
            // untouched register says nothing interesting.
            let constrained = !bounds.assigns[index].is_empty()
                || !bounds.uses[index].is_empty()
                || !bounds.neighbors[index].is_empty();
            if constrained {
                notes.push(Diagnostic::info(format!(
                    "type of v{}_{} in `{}` only narrowed to {}, using {}",
                    var.reg, var.version, unit.name, current[index], picked
                )));
            }
            current[index] = picked;
        }
    }
    for (index, ty) in current.into_iter().enumerate() {
        unit.arena.var_mut(SsaVarId::new(index)).ty = ty;
    }
    unit.diagnostics.append(&mut notes);

    resolve_code_vars(unit, clsp);
}

/// Folds member types into each source-level variable. Members whose
/// types refuse to merge split off into variables of their own so one
/// display name never spans incompatible types.
fn resolve_code_vars(unit: &mut MethodUnit, clsp: &dyn TypeHierarchy) {
    let original = unit.arena.code_count();
    for idx in 0..original {
        let id = CodeVarId::new(idx);
        let members = unit.arena.code_var(id).ssa_vars.clone();

        let mut classes: Vec<(ArgType, Vec<SsaVarId>)> = Vec::new();
        for member in members {
            let ty = unit.arena.var(member).ty.clone();
            let mut placed = false;
            for (class_ty, class_members) in &mut classes {
                if let Some(merged) = class_ty.merge(&ty, clsp) {
                    *class_ty = merged;
                    class_members.push(member);
                    placed = true;
                    break;
                }
            }
            if !placed {
                classes.push((ty, vec![member]));
            }
        }
        if classes.is_empty() {
            continue;
        }

        let (first_ty, first_members) = classes.remove(0);
        {
            let var = unit.arena.code_var_mut(id);
            var.ty = first_ty.select_canonical();
            var.ssa_vars = first_members;
        }
        for (ty, members) in classes {
            unit.warn(format!(
                "splitting a variable in `{}`: {} does not merge with {}",
                unit.name, ty, first_ty
            ));
            let split = unit.arena.new_code_var(members);
            unit.arena.code_var_mut(split).ty = ty.select_canonical();
        }
    }
}
