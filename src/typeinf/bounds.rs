//! Type bound seeding.
//!
//! Every SSA variable collects bounds from the instructions that define
//! and use it: a definition bound states what the producing instruction
//! guarantees, a use bound states what a consuming instruction requires.
//! Moves and phis contribute no bound of their own; they connect their
//! variables as neighbors so the engine can flow bounds through them in
//! both directions.

use crate::ir::{InsnArg, InsnKind, Instruction, InvokeKind, MethodUnit};
use crate::ssa::{DefSite, SsaVarId};
use crate::types::{ArgType, KindSet, CLASS_CLASS, STRING_CLASS, THROWABLE_CLASS};

/// Seeded bounds and propagation edges for one method.
pub(crate) struct TypeBounds {
    /// Definition bounds, strongest first in merge order.
    pub(crate) assigns: Vec<Vec<ArgType>>,
    /// Use bounds; weaker, folded after the definition bounds.
    pub(crate) uses: Vec<Vec<ArgType>>,
    /// Identity edges from moves and phis, symmetric.
    pub(crate) neighbors: Vec<Vec<SsaVarId>>,
}

impl TypeBounds {
    fn new(count: usize) -> Self {
        TypeBounds {
            assigns: vec![Vec::new(); count],
            uses: vec![Vec::new(); count],
            neighbors: vec![Vec::new(); count],
        }
    }

    fn assign(&mut self, insn: &Instruction, ty: ArgType) {
        if let Some(id) = insn.result.as_ref().and_then(|r| r.ssa) {
            self.assigns[id.index()].push(ty);
        }
    }

    fn use_at(&mut self, insn: &Instruction, index: usize, ty: ArgType) {
        if let Some(id) = reg_at(insn, index) {
            self.uses[id.index()].push(ty);
        }
    }

    fn link(&mut self, a: Option<SsaVarId>, b: Option<SsaVarId>) {
        let (Some(a), Some(b)) = (a, b) else {
            return;
        };
        if a == b || self.neighbors[a.index()].contains(&b) {
            return;
        }
        self.neighbors[a.index()].push(b);
        self.neighbors[b.index()].push(a);
    }
}

fn reg_at(insn: &Instruction, index: usize) -> Option<SsaVarId> {
    insn.args.get(index).and_then(InsnArg::as_reg).and_then(|r| r.ssa)
}

/// Admissible kinds for a narrow constant, refined by the literal value:
/// only 0 can be a null reference and only 0 or 1 a boolean, while the
/// integral sub-kinds must fit their value range.
fn const_narrow_bound(value: i64) -> KindSet {
    let mut set = KindSet::INT | KindSet::FLOAT;
    if value == 0 || value == 1 {
        set |= KindSet::BOOLEAN;
    }
    if i8::try_from(value).is_ok() {
        set |= KindSet::BYTE;
    }
    if i16::try_from(value).is_ok() {
        set |= KindSet::SHORT;
    }
    if u16::try_from(value).is_ok() {
        set |= KindSet::CHAR;
    }
    if value == 0 {
        set |= KindSet::REFS;
    }
    set
}

/// Collects bounds for every SSA variable of the unit.
pub(crate) fn collect_bounds(unit: &MethodUnit) -> TypeBounds {
    let mut bounds = TypeBounds::new(unit.arena.ssa_count());

    // Declared argument types pin the parameter versions.
    for var in unit.arena.ssa_vars() {
        if let DefSite::Param(index) = var.def {
            if let Some(ty) = unit.arg_types.get(index) {
                bounds.assigns[var.id.index()].push(ty.clone());
            }
        }
    }

    for block in &unit.blocks {
        for insn in &block.insns {
            seed_decoded(insn, &mut bounds);
            seed_insn(unit, insn, &mut bounds);
        }
    }
    bounds
}

/// Folds in type bindings recorded on the register arguments themselves.
///
/// A front-end that already knows a register's type at decode time carries
/// it on the argument; it ranks like any other bound.
fn seed_decoded(insn: &Instruction, bounds: &mut TypeBounds) {
    if let Some(result) = &insn.result {
        if result.ty != ArgType::UNKNOWN {
            bounds.assign(insn, result.ty.clone());
        }
    }
    insn.visit_uses(&mut |arg| {
        if arg.ty == ArgType::UNKNOWN {
            return;
        }
        if let Some(id) = arg.ssa {
            bounds.uses[id.index()].push(arg.ty.clone());
        }
    });
}

fn seed_insn(unit: &MethodUnit, insn: &Instruction, bounds: &mut TypeBounds) {
    match &insn.kind {
        InsnKind::Move => {
            let result = insn.result.as_ref().and_then(|r| r.ssa);
            bounds.link(result, reg_at(insn, 0));
        }
        InsnKind::Phi => {
            let result = insn.result.as_ref().and_then(|r| r.ssa);
            for index in 0..insn.args.len() {
                bounds.link(result, reg_at(insn, index));
            }
        }
        InsnKind::Const { value, wide } => {
            let ty = if *wide {
                ArgType::WIDE
            } else {
                ArgType::Unknown(const_narrow_bound(*value))
            };
            bounds.assign(insn, ty);
        }
        InsnKind::ConstString { .. } => bounds.assign(insn, ArgType::object(STRING_CLASS)),
        InsnKind::ConstClass { class } => bounds.assign(
            insn,
            ArgType::generic(CLASS_CLASS, vec![ArgType::object(class.clone())]),
        ),
        InsnKind::Arith { op, wide } => {
            if op.is_shift() {
                let value_ty = if *wide { ArgType::LONG } else { ArgType::INT };
                bounds.assign(insn, value_ty.clone());
                bounds.use_at(insn, 0, value_ty);
                bounds.use_at(insn, 1, ArgType::INT);
            } else {
                let ty = match (op.is_bitwise(), *wide) {
                    (true, true) => ArgType::LONG,
                    (true, false) => ArgType::Unknown(KindSet::INT | KindSet::BOOLEAN),
                    (false, true) => ArgType::WIDE,
                    (false, false) => ArgType::Unknown(KindSet::INT | KindSet::FLOAT),
                };
                bounds.assign(insn, ty.clone());
                bounds.use_at(insn, 0, ty.clone());
                bounds.use_at(insn, 1, ty);
            }
        }
        InsnKind::Neg { wide } => {
            let ty = if *wide {
                ArgType::WIDE
            } else {
                ArgType::Unknown(KindSet::INT | KindSet::FLOAT)
            };
            bounds.assign(insn, ty.clone());
            bounds.use_at(insn, 0, ty);
        }
        InsnKind::Cmp => {
            bounds.assign(insn, ArgType::INT);
            let operand = ArgType::Unknown(KindSet::FLOAT | KindSet::WIDE);
            bounds.use_at(insn, 0, operand.clone());
            bounds.use_at(insn, 1, operand);
        }
        InsnKind::Switch { .. } => bounds.use_at(insn, 0, ArgType::INT),
        InsnKind::Invoke { kind, method } => {
            bounds.assign(insn, method.ret.clone());
            let offset = if *kind == InvokeKind::Static {
                0
            } else {
                bounds.use_at(insn, 0, ArgType::object(method.owner.clone()));
                1
            };
            for (index, param) in method.params.iter().enumerate() {
                bounds.use_at(insn, offset + index, param.clone());
            }
        }
        InsnKind::Return => {
            if unit.ret_type != ArgType::VOID {
                bounds.use_at(insn, 0, unit.ret_type.clone());
            }
        }
        InsnKind::Throw => bounds.use_at(insn, 0, ArgType::object(THROWABLE_CLASS)),
        InsnKind::New { class } => bounds.assign(insn, ArgType::object(class.clone())),
        InsnKind::NewArray { element } => {
            bounds.assign(insn, ArgType::array(element.clone()));
            bounds.use_at(insn, 0, ArgType::INT);
        }
        InsnKind::ArrayGet { element } => {
            bounds.assign(insn, element.clone());
            bounds.use_at(insn, 0, ArgType::array(element.clone()));
            bounds.use_at(insn, 1, ArgType::INT);
        }
        InsnKind::ArrayPut { element } => {
            bounds.use_at(insn, 0, element.clone());
            bounds.use_at(insn, 1, ArgType::array(element.clone()));
            bounds.use_at(insn, 2, ArgType::INT);
        }
        InsnKind::ArrayLength => {
            bounds.assign(insn, ArgType::INT);
            bounds.use_at(insn, 0, ArgType::Unknown(KindSet::ARRAY));
        }
        InsnKind::FieldGet { field } => {
            bounds.assign(insn, field.ty.clone());
            bounds.use_at(insn, 0, ArgType::object(field.owner.clone()));
        }
        InsnKind::FieldPut { field } => {
            bounds.use_at(insn, 0, field.ty.clone());
            bounds.use_at(insn, 1, ArgType::object(field.owner.clone()));
        }
        InsnKind::CheckCast { to } => {
            bounds.assign(insn, to.clone());
            bounds.use_at(insn, 0, ArgType::Unknown(KindSet::REFS));
        }
        InsnKind::PrimCast { to } => {
            bounds.assign(insn, ArgType::Primitive(*to));
            // Any numeric except boolean converts.
            bounds.use_at(
                insn,
                0,
                ArgType::Unknown(
                    KindSet::NARROW_NUMBERS.difference(KindSet::BOOLEAN) | KindSet::WIDE,
                ),
            );
        }
        InsnKind::MonitorEnter | InsnKind::MonitorExit => {
            bounds.use_at(insn, 0, ArgType::Unknown(KindSet::REFS));
        }
        // Comparisons against zero accept references and every narrow
        // primitive, so they constrain nothing.
        InsnKind::Nop | InsnKind::Goto { .. } | InsnKind::If { .. } => {}
    }
}
