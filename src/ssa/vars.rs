//! SSA variables and the arena that owns them.
//!
//! Register arguments never own variable state; they carry an [`SsaVarId`]
//! into the per-method [`VarArena`], which holds each version's definition
//! site, use list and inferred type. SSA variables that phis tie together
//! share one [`CodeVar`], the unit that eventually gets a source-level
//! name and a single resolved type.

use std::collections::BTreeMap;

use crate::ir::BlockId;
use crate::types::ArgType;

/// Identifies one SSA variable (one version of a register).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SsaVarId(u32);

impl SsaVarId {
    /// Creates an id from its arena position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        SsaVarId(index as u32)
    }

    /// Arena position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies one source-level variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeVarId(u32);

impl CodeVarId {
    /// Creates an id from its arena position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        CodeVarId(index as u32)
    }

    /// Arena position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Position of one instruction inside the block graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsnSite {
    /// Containing block.
    pub block: BlockId,
    /// Index into the block's instruction list.
    pub idx: usize,
}

/// Where an SSA variable gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefSite {
    /// Defined by the method argument with the given index.
    Param(usize),
    /// Used before any definition; kept so malformed input still flows
    /// through the pipeline with a diagnostic instead of aborting it.
    Undefined,
    /// Defined by the instruction at the given site.
    Insn(InsnSite),
}

/// One version of a register.
#[derive(Debug, Clone)]
pub struct SsaVar {
    /// This variable's id.
    pub id: SsaVarId,
    /// Physical register the version belongs to.
    pub reg: u16,
    /// Version number within the register, starting at 0.
    pub version: u32,
    /// Definition site.
    pub def: DefSite,
    /// Instructions reading this version, one entry per reading
    /// instruction.
    pub uses: Vec<InsnSite>,
    /// Inferred type; starts unknown and narrows monotonically.
    pub ty: ArgType,
    /// Source-level variable this version belongs to, set once phi groups
    /// are resolved.
    pub code_var: Option<CodeVarId>,
}

/// One source-level variable: SSA versions united by phis.
#[derive(Debug, Clone)]
pub struct CodeVar {
    /// This variable's id.
    pub id: CodeVarId,
    /// Member SSA versions.
    pub ssa_vars: Vec<SsaVarId>,
    /// Resolved type, once inference finalizes.
    pub ty: ArgType,
    /// Assigned source-level name.
    pub name: Option<String>,
    /// Name recovered from debug info, before validation.
    pub debug_name: Option<String>,
}

/// Owns every SSA and source-level variable of one method.
#[derive(Debug, Default)]
pub struct VarArena {
    ssa: Vec<SsaVar>,
    code: Vec<CodeVar>,
    next_version: BTreeMap<u16, u32>,
}

impl VarArena {
    /// Allocates the next version of `reg` with the given definition site.
    /// Version 0 belongs to method arguments and registers read before any
    /// definition; instruction definitions count from 1.
    pub fn alloc(&mut self, reg: u16, def: DefSite) -> SsaVarId {
        let version = match def {
            DefSite::Param(_) | DefSite::Undefined => 0,
            DefSite::Insn(_) => {
                let next = self.next_version.entry(reg).or_insert(1);
                let version = *next;
                *next += 1;
                version
            }
        };
        let id = SsaVarId::new(self.ssa.len());
        self.ssa.push(SsaVar {
            id,
            reg,
            version,
            def,
            uses: Vec::new(),
            ty: ArgType::UNKNOWN,
            code_var: None,
        });
        id
    }

    /// The variable with the given id.
    #[must_use]
    pub fn var(&self, id: SsaVarId) -> &SsaVar {
        &self.ssa[id.index()]
    }

    /// Mutable access to the variable with the given id.
    #[must_use]
    pub fn var_mut(&mut self, id: SsaVarId) -> &mut SsaVar {
        &mut self.ssa[id.index()]
    }

    /// Records a use of `id` by the instruction at `site`.
    pub fn add_use(&mut self, id: SsaVarId, site: InsnSite) {
        self.ssa[id.index()].uses.push(site);
    }

    /// Number of SSA variables.
    #[must_use]
    pub fn ssa_count(&self) -> usize {
        self.ssa.len()
    }

    /// Iterates all SSA variables in allocation order.
    pub fn ssa_vars(&self) -> impl Iterator<Item = &SsaVar> {
        self.ssa.iter()
    }

    /// Creates a source-level variable from the given SSA versions and
    /// points each member back at it.
    pub fn new_code_var(&mut self, ssa_vars: Vec<SsaVarId>) -> CodeVarId {
        let id = CodeVarId::new(self.code.len());
        for &member in &ssa_vars {
            self.ssa[member.index()].code_var = Some(id);
        }
        self.code.push(CodeVar {
            id,
            ssa_vars,
            ty: ArgType::UNKNOWN,
            name: None,
            debug_name: None,
        });
        id
    }

    /// The source-level variable with the given id.
    #[must_use]
    pub fn code_var(&self, id: CodeVarId) -> &CodeVar {
        &self.code[id.index()]
    }

    /// Mutable access to the source-level variable with the given id.
    #[must_use]
    pub fn code_var_mut(&mut self, id: CodeVarId) -> &mut CodeVar {
        &mut self.code[id.index()]
    }

    /// Number of source-level variables.
    #[must_use]
    pub fn code_count(&self) -> usize {
        self.code.len()
    }

    /// Iterates all source-level variables in creation order.
    pub fn code_vars(&self) -> impl Iterator<Item = &CodeVar> {
        self.code.iter()
    }

    /// Drops all use lists so they can be rebuilt after instructions move.
    pub fn clear_uses(&mut self) {
        for var in &mut self.ssa {
            var.uses.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_bumps_version_per_register() {
        let site = |idx| {
            DefSite::Insn(InsnSite {
                block: BlockId::new(0),
                idx,
            })
        };
        let mut arena = VarArena::default();
        let a = arena.alloc(0, DefSite::Param(0));
        let b = arena.alloc(0, site(0));
        let c = arena.alloc(0, site(1));
        let d = arena.alloc(3, site(2));

        assert_eq!(arena.var(a).version, 0);
        assert_eq!(arena.var(b).version, 1);
        assert_eq!(arena.var(c).version, 2);
        assert_eq!(arena.var(d).version, 1);
        assert_eq!(arena.ssa_count(), 4);
    }

    #[test]
    fn test_version_zero_reserved_for_unset_registers() {
        let mut arena = VarArena::default();
        let first = arena.alloc(
            2,
            DefSite::Insn(InsnSite {
                block: BlockId::new(0),
                idx: 0,
            }),
        );
        let undef = arena.alloc(2, DefSite::Undefined);

        assert_eq!(arena.var(first).version, 1);
        assert_eq!(arena.var(undef).version, 0);
    }

    #[test]
    fn test_uses_accumulate() {
        let mut arena = VarArena::default();
        let v = arena.alloc(1, DefSite::Undefined);
        let site = InsnSite {
            block: BlockId::new(0),
            idx: 2,
        };
        arena.add_use(v, site);
        arena.add_use(v, site);
        assert_eq!(arena.var(v).uses.len(), 2);

        arena.clear_uses();
        assert!(arena.var(v).uses.is_empty());
    }

    #[test]
    fn test_code_var_links_members() {
        let mut arena = VarArena::default();
        let a = arena.alloc(0, DefSite::Undefined);
        let b = arena.alloc(0, DefSite::Undefined);
        let group = arena.new_code_var(vec![a, b]);

        assert_eq!(arena.var(a).code_var, Some(group));
        assert_eq!(arena.var(b).code_var, Some(group));
        assert_eq!(arena.code_var(group).ssa_vars, vec![a, b]);
        assert_eq!(arena.code_count(), 1);
    }
}
