//! Method bodies and the per-method analysis unit.
//!
//! [`MethodBody`] is the front-end handoff: a flat instruction stream with
//! its exception table and optional debug info. [`MethodUnit`] is the same
//! method once analysis owns it: block graph, dominators, loops, SSA
//! variable arena and the diagnostics gathered along the way. A unit is
//! confined to the worker processing it, so nothing here synchronizes.

use crate::cfg::DominatorInfo;
use crate::diag::Diagnostic;
use crate::ir::{BasicBlock, BlockId, HandlerId, Instruction, LoopId};
use crate::regions::Region;
use crate::ssa::VarArena;
use crate::types::ArgType;
use crate::utils::BitSet;

/// One row of the exception table.
///
/// Offsets use the half-open convention: the entry covers instruction
/// offsets in `[start_offset, end_offset)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionEntry {
    /// First covered offset.
    pub start_offset: u32,
    /// First offset past the covered range.
    pub end_offset: u32,
    /// Offset of the handler's first instruction.
    pub handler_offset: u32,
    /// Caught class, or `None` for a catch-all.
    pub catch_type: Option<String>,
}

/// A named local variable range from debug info.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarInfo {
    /// Register the variable occupied.
    pub reg: u16,
    /// Source-level name.
    pub name: String,
    /// Declared type, when the debug info carries one.
    pub ty: Option<ArgType>,
    /// First offset at which the name applies.
    pub start_offset: u32,
    /// First offset past the named range.
    pub end_offset: u32,
}

/// Optional debug tables decoded alongside the instructions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugInfo {
    /// `(offset, source line)` pairs in offset order.
    pub source_lines: Vec<(u32, u32)>,
    /// Named local variable ranges.
    pub locals: Vec<LocalVarInfo>,
}

/// A decoded method body, ready for analysis.
///
/// Registers are abstract slots: wide values occupy a single slot, and the
/// method's arguments occupy the highest-numbered slots in declaration
/// order.
#[derive(Debug, Clone)]
pub struct MethodBody {
    /// Method name, used in diagnostics.
    pub name: String,
    /// Instruction stream in offset order.
    pub insns: Vec<Instruction>,
    /// Total register slots, arguments included.
    pub regs_count: u16,
    /// Declared return type.
    pub ret_type: ArgType,
    /// Declared argument types, receiver included for instance methods.
    pub arg_types: Vec<ArgType>,
    /// Exception table rows, outermost first.
    pub exceptions: Vec<ExceptionEntry>,
    /// Debug tables, when present.
    pub debug: Option<DebugInfo>,
}

impl MethodBody {
    /// Starts building a body for the named method.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> MethodBodyBuilder {
        MethodBodyBuilder {
            body: MethodBody {
                name: name.into(),
                insns: Vec::new(),
                regs_count: 0,
                ret_type: ArgType::VOID,
                arg_types: Vec::new(),
                exceptions: Vec::new(),
                debug: None,
            },
        }
    }

    /// Register slot holding the `index`-th argument.
    #[must_use]
    pub fn arg_reg(&self, index: usize) -> u16 {
        let first = self.regs_count as usize - self.arg_types.len();
        (first + index) as u16
    }
}

/// Builds a [`MethodBody`] instruction by instruction.
///
/// Each appended instruction is assigned the next sequential offset, so
/// branch targets equal instruction indices. Front-ends with real byte
/// offsets pre-set them with [`Instruction::at`] before appending.
#[derive(Debug)]
pub struct MethodBodyBuilder {
    body: MethodBody,
}

impl MethodBodyBuilder {
    /// Sets the total register slot count.
    #[must_use]
    pub fn regs(mut self, count: u16) -> Self {
        self.body.regs_count = count;
        self
    }

    /// Sets the declared argument types.
    #[must_use]
    pub fn args(mut self, types: &[ArgType]) -> Self {
        self.body.arg_types = types.to_vec();
        self
    }

    /// Sets the declared return type.
    #[must_use]
    pub fn ret(mut self, ty: ArgType) -> Self {
        self.body.ret_type = ty;
        self
    }

    /// Appends an instruction, assigning the next sequential offset unless
    /// one was already set.
    #[must_use]
    pub fn insn(mut self, mut insn: Instruction) -> Self {
        if insn.offset == crate::ir::SYNTHETIC_OFFSET {
            insn.offset = self.body.insns.len() as u32;
        }
        self.body.insns.push(insn);
        self
    }

    /// Adds an exception table row covering `[start, end)`.
    #[must_use]
    pub fn catch(
        mut self,
        start: u32,
        end: u32,
        handler: u32,
        catch_type: Option<&str>,
    ) -> Self {
        self.body.exceptions.push(ExceptionEntry {
            start_offset: start,
            end_offset: end,
            handler_offset: handler,
            catch_type: catch_type.map(str::to_owned),
        });
        self
    }

    /// Adds a named local variable range to the debug tables.
    #[must_use]
    pub fn local(
        mut self,
        reg: u16,
        name: &str,
        ty: Option<ArgType>,
        start: u32,
        end: u32,
    ) -> Self {
        self.body
            .debug
            .get_or_insert_with(DebugInfo::default)
            .locals
            .push(LocalVarInfo {
                reg,
                name: name.to_owned(),
                ty,
                start_offset: start,
                end_offset: end,
            });
        self
    }

    /// Finishes the body.
    #[must_use]
    pub fn build(self) -> MethodBody {
        self.body
    }
}

/// One resolved exception handler.
///
/// Each exception table row becomes one handler; rows sharing a handler
/// offset share the handler block but keep separate catch types.
#[derive(Debug, Clone)]
pub struct ExcHandlerInfo {
    /// This handler's id.
    pub id: HandlerId,
    /// Entry block of the handler code.
    pub block: BlockId,
    /// Caught class, or `None` for a catch-all.
    pub catch_type: Option<String>,
    /// First covered offset.
    pub start_offset: u32,
    /// First offset past the covered range.
    pub end_offset: u32,
    /// Blocks inside the covered range.
    pub range: Vec<BlockId>,
}

/// One natural loop.
#[derive(Debug, Clone)]
pub struct LoopInfo {
    /// This loop's id.
    pub id: LoopId,
    /// Header block; every back edge targets it.
    pub header: BlockId,
    /// Back-edge source blocks.
    pub back_edges: Vec<BlockId>,
    /// Blocks in the loop body, header included.
    pub body: BitSet,
    /// Nesting depth, outermost loops at 1.
    pub depth: u32,
}

impl LoopInfo {
    /// Returns `true` when the block belongs to this loop.
    #[must_use]
    pub fn contains(&self, block: BlockId) -> bool {
        self.body.contains(block.index())
    }
}

/// A method under analysis.
pub struct MethodUnit {
    /// Method name, used in diagnostics.
    pub name: String,
    /// Total register slots, arguments included.
    pub regs_count: u16,
    /// Declared return type.
    pub ret_type: ArgType,
    /// Declared argument types.
    pub arg_types: Vec<ArgType>,
    /// Original instruction stream; retained so fallback output can be
    /// produced even when the block graph could not be built.
    pub raw_insns: Vec<Instruction>,
    /// Exception table as decoded.
    pub exceptions: Vec<ExceptionEntry>,
    /// Debug tables, when present.
    pub debug: Option<DebugInfo>,
    /// Basic blocks, indexed by [`BlockId`].
    pub blocks: Vec<BasicBlock>,
    /// Entry block.
    pub entry: BlockId,
    /// Resolved exception handlers.
    pub handlers: Vec<ExcHandlerInfo>,
    /// Natural loops, outermost first.
    pub loops: Vec<LoopInfo>,
    /// Dominator and post-dominator data, once computed.
    pub dominators: Option<DominatorInfo>,
    /// SSA variable arena.
    pub arena: VarArena,
    /// Structured output, once built.
    pub region: Option<Region>,
    /// Problems recorded while processing this unit.
    pub diagnostics: Vec<Diagnostic>,
    /// Set when structuring abandoned region output for this unit.
    pub fallback: bool,
}

impl MethodUnit {
    /// Wraps a decoded body for analysis.
    #[must_use]
    pub fn new(body: MethodBody) -> Self {
        MethodUnit {
            name: body.name,
            regs_count: body.regs_count,
            ret_type: body.ret_type,
            arg_types: body.arg_types,
            raw_insns: body.insns,
            exceptions: body.exceptions,
            debug: body.debug,
            blocks: Vec::new(),
            entry: BlockId::new(0),
            handlers: Vec::new(),
            loops: Vec::new(),
            dominators: None,
            arena: VarArena::default(),
            region: None,
            diagnostics: Vec::new(),
            fallback: false,
        }
    }

    /// The block with the given id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    /// Mutable access to the block with the given id.
    #[must_use]
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    /// Appends an empty block and returns its id.
    pub fn add_block(&mut self, start_offset: u32) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(BasicBlock::new(id, start_offset));
        id
    }

    /// Ids of all blocks, in index order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len()).map(BlockId::new)
    }

    /// Register slot holding the `index`-th argument.
    #[must_use]
    pub fn arg_reg(&self, index: usize) -> u16 {
        let first = self.regs_count as usize - self.arg_types.len();
        (first + index) as u16
    }

    /// Argument index occupying the given register slot, if any.
    #[must_use]
    pub fn arg_index(&self, reg: u16) -> Option<usize> {
        let first = self.regs_count as usize - self.arg_types.len();
        (reg as usize >= first).then(|| reg as usize - first)
    }

    /// Adds a normal edge from `from` to `to`.
    ///
    /// Duplicate edges collapse to one: phi arguments pair with
    /// predecessor entries, so each pair of blocks carries at most one
    /// edge even when several branch cases share a target.
    pub fn connect(&mut self, from: BlockId, to: BlockId) {
        let succs = &mut self.blocks[from.index()].succs;
        if !succs.contains(&to) {
            succs.push(to);
            self.blocks[to.index()].preds.push(from);
        }
    }

    /// Adds an exceptional edge from `from` to the handler entry `to`.
    pub fn connect_exc(&mut self, from: BlockId, to: BlockId) {
        let succs = &mut self.blocks[from.index()].exc_succs;
        if !succs.contains(&to) {
            succs.push(to);
            self.blocks[to.index()].exc_preds.push(from);
        }
    }

    /// Removes the normal edge from `from` to `to`, if present.
    pub fn disconnect(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.index()].succs.retain(|&s| s != to);
        self.blocks[to.index()].preds.retain(|&p| p != from);
    }

    /// Redirects the normal edge `from -> to` to point at `via` instead,
    /// keeping the edge's position in the successor list.
    ///
    /// When `from` already has an edge to `via`, the redirected edge
    /// collapses into it rather than duplicating it.
    pub fn redirect_edge(&mut self, from: BlockId, to: BlockId, via: BlockId) {
        self.blocks[to.index()].preds.retain(|&p| p != from);
        let succs = &mut self.blocks[from.index()].succs;
        if succs.contains(&via) {
            succs.retain(|&s| s != to);
        } else {
            for succ in succs.iter_mut() {
                if *succ == to {
                    *succ = via;
                }
            }
            self.blocks[via.index()].preds.push(from);
        }
    }

    /// Drops every block whose bit is clear in `keep`, renumbering the
    /// rest and rewriting edges, handler references and the entry id.
    ///
    /// Handlers whose entry block is dropped are removed with it.
    pub fn retain_blocks(&mut self, keep: &BitSet) {
        let mut remap: Vec<Option<BlockId>> = vec![None; self.blocks.len()];
        let mut next = 0usize;
        for old in 0..self.blocks.len() {
            if keep.contains(old) {
                remap[old] = Some(BlockId::new(next));
                next += 1;
            }
        }
        let map = |id: BlockId| remap[id.index()];

        let old_blocks = std::mem::take(&mut self.blocks);
        for mut block in old_blocks {
            let Some(new_id) = map(block.id) else {
                continue;
            };
            block.id = new_id;
            block.preds.retain_mut(|p| match map(*p) {
                Some(id) => {
                    *p = id;
                    true
                }
                None => false,
            });
            block.succs.retain_mut(|s| match map(*s) {
                Some(id) => {
                    *s = id;
                    true
                }
                None => false,
            });
            block.exc_preds.retain_mut(|p| match map(*p) {
                Some(id) => {
                    *p = id;
                    true
                }
                None => false,
            });
            block.exc_succs.retain_mut(|s| match map(*s) {
                Some(id) => {
                    *s = id;
                    true
                }
                None => false,
            });
            for attr in &mut block.attrs {
                if let crate::ir::BlockAttr::SplitterOf(target) = attr {
                    if let Some(id) = map(*target) {
                        *target = id;
                    }
                }
            }
            self.blocks.push(block);
        }

        if let Some(entry) = map(self.entry) {
            self.entry = entry;
        }

        self.handlers.retain_mut(|handler| match map(handler.block) {
            Some(id) => {
                handler.block = id;
                handler.range.retain_mut(|b| match map(*b) {
                    Some(id) => {
                        *b = id;
                        true
                    }
                    None => false,
                });
                true
            }
            None => false,
        });
    }

    /// Records a recovered problem.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::warning(message));
    }

    /// Records an unrecovered problem.
    pub fn error(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(message));
    }
}

impl std::fmt::Debug for MethodUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodUnit")
            .field("name", &self.name)
            .field("blocks", &self.blocks.len())
            .field("loops", &self.loops.len())
            .field("handlers", &self.handlers.len())
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}
