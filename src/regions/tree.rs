//! Region tree node types.
//!
//! A [`Region`] is one node of the structured control-flow tree produced by
//! [`make_regions`](crate::regions::make_regions). Leaves reference basic
//! blocks of the [`MethodUnit`](crate::ir::MethodUnit) by id; interior nodes
//! give those blocks `if`/`loop`/`switch`/`try` shape. Every reachable block
//! appears in exactly one leaf, so the tree is a partition of the graph and
//! can be walked without consulting edges.

use crate::ir::{BlockId, CmpOp, HandlerId, LoopId};

/// One node of the structured control-flow tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// Children execute in order.
    Sequence(Vec<Region>),
    /// A single basic block.
    Block(BlockId),
    /// Two-way conditional. The condition block's compare is `op`; when it
    /// holds, control enters `then`, otherwise `otherwise` (or the code
    /// following the node when `otherwise` is `None`).
    If {
        /// Block whose terminating compare decides the branch.
        cond: BlockId,
        /// Comparison as it reads in the structured output; branch makers
        /// invert the original operator when they swap the arms.
        op: CmpOp,
        /// Taken arm.
        then: Box<Region>,
        /// Fall-through arm, absent when it is empty.
        otherwise: Option<Box<Region>>,
    },
    /// A natural loop.
    Loop {
        /// Id of the [`LoopInfo`](crate::ir::LoopInfo) this node structures.
        id: LoopId,
        /// Where (and whether) the loop tests its condition.
        kind: LoopKind,
        /// Loop header block, owned by this node.
        header: BlockId,
        /// Condition block and operator, normalized so the comparison holding
        /// means another iteration. `None` for endless loops. For `at_end`
        /// loops the named block is a body block, not owned by this node.
        cond: Option<(BlockId, CmpOp)>,
        /// Loop body, header excluded.
        body: Box<Region>,
    },
    /// Multi-way dispatch on the header's switch instruction.
    Switch {
        /// Block ending in the switch, owned by this node.
        header: BlockId,
        /// One entry per distinct case target, in table order.
        cases: Vec<SwitchCase>,
        /// Default arm, absent when the default jumps straight past the
        /// switch.
        default: Option<Box<Region>>,
    },
    /// A protected span with its handlers.
    TryCatch {
        /// Code covered by the handlers' shared range.
        body: Box<Region>,
        /// Handlers in dispatch order.
        handlers: Vec<HandlerRegion>,
    },
    /// Control transfer to a block owned elsewhere in the tree. Stands in
    /// for `break`, `continue`, and the gotos left by shapes the structurer
    /// cannot express.
    Edge {
        /// Block the transfer leaves from.
        from: BlockId,
        /// Block it lands on.
        to: BlockId,
        /// How a renderer should spell the transfer.
        kind: EdgeKind,
    },
}

/// Loop shape, as far as the condition placement goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// Loop with an exit test.
    Conditional {
        /// `true` when the test runs after the body (`do`/`while`), `false`
        /// when it guards entry (`while`).
        at_end: bool,
    },
    /// No exit test; the loop leaves only through breaks or returns.
    Endless,
}

/// How an [`Region::Edge`] transfer should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Jump to the innermost enclosing loop's exit.
    Break,
    /// Jump to the innermost enclosing loop's header.
    Continue,
    /// Transfer the structurer could not classify.
    Goto,
}

/// One arm of a [`Region::Switch`].
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// Case values dispatching to this arm, in table order.
    pub keys: Vec<i64>,
    /// Arm body; an empty sequence when the arm jumps straight to the code
    /// after the switch.
    pub body: Region,
}

/// One handler arm of a [`Region::TryCatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerRegion {
    /// Id of the [`ExcHandlerInfo`](crate::ir::ExcHandlerInfo) this arm
    /// structures.
    pub id: HandlerId,
    /// Caught class, or `None` for a catch-all.
    pub catch_type: Option<String>,
    /// Handler body.
    pub body: Region,
}

impl Region {
    /// Wraps children in a [`Region::Sequence`], unless there is exactly one,
    /// which is returned unchanged.
    #[must_use]
    pub(crate) fn seq(mut children: Vec<Region>) -> Region {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Region::Sequence(children)
        }
    }

    /// Appends every block id this subtree owns to `out`.
    ///
    /// Ownership follows the partition rules: condition and header blocks
    /// count toward the `If`/`Loop`/`Switch` node holding them, and
    /// [`Region::Edge`] owns nothing.
    pub fn collect_blocks(&self, out: &mut Vec<BlockId>) {
        match self {
            Region::Sequence(children) => {
                for child in children {
                    child.collect_blocks(out);
                }
            }
            Region::Block(id) => out.push(*id),
            Region::If {
                cond,
                then,
                otherwise,
                ..
            } => {
                out.push(*cond);
                then.collect_blocks(out);
                if let Some(otherwise) = otherwise {
                    otherwise.collect_blocks(out);
                }
            }
            // The body may own the header itself (a header compare that is
            // not the exit test), and an `at_end` condition block is always
            // body code; neither may be counted twice.
            Region::Loop { header, body, .. } => {
                let mut inner = Vec::new();
                body.collect_blocks(&mut inner);
                if !inner.contains(header) {
                    out.push(*header);
                }
                out.append(&mut inner);
            }
            Region::Switch {
                header,
                cases,
                default,
            } => {
                out.push(*header);
                for case in cases {
                    case.body.collect_blocks(out);
                }
                if let Some(default) = default {
                    default.collect_blocks(out);
                }
            }
            Region::TryCatch { body, handlers } => {
                body.collect_blocks(out);
                for handler in handlers {
                    handler.body.collect_blocks(out);
                }
            }
            Region::Edge { .. } => {}
        }
    }

    /// All block ids this subtree owns, in pre-order.
    #[must_use]
    pub fn block_ids(&self) -> Vec<BlockId> {
        let mut out = Vec::new();
        self.collect_blocks(&mut out);
        out
    }

    /// Total node count of this subtree, leaves included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 1;
        match self {
            Region::Sequence(children) => {
                count += children.iter().map(Region::node_count).sum::<usize>();
            }
            Region::If {
                then, otherwise, ..
            } => {
                count += then.node_count();
                if let Some(otherwise) = otherwise {
                    count += otherwise.node_count();
                }
            }
            Region::Loop { body, .. } => count += body.node_count(),
            Region::Switch { cases, default, .. } => {
                count += cases.iter().map(|c| c.body.node_count()).sum::<usize>();
                if let Some(default) = default {
                    count += default.node_count();
                }
            }
            Region::TryCatch { body, handlers } => {
                count += body.node_count();
                count += handlers
                    .iter()
                    .map(|h| h.body.node_count())
                    .sum::<usize>();
            }
            Region::Block(_) | Region::Edge { .. } => {}
        }
        count
    }
}
