//! Typed instructions and their arguments.
//!
//! The front-end decodes raw bytecode into this model: an [`Instruction`]
//! has an [`InsnKind`], an ordered argument list, an optional result
//! register and the byte offset it was decoded from. Instructions stay
//! immutable through the pipeline except for two controlled mutations:
//! SSA renaming binds each [`RegisterArg`] to one SSA version, and phi
//! pseudo-instructions are inserted at merge blocks.

use crate::ssa::SsaVarId;
use crate::types::{ArgType, Kind};

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `>>>`
    Ushr,
}

impl ArithOp {
    /// Returns `true` for the operators that also apply to `boolean`.
    #[must_use]
    pub const fn is_bitwise(self) -> bool {
        matches!(self, ArithOp::And | ArithOp::Or | ArithOp::Xor)
    }

    /// Returns `true` for the shift operators, whose right operand is an
    /// `int` regardless of the value operand's width.
    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(self, ArithOp::Shl | ArithOp::Shr | ArithOp::Ushr)
    }
}

/// Comparison operators used by conditional branches.
///
/// A branch with one register argument compares against zero, one with two
/// arguments compares the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `<=`
    Le,
}

impl CmpOp {
    /// The operator testing the opposite outcome.
    ///
    /// Structuring inverts a condition when the taken edge leaves the
    /// construct being built.
    #[must_use]
    pub const fn invert(self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Le => CmpOp::Gt,
        }
    }
}

/// Dispatch flavor of a method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    /// Virtual dispatch on the first argument.
    Virtual,
    /// Static call, no receiver.
    Static,
    /// Direct call (constructors, private methods).
    Direct,
    /// Interface dispatch.
    Interface,
    /// Superclass call.
    Super,
}

/// A resolved method reference with its declared signature.
///
/// The front-end resolves signatures against the classpath while decoding,
/// so inference can read declared types straight off the call site.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRef {
    /// Declaring class, fully qualified.
    pub owner: String,
    /// Method name.
    pub name: String,
    /// Declared return type.
    pub ret: ArgType,
    /// Declared parameter types, receiver excluded.
    pub params: Vec<ArgType>,
}

/// A resolved field reference with its declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    /// Declaring class, fully qualified.
    pub owner: String,
    /// Field name.
    pub name: String,
    /// Declared field type.
    pub ty: ArgType,
}

/// Operation performed by one instruction.
///
/// Branch targets are byte offsets into the original stream; the block
/// graph builder resolves them to blocks and reports any target that does
/// not land on an instruction boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum InsnKind {
    /// No operation.
    Nop,
    /// Copy a register: `result <- args[0]`.
    Move,
    /// Load a constant; `wide` marks 64-bit values.
    Const {
        /// Raw value bits; floats are carried bit-exact.
        value: i64,
        /// `true` for `long`/`double` constants.
        wide: bool,
    },
    /// Load a string literal.
    ConstString {
        /// The literal.
        value: String,
    },
    /// Load a class literal.
    ConstClass {
        /// Fully qualified class name.
        class: String,
    },
    /// Binary arithmetic: `result <- args[0] op args[1]`.
    Arith {
        /// The operator.
        op: ArithOp,
        /// `true` when operating on 64-bit values.
        wide: bool,
    },
    /// Numeric negation.
    Neg {
        /// `true` when operating on a 64-bit value.
        wide: bool,
    },
    /// Three-way compare of two wide or floating values into an `int`.
    Cmp,
    /// Conditional branch; one register argument compares against zero.
    If {
        /// Comparison applied to the arguments.
        op: CmpOp,
        /// Offset taken when the comparison holds.
        target: u32,
    },
    /// Unconditional jump.
    Goto {
        /// Jump target offset.
        target: u32,
    },
    /// Table/lookup switch on `args[0]`.
    Switch {
        /// `(case value, target offset)` pairs in table order.
        cases: Vec<(i64, u32)>,
        /// Offset taken when no case matches.
        default: u32,
    },
    /// Method call; `args` are the call arguments, receiver first for
    /// instance calls.
    Invoke {
        /// Dispatch flavor.
        kind: InvokeKind,
        /// Resolved callee.
        method: MethodRef,
    },
    /// Return; `args` holds the returned register, if any.
    Return,
    /// Throw `args[0]`.
    Throw,
    /// Allocate an instance of `class`.
    New {
        /// Fully qualified class name.
        class: String,
    },
    /// Allocate an array; `args[0]` is the length.
    NewArray {
        /// Element type.
        element: ArgType,
    },
    /// `result <- args[0][args[1]]`.
    ArrayGet {
        /// Declared element type, as precise as the opcode reveals.
        element: ArgType,
    },
    /// `args[1][args[2]] <- args[0]`.
    ArrayPut {
        /// Declared element type, as precise as the opcode reveals.
        element: ArgType,
    },
    /// `result <- args[0].length`.
    ArrayLength,
    /// Field read; instance reads take the receiver as `args[0]`.
    FieldGet {
        /// Resolved field.
        field: FieldRef,
    },
    /// Field write; `args[0]` is the value, `args[1]` the receiver if any.
    FieldPut {
        /// Resolved field.
        field: FieldRef,
    },
    /// Checked reference cast of `args[0]`.
    CheckCast {
        /// Target reference type.
        to: ArgType,
    },
    /// Primitive conversion of `args[0]`.
    PrimCast {
        /// Target primitive kind.
        to: Kind,
    },
    /// Enter monitor on `args[0]`.
    MonitorEnter,
    /// Exit monitor on `args[0]`.
    MonitorExit,
    /// SSA phi pseudo-assignment; one argument per predecessor, in
    /// predecessor order. Inserted by the SSA builder, never decoded.
    Phi,
}

impl InsnKind {
    /// Returns `true` when control cannot fall through to the next offset.
    /// The switch counts: its default target is explicit.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InsnKind::Return
                | InsnKind::Throw
                | InsnKind::Goto { .. }
                | InsnKind::Switch { .. }
        )
    }

    /// Returns `true` when the instruction ends its basic block.
    #[must_use]
    pub fn ends_block(&self) -> bool {
        matches!(
            self,
            InsnKind::Return
                | InsnKind::Throw
                | InsnKind::Goto { .. }
                | InsnKind::If { .. }
                | InsnKind::Switch { .. }
        )
    }

    /// Short operation name, for dumps and diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            InsnKind::Nop => "nop",
            InsnKind::Move => "move",
            InsnKind::Const { wide: false, .. } => "const",
            InsnKind::Const { wide: true, .. } => "const-wide",
            InsnKind::ConstString { .. } => "const-string",
            InsnKind::ConstClass { .. } => "const-class",
            InsnKind::Arith { .. } => "arith",
            InsnKind::Neg { .. } => "neg",
            InsnKind::Cmp => "cmp",
            InsnKind::If { .. } => "if",
            InsnKind::Goto { .. } => "goto",
            InsnKind::Switch { .. } => "switch",
            InsnKind::Invoke { .. } => "invoke",
            InsnKind::Return => "return",
            InsnKind::Throw => "throw",
            InsnKind::New { .. } => "new-instance",
            InsnKind::NewArray { .. } => "new-array",
            InsnKind::ArrayGet { .. } => "aget",
            InsnKind::ArrayPut { .. } => "aput",
            InsnKind::ArrayLength => "array-length",
            InsnKind::FieldGet { .. } => "get-field",
            InsnKind::FieldPut { .. } => "put-field",
            InsnKind::CheckCast { .. } => "check-cast",
            InsnKind::PrimCast { .. } => "prim-cast",
            InsnKind::MonitorEnter => "monitor-enter",
            InsnKind::MonitorExit => "monitor-exit",
            InsnKind::Phi => "phi",
        }
    }
}

/// A register operand.
///
/// Before SSA renaming this denotes the physical register `reg`; afterwards
/// `ssa` pins it to one version of that register. `ty` is the type binding
/// known at decode time and serves as an inference seed.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterArg {
    /// Physical register number.
    pub reg: u16,
    /// SSA version, bound during renaming.
    pub ssa: Option<SsaVarId>,
    /// Decode-time type binding.
    pub ty: ArgType,
}

impl RegisterArg {
    /// A register operand with no type knowledge.
    #[must_use]
    pub fn new(reg: u16) -> Self {
        RegisterArg {
            reg,
            ssa: None,
            ty: ArgType::UNKNOWN,
        }
    }

    /// A register operand with a decode-time type binding.
    #[must_use]
    pub fn typed(reg: u16, ty: ArgType) -> Self {
        RegisterArg { reg, ssa: None, ty }
    }
}

impl std::fmt::Display for RegisterArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ssa {
            Some(ssa) => write!(f, "v{}_{}", self.reg, ssa.index()),
            None => write!(f, "v{}", self.reg),
        }
    }
}

/// One operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum InsnArg {
    /// A register operand.
    Reg(RegisterArg),
    /// A literal operand, raw bits for numeric kinds.
    Lit(i64),
    /// A nested instruction whose result feeds this operand directly.
    ///
    /// Produced by forwarding passes in the embedding system; the pipeline
    /// treats the nested instruction's register uses as uses of the outer
    /// instruction.
    Wrapped(Box<Instruction>),
}

impl InsnArg {
    /// The register operand, when this argument is one.
    #[must_use]
    pub fn as_reg(&self) -> Option<&RegisterArg> {
        match self {
            InsnArg::Reg(reg) => Some(reg),
            _ => None,
        }
    }

    /// The literal value, when this argument is one.
    #[must_use]
    pub fn as_lit(&self) -> Option<i64> {
        match self {
            InsnArg::Lit(value) => Some(*value),
            _ => None,
        }
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation.
    pub kind: InsnKind,
    /// Byte offset in the original stream; `u32::MAX` for synthesized
    /// instructions such as phis.
    pub offset: u32,
    /// Result register, when the operation defines one.
    pub result: Option<RegisterArg>,
    /// Ordered operands.
    pub args: Vec<InsnArg>,
}

/// Offset marking instructions that never existed in the input stream.
pub const SYNTHETIC_OFFSET: u32 = u32::MAX;

impl Instruction {
    /// A new instruction with no operands at an unset offset.
    #[must_use]
    pub fn new(kind: InsnKind) -> Self {
        Instruction {
            kind,
            offset: SYNTHETIC_OFFSET,
            result: None,
            args: Vec::new(),
        }
    }

    /// Sets the byte offset.
    #[must_use]
    pub fn at(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the result register.
    #[must_use]
    pub fn with_result(mut self, reg: RegisterArg) -> Self {
        self.result = Some(reg);
        self
    }

    /// Appends a register operand.
    #[must_use]
    pub fn with_reg(mut self, reg: RegisterArg) -> Self {
        self.args.push(InsnArg::Reg(reg));
        self
    }

    /// Appends a literal operand.
    #[must_use]
    pub fn with_lit(mut self, value: i64) -> Self {
        self.args.push(InsnArg::Lit(value));
        self
    }

    /// Branch target offsets of this instruction, in successor order.
    /// For a switch that is every case target followed by the default.
    #[must_use]
    pub fn target_offsets(&self) -> Vec<u32> {
        match &self.kind {
            InsnKind::Goto { target } | InsnKind::If { target, .. } => vec![*target],
            InsnKind::Switch { cases, default } => {
                let mut targets: Vec<u32> = cases.iter().map(|(_, target)| *target).collect();
                targets.push(*default);
                targets
            }
            _ => Vec::new(),
        }
    }

    /// Returns `true` for the phi pseudo-instruction.
    #[must_use]
    pub fn is_phi(&self) -> bool {
        matches!(self.kind, InsnKind::Phi)
    }

    /// Visits every register use, wrapped instructions included.
    ///
    /// The result register is a definition, not a use, and is not visited.
    pub fn visit_uses<F: FnMut(&RegisterArg)>(&self, f: &mut F) {
        for arg in &self.args {
            match arg {
                InsnArg::Reg(reg) => f(reg),
                InsnArg::Wrapped(inner) => inner.visit_uses(f),
                InsnArg::Lit(_) => {}
            }
        }
    }

    /// Mutable variant of [`Instruction::visit_uses`].
    pub fn visit_uses_mut<F: FnMut(&mut RegisterArg)>(&mut self, f: &mut F) {
        for arg in &mut self.args {
            match arg {
                InsnArg::Reg(reg) => f(reg),
                InsnArg::Wrapped(inner) => inner.visit_uses_mut(f),
                InsnArg::Lit(_) => {}
            }
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.offset != SYNTHETIC_OFFSET {
            write!(f, "{:04x}: ", self.offset)?;
        }
        write!(f, "{}", self.kind.name())?;
        if let Some(result) = &self.result {
            write!(f, " {result}")?;
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i == 0 && self.result.is_some() {
                write!(f, " <-")?;
            }
            match arg {
                InsnArg::Reg(reg) => write!(f, " {reg}")?,
                InsnArg::Lit(value) => write!(f, " #{value}")?,
                InsnArg::Wrapped(inner) => write!(f, " ({inner})")?,
            }
        }
        match &self.kind {
            InsnKind::Goto { target } | InsnKind::If { target, .. } => {
                write!(f, " -> {target:#x}")?;
            }
            InsnKind::Switch { cases, default } => {
                write!(f, " ({} cases, default {default:#x})", cases.len())?;
            }
            _ => {}
        }
        Ok(())
    }
}
