//! Source-level variable naming.
//!
//! Names come from debug info when present and usable, otherwise from a
//! stem derived from the variable's resolved type (`i` for ints, `str`
//! for strings, `iArr` for int arrays and so on). Every name is unique
//! within the method; repeats get a numeric suffix starting at 2.

use std::collections::{HashMap, HashSet};

use crate::ir::MethodUnit;
use crate::ssa::CodeVarId;
use crate::types::{ArgType, Kind, OBJECT_CLASS, STRING_CLASS};

/// Java keywords and literals a variable may not shadow. Sorted for
/// binary search.
const RESERVED: &[&str] = &[
    "abstract",
    "assert",
    "boolean",
    "break",
    "byte",
    "case",
    "catch",
    "char",
    "class",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extends",
    "false",
    "final",
    "finally",
    "float",
    "for",
    "goto",
    "if",
    "implements",
    "import",
    "instanceof",
    "int",
    "interface",
    "long",
    "native",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "strictfp",
    "super",
    "switch",
    "synchronized",
    "this",
    "throw",
    "throws",
    "transient",
    "true",
    "try",
    "void",
    "volatile",
    "while",
];

/// Assigns a unique display name to every source-level variable.
///
/// Debug-info names are used when `use_debug` is set and the recorded
/// name is a usable identifier; everything else falls back to a
/// type-derived stem.
pub fn assign_names(unit: &mut MethodUnit, use_debug: bool) {
    let mut used: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, u32> = HashMap::new();

    for idx in 0..unit.arena.code_count() {
        let id = CodeVarId::new(idx);
        let base = {
            let var = unit.arena.code_var(id);
            match &var.debug_name {
                Some(name) if use_debug && is_valid_identifier(name) => name.clone(),
                _ => type_stem(&var.ty),
            }
        };
        let name = unique_name(&mut used, &mut counters, &base);
        unit.arena.code_var_mut(id).name = Some(name);
    }
}

/// True when `name` can stand as a variable identifier in the output.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return false;
    }
    RESERVED.binary_search(&name).is_err()
}

fn unique_name(used: &mut HashSet<String>, counters: &mut HashMap<String, u32>, base: &str) -> String {
    let counter = counters.entry(base.to_owned()).or_insert(1);
    loop {
        let candidate = if *counter == 1 {
            base.to_owned()
        } else {
            format!("{base}{counter}")
        };
        *counter += 1;
        if used.insert(candidate.clone()) {
            return candidate;
        }
    }
}

/// Name stem for a resolved type; unresolved values fall back to `v`.
fn type_stem(ty: &ArgType) -> String {
    match ty {
        ArgType::Primitive(kind) => primitive_stem(*kind).to_owned(),
        ArgType::Object(name) | ArgType::Generic { object: name, .. } => object_stem(name),
        ArgType::Array(element) => match element.as_ref() {
            ArgType::Primitive(kind) => format!("{}Arr", primitive_stem(*kind)),
            ArgType::Object(name) | ArgType::Generic { object: name, .. } => {
                format!("{}Arr", object_stem(name))
            }
            _ => "arr".to_owned(),
        },
        ArgType::Unknown(_) => "v".to_owned(),
    }
}

fn primitive_stem(kind: Kind) -> &'static str {
    match kind {
        Kind::Boolean => "z",
        Kind::Char => "c",
        Kind::Byte => "b",
        Kind::Short => "s",
        Kind::Int => "i",
        Kind::Float => "f",
        Kind::Long => "j",
        Kind::Double => "d",
        Kind::Object | Kind::Array | Kind::Void => "v",
    }
}

/// Stem for an object type: `str` and `obj` for the ubiquitous cases,
/// otherwise the short class name with its first letter lowered.
fn object_stem(class_name: &str) -> String {
    if class_name == STRING_CLASS {
        return "str".to_owned();
    }
    if class_name == OBJECT_CLASS {
        return "obj".to_owned();
    }
    let short = class_name
        .rsplit('.')
        .next()
        .unwrap_or(class_name)
        .rsplit('$')
        .next()
        .unwrap_or(class_name);
    let mut chars = short.chars();
    let stem = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    if is_valid_identifier(&stem) {
        stem
    } else {
        "obj".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InsnKind, Instruction, MethodBody, RegisterArg};
    use crate::pipeline::DecompilerOptions;
    use crate::types::KindSet;

    fn named_unit(body: MethodBody, types: &[ArgType], use_debug: bool) -> Vec<String> {
        let mut unit = MethodUnit::new(body);
        crate::cfg::build_blocks(&mut unit).unwrap();
        crate::cfg::process_blocks(&mut unit, &DecompilerOptions::default()).unwrap();
        crate::ssa::transform(&mut unit).unwrap();
        for idx in 0..unit.arena.code_count().min(types.len()) {
            unit.arena.code_var_mut(CodeVarId::new(idx)).ty = types[idx].clone();
        }
        assign_names(&mut unit, use_debug);
        unit.arena
            .code_vars()
            .map(|var| var.name.clone().unwrap())
            .collect()
    }

    fn const_body(defs: u16) -> MethodBody {
        let mut builder = MethodBody::builder("test").regs(defs);
        for reg in 0..defs {
            builder = builder.insn(
                Instruction::new(InsnKind::Const {
                    value: i64::from(reg),
                    wide: false,
                })
                .with_result(RegisterArg::new(reg)),
            );
        }
        builder.insn(Instruction::new(InsnKind::Return)).build()
    }

    #[test]
    fn test_reserved_words_sorted() {
        let mut sorted = RESERVED.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESERVED);
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("count"));
        assert!(is_valid_identifier("_tmp"));
        assert!(is_valid_identifier("$this"));
        assert!(is_valid_identifier("värde"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier("int"));
        assert!(!is_valid_identifier("while"));
    }

    #[test]
    fn test_type_stems_disambiguate() {
        let names = named_unit(
            const_body(3),
            &[ArgType::INT, ArgType::INT, ArgType::Primitive(Kind::Long)],
            false,
        );
        assert_eq!(names, vec!["i", "i2", "j"]);
    }

    #[test]
    fn test_object_and_array_stems() {
        let names = named_unit(
            const_body(3),
            &[
                ArgType::Object(STRING_CLASS.to_owned()),
                ArgType::Array(Box::new(ArgType::INT)),
                ArgType::Object("java.util.ArrayList".to_owned()),
            ],
            false,
        );
        assert_eq!(names, vec!["str", "iArr", "arrayList"]);
    }

    #[test]
    fn test_unknown_type_falls_back() {
        let names = named_unit(const_body(1), &[ArgType::Unknown(KindSet::ALL)], false);
        assert_eq!(names, vec!["v"]);
    }

    #[test]
    fn test_debug_name_preferred_when_valid() {
        let body = MethodBody::builder("test")
            .regs(1)
            .insn(
                Instruction::new(InsnKind::Const {
                    value: 5,
                    wide: false,
                })
                .with_result(RegisterArg::new(0)),
            )
            .insn(
                Instruction::new(InsnKind::Return).with_reg(RegisterArg::new(0)),
            )
            .local(0, "total", Some(ArgType::INT), 1, 2)
            .build();
        let names = named_unit(body, &[ArgType::INT], true);
        assert_eq!(names, vec!["total"]);

        let body = MethodBody::builder("test")
            .regs(1)
            .insn(
                Instruction::new(InsnKind::Const {
                    value: 5,
                    wide: false,
                })
                .with_result(RegisterArg::new(0)),
            )
            .insn(
                Instruction::new(InsnKind::Return).with_reg(RegisterArg::new(0)),
            )
            .local(0, "switch", Some(ArgType::INT), 1, 2)
            .build();
        let names = named_unit(body, &[ArgType::INT], true);
        assert_eq!(names, vec!["i"]);
    }

    #[test]
    fn test_debug_names_ignored_when_disabled() {
        let body = MethodBody::builder("test")
            .regs(1)
            .insn(
                Instruction::new(InsnKind::Const {
                    value: 5,
                    wide: false,
                })
                .with_result(RegisterArg::new(0)),
            )
            .insn(
                Instruction::new(InsnKind::Return).with_reg(RegisterArg::new(0)),
            )
            .local(0, "total", Some(ArgType::INT), 1, 2)
            .build();
        let names = named_unit(body, &[ArgType::INT], false);
        assert_eq!(names, vec!["i"]);
    }
}
