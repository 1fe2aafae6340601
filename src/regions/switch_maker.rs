//! Switch structuring.

use std::collections::BTreeMap;

use crate::diag::Diagnostic;
use crate::ir::{BlockFlags, BlockId, InsnKind};
use crate::regions::maker::RegionMaker;
use crate::regions::{Region, SwitchCase};
use crate::Result;

impl RegionMaker<'_> {
    /// Structures a switch dispatch rooted at `block_id`.
    ///
    /// Case values sharing a target share one arm, keeping table order for
    /// both arms and keys; values whose target is the default collapse into
    /// it. Each arm is structured up to the header's immediate
    /// post-dominator, where sequential flow resumes.
    pub(crate) fn make_switch(&mut self, block_id: BlockId) -> Result<(Region, Option<BlockId>)> {
        let block = self.unit.block(block_id);
        let (cases, default) = match block.terminator().map(|insn| &insn.kind) {
            Some(InsnKind::Switch { cases, default }) => (cases.clone(), *default),
            _ => {
                self.processed.insert(block_id.index());
                return Ok((Region::Block(block_id), block.succs.first().copied()));
            }
        };
        self.processed.insert(block_id.index());
        let merge = self.dom.post_idom(block_id);

        // Synthetic blocks copy a real block's offset, so they are excluded
        // from target resolution.
        let targets: BTreeMap<u32, BlockId> = self
            .unit
            .blocks
            .iter()
            .filter(|candidate| !candidate.has_flag(BlockFlags::SYNTHETIC))
            .map(|candidate| (candidate.start_offset, candidate.id))
            .collect();
        let default_block = targets.get(&default).copied();

        let mut grouped: Vec<(BlockId, Vec<i64>)> = Vec::new();
        for (value, target) in &cases {
            let Some(target_block) = targets.get(target).copied() else {
                self.notes.push(Diagnostic::warning(format!(
                    "`{}`: switch case {} target {:#x} maps to no block, folded into default",
                    self.unit.name, value, target
                )));
                continue;
            };
            if Some(target_block) == default_block {
                continue;
            }
            match grouped.iter_mut().find(|(block, _)| *block == target_block) {
                Some((_, keys)) => keys.push(*value),
                None => grouped.push((target_block, vec![*value])),
            }
        }

        let mut case_regions = Vec::new();
        for (target, keys) in grouped {
            let body = self
                .branch_region(block_id, target, merge)?
                .unwrap_or(Region::Sequence(Vec::new()));
            case_regions.push(SwitchCase { keys, body });
        }
        let default_region = match default_block {
            Some(default_block) if Some(default_block) != merge => self
                .branch_region(block_id, default_block, merge)?
                .map(Box::new),
            _ => None,
        };

        let region = Region::Switch {
            header: block_id,
            cases: case_regions,
            default: default_region,
        };
        Ok((region, merge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::DominatorInfo;
    use crate::ir::{Instruction, MethodBody, MethodUnit, RegisterArg};
    use crate::pipeline::DecompilerOptions;
    use crate::regions::make_regions;

    fn unit_with_edges(block_count: usize, edges: &[(usize, usize)]) -> MethodUnit {
        let mut unit = MethodUnit::new(MethodBody::builder("test").regs(2).build());
        for i in 0..block_count {
            unit.add_block(i as u32 * 0x10);
        }
        for &(from, to) in edges {
            unit.connect(BlockId::new(from), BlockId::new(to));
        }
        unit
    }

    fn put_switch(unit: &mut MethodUnit, id: usize, cases: &[(i64, u32)], default: u32) {
        let block = unit.block_mut(BlockId::new(id));
        let offset = block.start_offset;
        block.insns.push(
            Instruction::new(InsnKind::Switch {
                cases: cases.to_vec(),
                default,
            })
            .at(offset)
            .with_reg(RegisterArg::new(0)),
        );
    }

    fn put_return(unit: &mut MethodUnit, id: usize) {
        let block = unit.block_mut(BlockId::new(id));
        block
            .insns
            .push(Instruction::new(crate::ir::InsnKind::Return));
        block.flags |= crate::ir::BlockFlags::RETURN;
    }

    fn structured(unit: &mut MethodUnit) -> Region {
        unit.dominators = Some(DominatorInfo::compute(unit));
        make_regions(unit, &DecompilerOptions::default()).unwrap();
        unit.region.clone().unwrap()
    }

    fn b(index: usize) -> BlockId {
        BlockId::new(index)
    }

    #[test]
    fn test_cases_sharing_a_target_share_an_arm() {
        // Block offsets are index * 0x10: cases 1 and 2 hit block 1, case
        // 3 hits block 2, default goes to block 3; all rejoin at block 4.
        let mut unit = unit_with_edges(5, &[(0, 1), (0, 2), (0, 3), (1, 4), (2, 4), (3, 4)]);
        put_switch(&mut unit, 0, &[(1, 0x10), (2, 0x10), (3, 0x20)], 0x30);
        put_return(&mut unit, 4);

        let region = structured(&mut unit);
        assert_eq!(
            region,
            Region::Sequence(vec![
                Region::Switch {
                    header: b(0),
                    cases: vec![
                        SwitchCase {
                            keys: vec![1, 2],
                            body: Region::Block(b(1)),
                        },
                        SwitchCase {
                            keys: vec![3],
                            body: Region::Block(b(2)),
                        },
                    ],
                    default: Some(Box::new(Region::Block(b(3)))),
                },
                Region::Block(b(4)),
            ])
        );
    }

    #[test]
    fn test_case_on_default_target_collapses() {
        let mut unit = unit_with_edges(3, &[(0, 1), (0, 2), (1, 2)]);
        put_switch(&mut unit, 0, &[(7, 0x10), (8, 0x20)], 0x20);
        put_return(&mut unit, 2);

        let region = structured(&mut unit);
        let Region::Sequence(children) = &region else {
            panic!("expected sequence, got {region:?}");
        };
        let Region::Switch { cases, default, .. } = &children[0] else {
            panic!("expected switch, got {:?}", children[0]);
        };
        // Case 8 shares the default target, so only case 7 keeps an arm,
        // and the default (the merge itself) is implicit.
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].keys, vec![7]);
        assert!(default.is_none());
    }

    #[test]
    fn test_unmapped_case_target_folds_into_default() {
        let mut unit = unit_with_edges(3, &[(0, 1), (1, 2)]);
        put_switch(&mut unit, 0, &[(1, 0x10), (2, 0x99)], 0x20);
        put_return(&mut unit, 2);

        unit.dominators = Some(DominatorInfo::compute(&unit));
        make_regions(&mut unit, &DecompilerOptions::default()).unwrap();

        let Some(Region::Sequence(children)) = &unit.region else {
            panic!("expected sequence root");
        };
        let Region::Switch { cases, .. } = &children[0] else {
            panic!("expected switch, got {:?}", children[0]);
        };
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].keys, vec![1]);
        assert!(unit
            .diagnostics
            .iter()
            .any(|diag| diag.message.contains("0x99")));
    }
}
