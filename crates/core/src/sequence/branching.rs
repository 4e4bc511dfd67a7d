//! Behavioral branch graph validation.
//!
//! Each step may jump to another step when the recipient opens, clicks,
//! replies or ignores. Those jumps form a directed graph over step orders
//! that must only point at existing steps and must never loop.

use std::collections::HashMap;

use crate::error::CoreError;

use super::step::{BranchSlot, CampaignSequenceStep};

/// Error message for a cycle anywhere in the branch graph.
pub const CYCLE_ERROR: &str = "circular branch detected in sequence";

/// Arena-indexed branch graph. Node `i` is the step at list position `i`.
#[derive(Debug, Clone)]
pub struct BranchGraph {
    /// Step order of each node.
    orders: Vec<u32>,
    /// Outgoing edges per node, at most one per [`BranchSlot`].
    edges: Vec<Vec<usize>>,
}

/// DFS state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

impl BranchGraph {
    /// Build the graph, failing on the first target that names no step.
    pub fn build(steps: &[CampaignSequenceStep]) -> Result<Self, CoreError> {
        let index_of: HashMap<u32, usize> = steps
            .iter()
            .enumerate()
            .map(|(index, step)| (step.order, index))
            .collect();

        let mut edges = Vec::with_capacity(steps.len());
        for step in steps {
            let mut out = Vec::with_capacity(BranchSlot::ALL.len());
            for (slot, target) in step.branch_conditions.targets() {
                let index = index_of.get(&target).copied().ok_or_else(|| {
                    CoreError::Validation(format!(
                        "branch target {slot} references non-existent step"
                    ))
                })?;
                out.push(index);
            }
            edges.push(out);
        }

        Ok(Self {
            orders: steps.iter().map(|s| s.order).collect(),
            edges,
        })
    }

    pub fn node_count(&self) -> usize {
        self.orders.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Step orders directly reachable from the step with `order`.
    pub fn successors(&self, order: u32) -> Vec<u32> {
        self.orders
            .iter()
            .position(|&o| o == order)
            .map(|index| self.edges[index].iter().map(|&t| self.orders[t]).collect())
            .unwrap_or_default()
    }

    /// Find a cycle, returning the step order where the back edge lands.
    ///
    /// Iterative depth-first search from every unvisited node with an
    /// explicit stack of `(node, next edge index)` frames.
    pub fn find_cycle(&self) -> Option<u32> {
        let mut marks = vec![Mark::Unvisited; self.node_count()];
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.node_count() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::OnStack;
            stack.push((root, 0));

            while let Some((node, next_edge)) = stack.last_mut() {
                let node = *node;
                match self.edges[node].get(*next_edge) {
                    Some(&target) => {
                        *next_edge += 1;
                        match marks[target] {
                            Mark::OnStack => return Some(self.orders[target]),
                            Mark::Unvisited => {
                                marks[target] = Mark::OnStack;
                                stack.push((target, 0));
                            }
                            Mark::Done => {}
                        }
                    }
                    None => {
                        marks[node] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }

        None
    }
}

/// Validate branch targets, then check the branch graph for cycles.
pub fn validate_branches(steps: &[CampaignSequenceStep]) -> Result<(), CoreError> {
    let graph = BranchGraph::build(steps)?;
    match graph.find_cycle() {
        Some(_) => Err(CoreError::Validation(CYCLE_ERROR.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::step::{BranchConditions, Channel, SendAt};

    fn step(order: u32, branches: BranchConditions) -> CampaignSequenceStep {
        CampaignSequenceStep {
            order,
            channel: Channel::Email,
            content_template_id: format!("tpl-{order}"),
            subject: Some("Hello".to_string()),
            body: None,
            delay_days: 0,
            send_at: SendAt::parse("09:00").unwrap(),
            branch_conditions: branches,
            attachments: Vec::new(),
        }
    }

    fn plain(order: u32) -> CampaignSequenceStep {
        step(order, BranchConditions::default())
    }

    fn error_message(steps: &[CampaignSequenceStep]) -> String {
        match validate_branches(steps) {
            Err(CoreError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    // -- Target existence ---------------------------------------------------

    #[test]
    fn no_branches_is_valid() {
        assert!(validate_branches(&[plain(1), plain(2), plain(3)]).is_ok());
    }

    #[test]
    fn missing_target_names_the_slot() {
        let steps = [
            step(
                1,
                BranchConditions {
                    on_opened: Some(5),
                    ..Default::default()
                },
            ),
            plain(2),
            plain(3),
        ];
        assert_eq!(
            error_message(&steps),
            "branch target on_opened references non-existent step"
        );
    }

    #[test]
    fn each_slot_is_reported_by_name() {
        for slot in BranchSlot::ALL {
            let mut conditions = BranchConditions::default();
            match slot {
                BranchSlot::OnOpened => conditions.on_opened = Some(9),
                BranchSlot::OnClicked => conditions.on_clicked = Some(9),
                BranchSlot::OnReplied => conditions.on_replied = Some(9),
                BranchSlot::OnIgnored => conditions.on_ignored = Some(9),
            }
            let message = error_message(&[step(1, conditions), plain(2)]);
            assert!(message.contains(slot.as_str()), "{message}");
        }
    }

    // -- Cycle detection ----------------------------------------------------

    #[test]
    fn two_step_reply_cycle_is_detected() {
        let steps = [
            step(
                1,
                BranchConditions {
                    on_replied: Some(2),
                    ..Default::default()
                },
            ),
            step(
                2,
                BranchConditions {
                    on_replied: Some(1),
                    ..Default::default()
                },
            ),
        ];
        assert_eq!(error_message(&steps), CYCLE_ERROR);
    }

    #[test]
    fn ignored_cycle_is_detected() {
        let steps = [
            step(
                1,
                BranchConditions {
                    on_ignored: Some(2),
                    ..Default::default()
                },
            ),
            step(
                2,
                BranchConditions {
                    on_ignored: Some(1),
                    ..Default::default()
                },
            ),
        ];
        assert_eq!(error_message(&steps), CYCLE_ERROR);
    }

    #[test]
    fn self_loop_is_detected() {
        let steps = [step(
            1,
            BranchConditions {
                on_clicked: Some(1),
                ..Default::default()
            },
        )];
        assert_eq!(error_message(&steps), CYCLE_ERROR);
    }

    #[test]
    fn long_cycle_is_detected() {
        let mut steps: Vec<_> = (1..=50)
            .map(|order| {
                step(
                    order,
                    BranchConditions {
                        on_ignored: Some(order + 1),
                        ..Default::default()
                    },
                )
            })
            .collect();
        steps[49].branch_conditions.on_ignored = Some(1);
        assert_eq!(error_message(&steps), CYCLE_ERROR);
    }

    #[test]
    fn diamond_is_acyclic() {
        // 1 -> 2, 1 -> 3, 2 -> 4, 3 -> 4
        let steps = [
            step(
                1,
                BranchConditions {
                    on_opened: Some(2),
                    on_ignored: Some(3),
                    ..Default::default()
                },
            ),
            step(
                2,
                BranchConditions {
                    on_clicked: Some(4),
                    ..Default::default()
                },
            ),
            step(
                3,
                BranchConditions {
                    on_replied: Some(4),
                    ..Default::default()
                },
            ),
            plain(4),
        ];
        assert!(validate_branches(&steps).is_ok());
    }

    #[test]
    fn backward_edges_without_cycle_are_valid() {
        // 3 -> 1, 2 -> 1: jumping back is fine as long as no loop forms.
        let steps = [
            plain(1),
            step(
                2,
                BranchConditions {
                    on_replied: Some(1),
                    ..Default::default()
                },
            ),
            step(
                3,
                BranchConditions {
                    on_opened: Some(1),
                    on_clicked: Some(2),
                    ..Default::default()
                },
            ),
        ];
        assert!(validate_branches(&steps).is_ok());
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let steps: Vec<_> = (1..=10_000)
            .map(|order| {
                let next = (order < 10_000).then_some(order + 1);
                step(
                    order,
                    BranchConditions {
                        on_opened: next,
                        ..Default::default()
                    },
                )
            })
            .collect();
        assert!(validate_branches(&steps).is_ok());
    }

    // -- Graph accessors ----------------------------------------------------

    #[test]
    fn graph_reports_edges_and_successors() {
        let steps = [
            step(
                1,
                BranchConditions {
                    on_opened: Some(2),
                    on_clicked: Some(3),
                    ..Default::default()
                },
            ),
            plain(2),
            plain(3),
        ];
        let graph = BranchGraph::build(&steps).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.successors(1), vec![2, 3]);
        assert!(graph.successors(2).is_empty());
        assert_eq!(graph.find_cycle(), None);
    }
}
