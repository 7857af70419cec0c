// src/graph/validate.rs

//! Static analysis of step declarations.
//!
//! Each pass records problems instead of returning at the first one, so a
//! failed build reports everything that is wrong with the declarations.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::errors::BuildProblem;
use crate::item::ItemId;
use crate::step::{Produce, StepDeclaration};

/// Producers that take part in the graph, per item.
#[derive(Debug, Default)]
pub(crate) struct ProducerIndex {
    /// Steps (by index) whose declaration creates edges for the item:
    /// the designated real producer(s) plus every ordering-only producer.
    pub(crate) effective: HashMap<ItemId, Vec<usize>>,
    /// Items with at least one effective real producer.
    pub(crate) real: HashSet<ItemId>,
    /// Weak declarations that lost to a stronger producer, per step.
    pub(crate) superseded: HashMap<usize, BTreeSet<ItemId>>,
}

impl ProducerIndex {
    pub(crate) fn producers_of(&self, id: &ItemId) -> &[usize] {
        self.effective.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub(crate) fn check_unique_names(steps: &[StepDeclaration], problems: &mut Vec<BuildProblem>) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for step in steps {
        if !seen.insert(step.name()) && reported.insert(step.name()) {
            problems.push(BuildProblem::DuplicateStep {
                name: step.name().to_string(),
            });
        }
    }
}

/// Decide which declarations actually produce each item.
///
/// For a simple item at most one non-weak real producer may exist. Weak
/// producers are only used when no non-weak one exists; the first declared
/// weak producer then wins and any other weak one is a conflict.
pub(crate) fn resolve_producers(
    steps: &[StepDeclaration],
    initial: &BTreeSet<ItemId>,
    problems: &mut Vec<BuildProblem>,
) -> ProducerIndex {
    let mut declared: BTreeMap<&ItemId, Vec<(usize, Produce)>> = BTreeMap::new();
    for (idx, step) in steps.iter().enumerate() {
        for (id, produce) in step.produces() {
            declared.entry(id).or_default().push((idx, *produce));
        }
    }

    let mut index = ProducerIndex::default();

    for (id, producers) in declared {
        let mut effective: Vec<usize> = producers
            .iter()
            .filter(|(_, p)| !p.is_real())
            .map(|(idx, _)| *idx)
            .collect();

        let real: Vec<(usize, Produce)> = producers.iter().copied().filter(|(_, p)| p.is_real()).collect();

        if id.is_multi() {
            effective.extend(real.iter().map(|(idx, _)| *idx));
            if !real.is_empty() {
                index.real.insert(id.clone());
            }
            index.effective.insert(id.clone(), sorted_unique(effective));
            continue;
        }

        if initial.contains(id) {
            for (idx, _) in &real {
                problems.push(BuildProblem::ProducesInitial {
                    item: id.clone(),
                    step: steps[*idx].name().to_string(),
                });
            }
        }

        let strong: Vec<usize> = real.iter().filter(|(_, p)| !p.is_weak()).map(|(i, _)| *i).collect();
        let weak: Vec<usize> = real.iter().filter(|(_, p)| p.is_weak()).map(|(i, _)| *i).collect();

        let (winners, losers, weak_conflict) = if strong.is_empty() {
            (weak, Vec::new(), true)
        } else {
            (strong, weak, false)
        };

        if let Some((&first, rest)) = winners.split_first() {
            for &other in rest {
                problems.push(BuildProblem::ConflictingProducers {
                    item: id.clone(),
                    first: steps[first].name().to_string(),
                    second: steps[other].name().to_string(),
                    weak: weak_conflict,
                });
            }
            effective.push(first);
            index.real.insert(id.clone());
        }

        for loser in losers {
            index.superseded.entry(loser).or_default().insert(id.clone());
        }

        index.effective.insert(id.clone(), sorted_unique(effective));
    }

    index
}

fn sorted_unique(mut v: Vec<usize>) -> Vec<usize> {
    v.sort_unstable();
    v.dedup();
    v
}

/// Restrict the chain to steps that contribute to a final item.
///
/// Starting from the producers of every final item, pull in the producers
/// of everything an included step consumes.
pub(crate) fn required_steps(
    steps: &[StepDeclaration],
    finals: &BTreeSet<ItemId>,
    producers: &ProducerIndex,
) -> BTreeSet<usize> {
    let mut included = BTreeSet::new();
    let mut queue: Vec<usize> = finals
        .iter()
        .flat_map(|id| producers.producers_of(id).iter().copied())
        .collect();

    while let Some(idx) = queue.pop() {
        if !included.insert(idx) {
            continue;
        }
        for id in steps[idx].consumes().keys() {
            queue.extend(producers.producers_of(id).iter().copied());
        }
    }

    included
}

/// Every required simple item needs a real producer or an initial value.
///
/// Multi items never need a producer: consumers see an empty list.
pub(crate) fn check_consumers(
    steps: &[StepDeclaration],
    included: &BTreeSet<usize>,
    initial: &BTreeSet<ItemId>,
    finals: &BTreeSet<ItemId>,
    producers: &ProducerIndex,
    problems: &mut Vec<BuildProblem>,
) {
    let satisfied = |id: &ItemId| id.is_multi() || initial.contains(id) || producers.real.contains(id);

    let mut missing: BTreeMap<ItemId, Vec<String>> = BTreeMap::new();
    for &idx in included {
        let step = &steps[idx];
        for (id, consume) in step.consumes() {
            if consume.is_real() && !consume.is_optional() && !satisfied(id) {
                missing
                    .entry(id.clone())
                    .or_default()
                    .push(step.name().to_string());
            }
        }
    }

    for id in finals {
        if !satisfied(id) {
            missing.entry(id.clone()).or_default();
        }
    }

    for (item, consumers) in missing {
        problems.push(BuildProblem::MissingProducer { item, consumers });
    }
}

/// Derive producer -> consumer edges between included steps.
pub(crate) fn derive_edges(
    steps: &[StepDeclaration],
    included: &BTreeSet<usize>,
    producers: &ProducerIndex,
) -> DiGraphMap<usize, ()> {
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

    for &idx in included {
        graph.add_node(idx);
    }

    for &consumer in included {
        for id in steps[consumer].consumes().keys() {
            for &producer in producers.producers_of(id) {
                if included.contains(&producer) {
                    graph.add_edge(producer, consumer, ());
                }
            }
        }
    }

    graph
}

/// Report every group of steps that depend on each other.
pub(crate) fn check_cycles(
    steps: &[StepDeclaration],
    graph: &DiGraphMap<usize, ()>,
    problems: &mut Vec<BuildProblem>,
) {
    // A topological sort fails if and only if there is a cycle.
    if toposort(graph, None).is_ok() {
        return;
    }

    for component in tarjan_scc(graph) {
        let cyclic = component.len() > 1
            || component
                .first()
                .is_some_and(|&idx| graph.contains_edge(idx, idx));
        if !cyclic {
            continue;
        }
        let mut names: Vec<String> = component
            .iter()
            .map(|&idx| steps[idx].name().to_string())
            .collect();
        names.sort();
        problems.push(BuildProblem::Cycle { steps: names });
    }
}
