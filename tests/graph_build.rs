// tests/graph_build.rs

use stepgraph::errors::{BuildProblem, StepGraphError};
use stepgraph::item::ItemId;
use stepgraph::step::{Constraint, ConsumeFlags, StepBuilder, StepDeclaration};
use stepgraph::{ChainBuilder, CompiledGraph};
use stepgraph_test_utils::init_tracing;
use stepgraph_test_utils::items::{Count, Line, Rank, Text};

use std::sync::Arc;

fn noop(name: &str) -> StepBuilder {
    StepBuilder::new(name, |_ctx| Ok(()))
}

fn build(steps: Vec<StepDeclaration>, finals: &[ItemId]) -> Result<Arc<CompiledGraph>, StepGraphError> {
    init_tracing();
    let mut chain = ChainBuilder::new();
    for step in steps {
        chain.add_step(step);
    }
    for id in finals {
        chain.add_final(id.clone());
    }
    chain.build()
}

fn expect_problems(result: Result<Arc<CompiledGraph>, StepGraphError>) -> Vec<BuildProblem> {
    match result {
        Err(StepGraphError::Build(problems)) => problems,
        Err(e) => panic!("Expected Build error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn conflicting_strong_producers_name_both_steps() {
    let result = build(
        vec![
            noop("first").produces::<Text>().build(),
            noop("second").produces::<Text>().build(),
        ],
        &[],
    );

    let problems = expect_problems(result);
    assert_eq!(problems.len(), 1);
    match &problems[0] {
        BuildProblem::ConflictingProducers {
            item,
            first,
            second,
            weak,
        } => {
            assert_eq!(item, &ItemId::simple::<Text>());
            assert_eq!(first, "first");
            assert_eq!(second, "second");
            assert!(!weak);
        }
        other => panic!("Expected ConflictingProducers, got: {other:?}"),
    }

    let message = StepGraphError::Build(problems).to_string();
    assert!(message.contains("'first'"));
    assert!(message.contains("'second'"));
}

#[test]
fn weak_producer_is_superseded_by_strong_one() {
    let graph = build(
        vec![
            noop("default").produces_weak::<Text>().build(),
            noop("override").produces::<Text>().build(),
            noop("reader").consumes::<Text>().build(),
        ],
        &[],
    )
    .expect("weak + strong producer should compile");

    let default = graph.step("default").unwrap();
    let override_step = graph.step("override").unwrap();

    assert!(default.is_superseded(&ItemId::simple::<Text>()));
    assert!(!override_step.is_superseded(&ItemId::simple::<Text>()));
    // Only the strong producer feeds the reader.
    assert!(default.dependents().is_empty());
    assert_eq!(override_step.dependents().len(), 1);
    assert_eq!(graph.step("reader").unwrap().dependency_count(), 1);
}

#[test]
fn two_weak_producers_without_strong_one_conflict() {
    let result = build(
        vec![
            noop("a").produces_weak::<Text>().build(),
            noop("b").produces_weak::<Text>().build(),
        ],
        &[],
    );

    let problems = expect_problems(result);
    assert!(matches!(
        problems.as_slice(),
        [BuildProblem::ConflictingProducers { weak: true, .. }]
    ));
}

#[test]
fn multi_items_accept_any_number_of_producers() {
    let graph = build(
        vec![
            noop("one").produces_multi::<Rank>().build(),
            noop("two").produces_multi::<Rank>().build(),
            noop("three").produces_multi::<Rank>().build(),
            noop("sum").consumes_multi::<Rank>().build(),
        ],
        &[],
    )
    .expect("multi producers should compile");

    assert_eq!(graph.step("sum").unwrap().dependency_count(), 3);
    assert_eq!(graph.start_steps().count(), 3);
    assert_eq!(graph.end_step_count(), 1);
}

#[test]
fn multi_consumer_without_producer_is_valid() {
    let graph = build(vec![noop("reader").consumes_multi::<Line>().build()], &[])
        .expect("multi items never require a producer");
    assert_eq!(graph.step_count(), 1);
}

#[test]
fn missing_producers_are_all_reported_at_once() {
    let result = build(
        vec![
            noop("needs-text").consumes::<Text>().build(),
            noop("needs-count").consumes::<Count>().build(),
            noop("also-needs-text").consumes::<Text>().build(),
        ],
        &[],
    );

    let problems = expect_problems(result);
    assert_eq!(problems.len(), 2, "one problem per missing item: {problems:?}");

    let text_problem = problems
        .iter()
        .find_map(|p| match p {
            BuildProblem::MissingProducer { item, consumers } if *item == ItemId::simple::<Text>() => {
                Some(consumers.clone())
            }
            _ => None,
        })
        .expect("missing Text producer reported");
    assert_eq!(text_problem, vec!["needs-text".to_string(), "also-needs-text".to_string()]);

    assert!(problems.iter().any(|p| matches!(
        p,
        BuildProblem::MissingProducer { item, .. } if *item == ItemId::simple::<Count>()
    )));
}

#[test]
fn optional_consumer_without_producer_compiles() {
    let result = build(vec![noop("reader").consumes_optional::<Text>().build()], &[]);
    assert!(result.is_ok());
}

#[test]
fn order_only_consumer_without_producer_compiles() {
    let result = build(vec![noop("reader").after(ItemId::simple::<Text>()).build()], &[]);
    assert!(result.is_ok());
}

#[test]
fn initial_items_satisfy_consumers() {
    init_tracing();
    let mut chain = ChainBuilder::new();
    chain
        .add_step(noop("reader").consumes::<Text>().build())
        .add_initial(ItemId::simple::<Text>());

    let graph = chain.build().expect("initial item satisfies consumer");
    assert!(graph.initial_ids().contains(&ItemId::simple::<Text>()));
}

#[test]
fn producing_an_initial_item_is_rejected() {
    init_tracing();
    let mut chain = ChainBuilder::new();
    chain
        .add_step(noop("rogue").produces::<Text>().build())
        .add_initial(ItemId::simple::<Text>());

    let problems = expect_problems(chain.build());
    assert!(matches!(
        problems.as_slice(),
        [BuildProblem::ProducesInitial { step, .. }] if step == "rogue"
    ));
}

#[test]
fn final_item_without_producer_is_rejected() {
    let problems = expect_problems(build(vec![], &[ItemId::simple::<Text>()]));
    assert!(matches!(
        problems.as_slice(),
        [BuildProblem::MissingProducer { consumers, .. }] if consumers.is_empty()
    ));
}

#[test]
fn mutual_consumption_is_a_cycle() {
    let result = build(
        vec![
            noop("a").produces::<Text>().consumes::<Count>().build(),
            noop("b").produces::<Count>().consumes::<Text>().build(),
        ],
        &[],
    );

    let problems = expect_problems(result);
    match problems.as_slice() {
        [BuildProblem::Cycle { steps }] => {
            assert_eq!(steps, &vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("Expected a single Cycle problem, got: {other:?}"),
    }
}

#[test]
fn transitive_cycle_through_order_only_edge_is_detected() {
    let result = build(
        vec![
            noop("a").produces::<Text>().after(ItemId::multi::<Line>()).build(),
            noop("b").consumes::<Text>().produces::<Count>().build(),
            noop("c").consumes::<Count>().before(ItemId::multi::<Line>()).build(),
        ],
        &[],
    );

    let problems = expect_problems(result);
    assert!(matches!(
        problems.as_slice(),
        [BuildProblem::Cycle { steps }] if steps.len() == 3
    ));
}

#[test]
fn consuming_own_product_is_a_cycle() {
    let result = build(
        vec![noop("selfish").produces::<Text>().consumes::<Text>().build()],
        &[],
    );
    let problems = expect_problems(result);
    assert!(matches!(
        problems.as_slice(),
        [BuildProblem::Cycle { steps }] if steps == &vec!["selfish".to_string()]
    ));
}

#[test]
fn independent_problems_are_reported_together() {
    let result = build(
        vec![
            noop("dup").produces::<Text>().build(),
            noop("dup").produces::<Text>().build(),
            noop("lonely").consumes::<Count>().build(),
        ],
        &[],
    );

    let problems = expect_problems(result);
    assert!(problems.iter().any(|p| matches!(p, BuildProblem::DuplicateStep { .. })));
    assert!(problems.iter().any(|p| matches!(p, BuildProblem::ConflictingProducers { .. })));
    assert!(problems.iter().any(|p| matches!(p, BuildProblem::MissingProducer { .. })));
}

#[test]
fn start_and_end_steps_for_a_chain() {
    // A -> B -> C, with B's output final.
    let graph = build(
        vec![
            noop("A").produces::<Text>().build(),
            noop("B").consumes::<Text>().produces::<Count>().build(),
            noop("C").consumes::<Count>().build(),
        ],
        &[ItemId::simple::<Count>()],
    )
    .unwrap();

    let starts: Vec<&str> = graph.start_steps().map(|s| s.name()).collect();
    assert_eq!(starts, vec!["A"]);

    // C is a sink; B produces a final item even though C depends on it.
    assert!(graph.step("B").unwrap().is_end_step());
    assert!(graph.step("C").unwrap().is_end_step());
    assert!(!graph.step("A").unwrap().is_end_step());
    assert_eq!(graph.end_step_count(), 2);
}

#[test]
fn sink_that_produces_final_is_counted_once() {
    let graph = build(
        vec![
            noop("A").produces::<Text>().build(),
            noop("B").consumes::<Text>().produces::<Count>().build(),
        ],
        &[ItemId::simple::<Count>()],
    )
    .unwrap();

    assert_eq!(graph.end_step_count(), 1);
}

#[test]
fn declarations_for_the_same_item_are_merged() {
    // An order-only and a real declaration merge into a real, required one.
    let step = noop("reader")
        .consumes_id(ItemId::simple::<Text>(), Constraint::OrderOnly, ConsumeFlags::OPTIONAL)
        .consumes_id(ItemId::simple::<Text>(), Constraint::Real, ConsumeFlags::NONE)
        .build();

    let consume = step.consumes()[&ItemId::simple::<Text>()];
    assert!(consume.is_real());
    assert!(!consume.is_optional());

    let problems = expect_problems(build(vec![step], &[]));
    assert!(matches!(problems.as_slice(), [BuildProblem::MissingProducer { .. }]));
}

#[test]
fn qualified_items_are_distinct() {
    let graph = build(
        vec![
            StepBuilder::new("in", |_ctx| Ok(()))
                .produces_id(
                    ItemId::simple_named::<Text>("input"),
                    Constraint::Real,
                    Default::default(),
                )
                .build(),
            StepBuilder::new("out", |_ctx| Ok(()))
                .produces_id(
                    ItemId::simple_named::<Text>("output"),
                    Constraint::Real,
                    Default::default(),
                )
                .build(),
        ],
        &[],
    )
    .expect("differently qualified items do not conflict");

    assert_eq!(graph.start_steps().count(), 2);
    assert_ne!(ItemId::simple_named::<Text>("input"), ItemId::simple::<Text>());
    assert_eq!(ItemId::simple_named::<Text>("input").to_string(), "Text(input)");
}

#[test]
fn include_only_required_drops_unrelated_steps() {
    init_tracing();
    let mut chain = ChainBuilder::new();
    chain
        .add_step(noop("source").produces::<Text>().build())
        .add_step(noop("final").consumes::<Text>().produces::<Count>().build())
        .add_step(noop("unrelated").produces_multi::<Line>().build())
        .add_final(ItemId::simple::<Count>())
        .include_only_required(true);

    let graph = chain.build().unwrap();
    assert_eq!(graph.step_count(), 2);
    assert!(graph.step("unrelated").is_none());
}

#[test]
fn providers_install_steps_and_report_failures() {
    init_tracing();
    let provider = |chain: &mut ChainBuilder| -> anyhow::Result<()> {
        chain.add_step(noop("provided").produces::<Text>().build());
        Ok(())
    };
    let failing = |_chain: &mut ChainBuilder| -> anyhow::Result<()> {
        anyhow::bail!("could not load steps")
    };

    let mut chain = ChainBuilder::new();
    chain.add_provider(&provider);
    assert!(chain.build().unwrap().step("provided").is_some());

    chain.add_provider(&failing);
    let problems = expect_problems(chain.build());
    assert!(matches!(
        problems.as_slice(),
        [BuildProblem::Provider { message }] if message.contains("could not load steps")
    ));
}
