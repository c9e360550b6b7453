use super::*;
use crate::config::EvaluationSettings;
use crate::domain::{DraftSlot, HistoryAction, PlatformKind};
use crate::graph::GraphBuilder;
use crate::state_machine::Phase;
use crate::testing::{
    approved_evaluation_json, brief, draft_json, evaluation_json, insight_json,
    rejected_evaluation_json, static_draft_json, strategy_json, temp_logger, video_draft_json,
    ScriptedGenerator, STATIC_PLATFORM, VIDEO_PLATFORM,
};
use proptest::prelude::*;

fn context(generator: &ScriptedGenerator) -> (PhaseContext<'_>, tempfile::TempDir) {
    let (logger, dir) = temp_logger();
    let ctx = PhaseContext {
        generator,
        logger,
        evaluation: EvaluationSettings::default(),
    };
    (ctx, dir)
}

/// Queues insight, strategy and first draft at 10, 20 and 30 tokens.
fn push_preamble(generator: &ScriptedGenerator, kind: PlatformKind) {
    generator
        .push_ok(insight_json(), 10)
        .push_ok(strategy_json(), 20)
        .push_ok(draft_json(kind, "Start your streak"), 30);
}

const PRIMARY_PREAMBLE: [StepKind; 4] = [
    StepKind::AudienceInsight,
    StepKind::CreativeStrategy,
    StepKind::ScriptGeneration,
    StepKind::ScriptEvaluation,
];

#[tokio::test]
async fn test_approved_first_draft_finishes_without_refinement() {
    let generator = ScriptedGenerator::new();
    push_preamble(&generator, PlatformKind::Video);
    generator.push_ok(approved_evaluation_json(), 5);
    let (ctx, _dir) = context(&generator);

    let outcome = run_primary(WorkflowState::new(brief(VIDEO_PLATFORM)), &ctx)
        .await
        .expect("primary traversal succeeds");

    assert_eq!(outcome.steps, PRIMARY_PREAMBLE.to_vec());
    assert_eq!(outcome.termination, Some(Termination::Approved));
    assert_eq!(outcome.state.iteration_count(), 0);
    assert!(outcome.state.history().is_empty());
    assert_eq!(outcome.state.total_llm_tokens(), 65);
    assert!(
        outcome
            .state
            .evaluation_report()
            .expect("evaluation stored")
            .is_approved_for_next_stage
    );
    assert_eq!(generator.remaining(), 0);
}

#[tokio::test]
async fn test_rejection_refines_then_reevaluates() {
    let generator = ScriptedGenerator::new();
    push_preamble(&generator, PlatformKind::Video);
    generator
        .push_ok(rejected_evaluation_json(), 5)
        .push_ok(video_draft_json("Start your streak today"), 7)
        .push_ok(approved_evaluation_json(), 5);
    let (ctx, _dir) = context(&generator);

    let outcome = run_primary(WorkflowState::new(brief(VIDEO_PLATFORM)), &ctx)
        .await
        .expect("primary traversal succeeds");

    let mut expected = PRIMARY_PREAMBLE.to_vec();
    expected.extend([StepKind::ScriptRefinement, StepKind::ScriptEvaluation]);
    assert_eq!(outcome.steps, expected);
    assert_eq!(outcome.termination, Some(Termination::Approved));
    assert_eq!(outcome.state.iteration_count(), 1);

    let history = outcome.state.history();
    assert_eq!(history.len(), 1);
    let entry = history.last().expect("one entry");
    assert_eq!(entry.iteration, 1);
    assert_eq!(entry.action, HistoryAction::ScriptRefined);
    assert_eq!(entry.previous_overall_score, 3.2);
    assert_eq!(
        outcome
            .state
            .script_draft()
            .expect("draft kept")
            .call_to_action_text(),
        "Start your streak today"
    );
    assert_eq!(outcome.state.total_llm_tokens(), 77);
}

#[tokio::test]
async fn test_cap_ends_loop_unapproved() {
    let generator = ScriptedGenerator::new();
    push_preamble(&generator, PlatformKind::Static);
    let stuck = evaluation_json(4.0, 4, &["Make the headline punchier"]);
    generator.push_ok(stuck.clone(), 1);
    for round in 1..=3 {
        generator
            .push_ok(static_draft_json(&format!("Try it, round {}", round)), 1)
            .push_ok(stuck.clone(), 1);
    }
    let (ctx, _dir) = context(&generator);

    let outcome = run_primary(WorkflowState::new(brief(STATIC_PLATFORM)), &ctx)
        .await
        .expect("exhaustion is not an error");

    assert_eq!(outcome.termination, Some(Termination::Exhausted));
    assert_eq!(outcome.state.iteration_count(), 3);
    assert_eq!(outcome.state.history().len(), 3);
    assert_eq!(
        outcome
            .steps
            .iter()
            .filter(|s| **s == StepKind::ScriptRefinement)
            .count(),
        3
    );
    assert_eq!(outcome.steps.last(), Some(&StepKind::ScriptEvaluation));
    assert!(
        !outcome
            .state
            .evaluation_report()
            .expect("evaluation stored")
            .is_approved_for_next_stage
    );
    assert_eq!(generator.remaining(), 0);
}

#[tokio::test]
async fn test_wrong_shape_refinement_is_not_stored() {
    let generator = ScriptedGenerator::new();
    push_preamble(&generator, PlatformKind::Video);
    generator
        .push_ok(rejected_evaluation_json(), 5)
        .push_ok(static_draft_json("Switch formats"), 7);
    let (ctx, _dir) = context(&generator);
    let graph = build_primary_graph().unwrap();
    let (mut machine, _rx) =
        WorkflowStateMachine::new(WorkflowState::new(brief(VIDEO_PLATFORM)), ctx.logger.clone());

    let err = run_graph(&graph, &mut machine, &ctx)
        .await
        .expect_err("static refinement on a video platform must fail");

    assert!(matches!(err, WorkflowError::SchemaMismatch { .. }));
    let state = machine.state();
    assert_eq!(state.iteration_count(), 0);
    assert!(state.history().is_empty());
    assert_eq!(
        state.script_draft().expect("draft kept").kind(),
        PlatformKind::Video
    );
    assert_eq!(state.total_llm_tokens(), 65);
    assert_eq!(machine.phase(), Phase::Refining);
}

#[tokio::test]
async fn test_evaluation_without_draft_changes_nothing() {
    let generator = ScriptedGenerator::new();
    let (ctx, _dir) = context(&generator);
    let graph = GraphBuilder::new("evaluation-only")
        .edge(StepKind::ScriptEvaluation, Edge::End)
        .build(StepKind::ScriptEvaluation)
        .unwrap();
    let initial = WorkflowState::new(brief(VIDEO_PLATFORM));
    let (mut machine, _rx) = WorkflowStateMachine::new(initial.clone(), ctx.logger.clone());

    let err = run_graph(&graph, &mut machine, &ctx)
        .await
        .expect_err("evaluation needs a draft");

    assert!(matches!(err, WorkflowError::Precondition { .. }));
    assert_eq!(machine.state(), &initial);
    assert_eq!(machine.state().total_llm_tokens(), 0);
    assert!(generator.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_platform_aborts_before_first_call() {
    let generator = ScriptedGenerator::new();
    generator
        .push_ok(insight_json(), 10)
        .push_ok(strategy_json(), 20);
    let (ctx, _dir) = context(&generator);
    let graph = build_primary_graph().unwrap();
    let initial = WorkflowState::new(brief("billboard_highway"));
    let (mut machine, _rx) = WorkflowStateMachine::new(initial.clone(), ctx.logger.clone());

    let err = run_graph(&graph, &mut machine, &ctx)
        .await
        .expect_err("unknown platform must abort");

    match err {
        WorkflowError::UnsupportedPlatform { platform } => {
            assert_eq!(platform, "billboard_highway")
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(generator.requests().is_empty());
    assert_eq!(generator.remaining(), 2);
    assert_eq!(machine.state(), &initial);
    assert_eq!(machine.state().total_llm_tokens(), 0);
}

#[tokio::test]
async fn test_variation_refines_once_then_finalizes() {
    let generator = ScriptedGenerator::new();
    push_preamble(&generator, PlatformKind::Video);
    generator.push_ok(approved_evaluation_json(), 5);
    let (ctx, _dir) = context(&generator);
    let primary = run_primary(WorkflowState::new(brief(VIDEO_PLATFORM)), &ctx)
        .await
        .expect("primary traversal succeeds");

    generator
        .push_ok(video_draft_json("Claim your streak"), 40)
        .push_ok(evaluation_json(3.5, 3, &["Lean harder on urgency"]), 5)
        .push_ok(video_draft_json("Claim your streak before midnight"), 9)
        .push_ok(evaluation_json(4.6, 5, &[]), 5);

    let outcome = run_variation(primary.state.clone(), &ctx)
        .await
        .expect("variation traversal succeeds");

    assert_eq!(
        outcome.steps,
        vec![
            StepKind::VariationGeneration,
            StepKind::VariationEvaluation,
            StepKind::VariationRefinement,
            StepKind::VariationEvaluation,
            StepKind::FinalizeVariation,
        ]
    );
    assert_eq!(outcome.termination, Some(Termination::Approved));

    let variation = outcome
        .state
        .single_variation_result()
        .expect("variation finalized");
    assert_eq!(variation.iteration_count(), 1);
    assert_eq!(
        variation.notes(),
        "Refined through 1 iterations with final quality score of 4.6/5.0"
    );
    assert_eq!(
        variation.draft().call_to_action_text(),
        "Claim your streak before midnight"
    );
    assert_eq!(outcome.state.variation_history().len(), 1);

    assert_eq!(outcome.state.script_draft(), primary.state.script_draft());
    assert_eq!(outcome.state.iteration_count(), 0);
    assert_eq!(outcome.state.total_llm_tokens(), 65 + 59);
}

#[tokio::test]
async fn test_exhausted_variation_still_finalizes() {
    let generator = ScriptedGenerator::new();
    push_preamble(&generator, PlatformKind::Static);
    generator.push_ok(approved_evaluation_json(), 5);
    let (ctx, _dir) = context(&generator);
    let primary = run_primary(WorkflowState::new(brief(STATIC_PLATFORM)), &ctx)
        .await
        .expect("primary traversal succeeds");

    generator.push_ok(static_draft_json("Variant"), 1);
    generator.push_ok(rejected_evaluation_json(), 1);
    for _ in 0..3 {
        generator
            .push_ok(static_draft_json("Variant again"), 1)
            .push_ok(rejected_evaluation_json(), 1);
    }

    let outcome = run_variation(primary.state, &ctx)
        .await
        .expect("variation traversal succeeds");

    assert_eq!(outcome.termination, Some(Termination::Exhausted));
    assert_eq!(outcome.steps.last(), Some(&StepKind::FinalizeVariation));
    let variation = outcome
        .state
        .single_variation_result()
        .expect("variation finalized");
    assert_eq!(variation.iteration_count(), 3);
    assert!(
        !variation
            .evaluation()
            .expect("evaluation kept")
            .is_approved_for_next_stage
    );
}

#[tokio::test]
async fn test_variation_requires_completed_primary() {
    let generator = ScriptedGenerator::new();
    let (ctx, _dir) = context(&generator);

    let err = run_variation(crate::testing::generated_state(VIDEO_PLATFORM), &ctx)
        .await
        .expect_err("primary evaluation missing");

    assert!(matches!(
        err.downcast_ref::<WorkflowError>(),
        Some(WorkflowError::Precondition {
            missing: "evaluation_report",
            ..
        })
    ));
    assert!(generator.requests().is_empty());
}

#[tokio::test]
async fn test_same_approvals_give_same_trace() {
    let mut traces = Vec::new();
    for _ in 0..2 {
        let generator = ScriptedGenerator::new();
        push_preamble(&generator, PlatformKind::Video);
        generator
            .push_ok(rejected_evaluation_json(), 5)
            .push_ok(video_draft_json("Again"), 5)
            .push_ok(rejected_evaluation_json(), 5)
            .push_ok(video_draft_json("Again"), 5)
            .push_ok(approved_evaluation_json(), 5);
        let (ctx, _dir) = context(&generator);
        let outcome = run_primary(WorkflowState::new(brief(VIDEO_PLATFORM)), &ctx)
            .await
            .expect("primary traversal succeeds");
        traces.push((outcome.steps, outcome.state.iteration_count()));
    }
    assert_eq!(traces[0], traces[1]);
    assert_eq!(traces[0].1, 2);
}

#[tokio::test]
async fn test_snapshots_track_progress() {
    let generator = ScriptedGenerator::new();
    push_preamble(&generator, PlatformKind::Video);
    generator.push_ok(approved_evaluation_json(), 5);
    let (ctx, _dir) = context(&generator);
    let graph = build_primary_graph().unwrap();
    let (mut machine, rx) =
        WorkflowStateMachine::new(WorkflowState::new(brief(VIDEO_PLATFORM)), ctx.logger.clone());

    run_graph(&graph, &mut machine, &ctx)
        .await
        .expect("primary traversal succeeds");

    let snapshot = rx.borrow().clone();
    assert_eq!(snapshot.phase, Phase::Done);
    assert_eq!(snapshot.total_llm_tokens, 65);
    assert!(snapshot.latest_approved);
}

#[tokio::test]
async fn test_traversal_is_logged() {
    let generator = ScriptedGenerator::new();
    push_preamble(&generator, PlatformKind::Video);
    generator.push_ok(approved_evaluation_json(), 5);
    let (ctx, _dir) = context(&generator);

    run_primary(WorkflowState::new(brief(VIDEO_PLATFORM)), &ctx)
        .await
        .expect("primary traversal succeeds");

    let log = std::fs::read_to_string(ctx.logger.path()).unwrap();
    assert!(log.contains("TraversalStart"));
    assert!(log.contains("\"result\":\"approved\""));
}

/// Plays one primary traversal for a sequence of evaluation outcomes and
/// token costs. Evaluations past the end of `approvals` reject. Returns the
/// outcome and the costs actually consumed.
fn play(platform: &str, approvals: &[bool], costs: &[u64]) -> (TraversalOutcome, Vec<u64>) {
    let kind = crate::domain::AdPlatform::from(platform.to_string())
        .kind()
        .unwrap();
    let generator = ScriptedGenerator::new();
    let mut costs = costs.iter().copied();
    let mut consumed = Vec::new();
    let mut next_cost = || {
        let cost = costs.next().unwrap_or(1);
        consumed.push(cost);
        cost
    };

    generator
        .push_ok(insight_json(), next_cost())
        .push_ok(strategy_json(), next_cost())
        .push_ok(draft_json(kind, "Start"), next_cost());
    for round in 0..4 {
        let approved = approvals.get(round).copied().unwrap_or(false);
        let report = if approved {
            approved_evaluation_json()
        } else {
            evaluation_json(2.0 + round as f64 * 0.5, 3, &["Revise the hook"])
        };
        generator.push_ok(report, next_cost());
        if approved || round >= 3 {
            break;
        }
        generator.push_ok(draft_json(kind, &format!("Round {}", round + 1)), next_cost());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let (ctx, _dir) = context(&generator);
    let outcome = runtime
        .block_on(run_primary(WorkflowState::new(brief(platform)), &ctx))
        .unwrap();
    assert_eq!(generator.remaining(), 0);
    (outcome, consumed)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_loop_invariants_hold_for_any_approval_sequence(
        approvals in prop::collection::vec(any::<bool>(), 1..6),
        costs in prop::collection::vec(0u64..5_000, 10),
        video in any::<bool>(),
    ) {
        let platform = if video { VIDEO_PLATFORM } else { STATIC_PLATFORM };
        let (outcome, consumed) = play(platform, &approvals, &costs);
        let state = &outcome.state;

        prop_assert_eq!(state.total_llm_tokens(), consumed.iter().sum::<u64>());

        // `play` rejects every evaluation past the end of `approvals`.
        let rejections_before_approval = approvals
            .iter()
            .copied()
            .chain(std::iter::repeat(false))
            .take(4)
            .take_while(|approved| !approved)
            .count() as u32;
        let expected_refinements = rejections_before_approval.min(3);
        prop_assert!(state.iteration_count() <= 3);
        prop_assert_eq!(state.iteration_count(), expected_refinements);

        let history = state.history();
        prop_assert_eq!(history.len() as u32, state.iteration_count());
        for (index, entry) in history.entries().iter().enumerate() {
            prop_assert_eq!(entry.iteration, index as u32 + 1);
            prop_assert_eq!(entry.previous_overall_score, 2.0 + index as f64 * 0.5);
            prop_assert_eq!(entry.output_snapshot.script_type, state.script_draft().unwrap().kind());
        }

        let expected_kind = if video { PlatformKind::Video } else { PlatformKind::Static };
        prop_assert_eq!(state.script_draft().unwrap().kind(), expected_kind);

        let report = state.evaluation_report().unwrap();
        if report.is_approved_for_next_stage {
            prop_assert!(report.meets_approval_threshold());
            prop_assert_eq!(outcome.termination, Some(Termination::Approved));
        } else {
            prop_assert_eq!(state.iteration_count(), 3);
            prop_assert_eq!(outcome.termination, Some(Termination::Exhausted));
        }
    }
}

#[test]
fn test_slot_refinement_mapping_matches_graph() {
    let graph = build_variation_graph().unwrap();
    assert!(graph
        .edge(StepKind::refinement(DraftSlot::Variation))
        .is_some());
}
