//! Risk scorer tests — formula accounting, clamp, zero case, and factor
//! explainability.

use codemend_analysis::rules::{RuleResult, Violation};
use codemend_analysis::scorer::compute_risk_score;
use codemend_core::{FxHashSet, Severity};
use proptest::prelude::*;

fn violation(rule_id: &str, severity: Severity, line: u32) -> Violation {
    let mut v = Violation::new(rule_id, severity, "test.py", line);
    v.title = format!("{rule_id} at {line}");
    v.description = "test".to_string();
    v.evidence = vec!["a".into(), "b".into(), "c".into()];
    v.affected_function = "f".to_string();
    v
}

fn result_of(violations: Vec<Violation>) -> RuleResult {
    RuleResult {
        violations,
        rules_executed: vec!["test".to_string()],
        total_files_scanned: 1,
        scan_duration_ms: 0.0,
    }
}

fn score(violations: Vec<Violation>) -> u32 {
    compute_risk_score(&result_of(violations), None, &FxHashSet::default()).total_score
}

#[test]
fn zero_violations_scores_zero() {
    let breakdown = compute_risk_score(&result_of(Vec::new()), None, &FxHashSet::default());
    assert_eq!(breakdown.total_score, 0);
    assert!(breakdown.violation_contributions.is_empty());
    assert_eq!(breakdown.max_possible_score, 0.0);
    assert_eq!(breakdown.summary, "No violations detected. Risk score is 0.");
}

#[test]
fn single_critical_with_no_factors_scores_fifty() {
    // base 10, factors 1.0, max_possible 20 → 50/100.
    let breakdown = compute_risk_score(
        &result_of(vec![violation("dangerous_eval", Severity::Critical, 1)]),
        None,
        &FxHashSet::default(),
    );
    assert_eq!(breakdown.total_score, 50);
    assert_eq!(breakdown.max_possible_score, 20.0);

    let contribution = &breakdown.violation_contributions[0];
    assert_eq!(contribution.base_weight, 10);
    assert_eq!(contribution.blast_radius_factor, 0.0);
    assert_eq!(contribution.state_mutation_factor, 0.0);
    assert_eq!(contribution.test_failure_factor, 0.0);
    assert_eq!(contribution.async_boundary_factor, 0.0);
    assert_eq!(contribution.total_factor, 1.0);
    assert_eq!(contribution.weighted_score, 10.0);
}

#[test]
fn race_condition_collects_state_and_async_factors() {
    // 10 × (1.0 + 0.2 + 0.2) = 14 of 20 → 70.
    let breakdown = compute_risk_score(
        &result_of(vec![violation("race_condition", Severity::Critical, 1)]),
        None,
        &FxHashSet::default(),
    );
    assert_eq!(breakdown.total_score, 70);
    let contribution = &breakdown.violation_contributions[0];
    assert_eq!(contribution.state_mutation_factor, 0.2);
    assert_eq!(contribution.async_boundary_factor, 0.2);
    assert_eq!(contribution.total_factor, 1.4);
}

#[test]
fn test_failure_factor_applies() {
    let mut failing = FxHashSet::default();
    failing.insert("missing_http_timeout".to_string());

    let with_failure = compute_risk_score(
        &result_of(vec![violation("missing_http_timeout", Severity::High, 1)]),
        None,
        &failing,
    );
    let without_failure = compute_risk_score(
        &result_of(vec![violation("missing_http_timeout", Severity::High, 1)]),
        None,
        &FxHashSet::default(),
    );
    assert!(with_failure.total_score > without_failure.total_score);
    assert_eq!(
        with_failure.violation_contributions[0].test_failure_factor,
        0.3
    );
}

#[test]
fn severity_orders_scores() {
    let critical = score(vec![violation("dangerous_eval", Severity::Critical, 1)]);
    let high = score(vec![violation("missing_http_timeout", Severity::High, 1)]);
    let medium = score(vec![violation("unsanitized_io", Severity::Medium, 1)]);
    let low = score(vec![violation("other", Severity::Low, 1)]);
    assert!(critical > high);
    assert!(high > medium);
    assert!(medium > low);
    assert!(low > 0);
}

#[test]
fn duplicating_violations_keeps_score_stable() {
    let one = score(vec![violation("dangerous_eval", Severity::Critical, 1)]);
    let two = score(vec![
        violation("dangerous_eval", Severity::Critical, 1),
        violation("dangerous_eval", Severity::Critical, 2),
    ]);
    assert_eq!(one, two);
}

#[test]
fn adding_a_critical_raises_a_low_score() {
    let low_only = score(vec![violation("other", Severity::Low, 1)]);
    let mixed = score(vec![
        violation("other", Severity::Low, 1),
        violation("dangerous_eval", Severity::Critical, 2),
    ]);
    assert!(mixed > low_only);
}

#[test]
fn hundred_criticals_stay_clamped() {
    let violations: Vec<Violation> = (0..100)
        .map(|i| violation("race_condition", Severity::Critical, i + 1))
        .collect();
    let breakdown = compute_risk_score(&result_of(violations), None, &FxHashSet::default());
    assert!(breakdown.total_score <= 100);
    assert!(breakdown.total_score > 0);
    assert_eq!(breakdown.violation_contributions.len(), 100);
}

#[test]
fn summary_counts_severities() {
    let breakdown = compute_risk_score(
        &result_of(vec![
            violation("dangerous_eval", Severity::Critical, 1),
            violation("missing_http_timeout", Severity::High, 2),
            violation("missing_http_timeout", Severity::High, 3),
        ]),
        None,
        &FxHashSet::default(),
    );
    assert!(breakdown.summary.contains("1 critical"));
    assert!(breakdown.summary.contains("2 high"));
    assert!(breakdown.summary.contains("3 violations"));
}

proptest! {
    #[test]
    fn score_is_always_clamped(
        count in 1usize..60,
        severity_ix in 0usize..4,
        test_failure in any::<bool>(),
    ) {
        let severity = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low][severity_ix];
        let violations: Vec<Violation> = (0..count)
            .map(|i| violation("race_condition", severity, i as u32 + 1))
            .collect();
        let mut failing = FxHashSet::default();
        if test_failure {
            failing.insert("race_condition".to_string());
        }
        let breakdown = compute_risk_score(&result_of(violations), None, &failing);
        prop_assert!(breakdown.total_score <= 100);
    }
}
