//! Runner behaviour against a stub browser

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use test_case::test_case;
use uicheck_e2e::report::ArtifactKind;
use uicheck_e2e::{Presence, RunnerConfig, Scenario, ScenarioRunner, ScenarioStatus};

use common::{PageModel, StubDriver};

fn runner_with(driver: &Arc<StubDriver>, out_dir: &std::path::Path, config: RunnerConfig) -> ScenarioRunner {
    ScenarioRunner::new(
        driver.clone(),
        RunnerConfig {
            out_dir: out_dir.to_path_buf(),
            ..config
        },
    )
}

fn scenario(yaml: &str) -> Scenario {
    Scenario::from_yaml(yaml).unwrap().remove(0)
}

const LOGIN: &str = r##"
name: login
steps:
  - action: navigate
    url: /login
  - action: fill
    target: "#email"
    value: a@b.com
  - action: fill
    target: "#pass"
    value: x
  - action: click
    target: button[type=submit]
  - action: wait_for_selector
    selector: .dashboard
    timeout_ms: 5000
"##;

#[tokio::test]
async fn test_empty_scenario_passes() {
    let out = tempfile::tempdir().unwrap();
    let driver = Arc::new(StubDriver::new(PageModel::default()));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let report = runner.run(&scenario("name: nothing\n")).await;

    assert_eq!(report.status, ScenarioStatus::Passed);
    assert!(report.steps.is_empty());
    assert!(report.artifacts.is_empty());
    assert_eq!(driver.spy.opened(), 1);
    assert_eq!(driver.spy.closed(), 1);
}

#[tokio::test]
async fn test_login_passes_when_every_condition_holds() {
    let out = tempfile::tempdir().unwrap();
    let driver = Arc::new(StubDriver::new(PageModel::default()));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let report = runner.run(&scenario(LOGIN)).await;

    assert_eq!(report.status, ScenarioStatus::Passed);
    assert_eq!(report.steps.len(), 5);
    assert!(report.steps.iter().all(|s| s.success));
    assert_eq!(report.failing_step, None);
    assert_eq!(
        driver.spy.calls()[..4],
        [
            "goto:http://localhost:3000/login",
            "fill:#email=a@b.com",
            "fill:#pass=x",
            "click:button[type=submit]",
        ]
    );
    assert_eq!(driver.spy.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_login_times_out_when_dashboard_never_appears() {
    let out = tempfile::tempdir().unwrap();
    let model = PageModel::default().with(".dashboard", Presence::Absent);
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let report = runner.run(&scenario(LOGIN)).await;

    assert_eq!(report.status, ScenarioStatus::Timeout);
    assert_eq!(report.failing_step, Some(4));
    assert_eq!(report.steps.len(), 5);
    assert_eq!(report.steps[4].error_kind.as_deref(), Some("timeout"));

    let diagnostic: Vec<_> = report
        .artifacts
        .iter()
        .filter(|a| a.kind == ArtifactKind::Diagnostic)
        .collect();
    assert_eq!(diagnostic.len(), 1);
    assert_eq!(diagnostic[0].path, out.path().join("login-4.png"));
    assert!(diagnostic[0].path.exists());
    assert!(diagnostic[0].sha256.is_some());
    assert_eq!(driver.spy.closed(), 1);
}

#[test_case(0 ; "first step")]
#[test_case(2 ; "middle step")]
#[test_case(4 ; "last step")]
#[tokio::test]
async fn test_fail_fast_stops_after_failing_step(k: usize) {
    let out = tempfile::tempdir().unwrap();
    let failing = format!("#s{}", k);
    let model = PageModel::default().with(&failing, Presence::Absent);
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let steps: String = (0..5)
        .map(|i| format!("  - action: assert_visible\n    target: \"#s{}\"\n", i))
        .collect();
    let report = runner
        .run(&scenario(&format!("name: steps\nsteps:\n{}", steps)))
        .await;

    assert_eq!(report.status, ScenarioStatus::Failed);
    assert_eq!(report.steps.len(), k + 1);
    assert_eq!(report.failing_step, Some(k));
    assert!(report.error.as_deref().unwrap().contains("not in the DOM"));

    // Steps after k never touched the page.
    let probes: Vec<_> = driver
        .spy
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("probe:"))
        .collect();
    let expected: Vec<_> = (0..=k).map(|i| format!("probe:#s{}", i)).collect();
    assert_eq!(probes, expected);
    assert_eq!(driver.spy.closed(), 1);
}

#[tokio::test]
async fn test_panicking_step_is_errored_and_session_released() {
    let out = tempfile::tempdir().unwrap();
    let model = PageModel {
        panic_on_click: vec!["#boom".to_string()],
        ..Default::default()
    };
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let report = runner
        .run(&scenario(
            "name: crash\nsteps:\n  - action: click\n    target: \"#boom\"\n  - action: go_back\n",
        ))
        .await;

    assert_eq!(report.status, ScenarioStatus::Errored);
    assert_eq!(report.steps.len(), 1);
    assert!(report.error.unwrap().contains("stub page crashed"));
    assert_eq!(driver.spy.closed(), 1);
    assert!(!driver.spy.calls().contains(&"go_back".to_string()));
}

#[tokio::test]
async fn test_panic_in_terminal_expectation_still_releases_session() {
    let out = tempfile::tempdir().unwrap();
    let model = PageModel {
        panic_on_probe: vec!["#x".to_string()],
        ..Default::default()
    };
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let suite = runner
        .run_all(vec![scenario("name: e\nexpect:\n  visible: \"#x\"\n")])
        .await;

    let report = &suite.reports[0];
    assert_eq!(report.status, ScenarioStatus::Errored);
    assert!(report.error.as_deref().unwrap().contains("stub page crashed probing #x"));
    assert_eq!(driver.spy.opened(), 1);
    assert_eq!(driver.spy.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wait_rides_out_probe_errors_during_navigation() {
    let out = tempfile::tempdir().unwrap();
    let model = PageModel {
        failing_probes: 3,
        ..Default::default()
    };
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let report = runner.run(&scenario(LOGIN)).await;

    assert_eq!(report.status, ScenarioStatus::Passed);
    let probes = driver.spy.calls().iter().filter(|c| c.starts_with("probe:")).count();
    assert_eq!(probes, 4);
}

#[tokio::test(start_paused = true)]
async fn test_wait_reports_last_probe_error_on_timeout() {
    let out = tempfile::tempdir().unwrap();
    let model = PageModel {
        failing_probes: usize::MAX,
        ..Default::default()
    };
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let report = runner.run(&scenario(LOGIN)).await;

    assert_eq!(report.status, ScenarioStatus::Timeout);
    assert_eq!(report.failing_step, Some(4));
    let error = report.steps[4].error.as_deref().unwrap();
    assert!(error.contains(".dashboard"));
    assert!(error.contains("last error: Unexpected error: Execution context was destroyed"));
}

#[tokio::test]
async fn test_accepted_dialogs_land_in_step_log() {
    let out = tempfile::tempdir().unwrap();
    let model = PageModel {
        click_dialogs: HashMap::from([("#book".to_string(), "Réservation confirmée".to_string())]),
        ..Default::default()
    };
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let report = runner
        .run(&scenario(
            "name: booking\nsteps:\n  - action: click\n    target: \"#book\"\n  - action: go_back\n",
        ))
        .await;

    assert_eq!(report.status, ScenarioStatus::Passed);
    assert_eq!(report.steps[0].dialogs, vec!["Réservation confirmée".to_string()]);
    assert!(report.steps[1].dialogs.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_overall_deadline_times_out_scenario() {
    let out = tempfile::tempdir().unwrap();
    let model = PageModel {
        hang_on_click: vec!["#spinner".to_string()],
        ..Default::default()
    };
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(
        &driver,
        out.path(),
        RunnerConfig {
            default_timeout: Duration::from_secs(60),
            deadline: Some(Duration::from_secs(2)),
            ..Default::default()
        },
    );

    let report = runner
        .run(&scenario(
            "name: stuck\nbest_effort: true\nsteps:\n  - action: click\n    target: \"#spinner\"\n  - action: go_back\n",
        ))
        .await;

    assert_eq!(report.status, ScenarioStatus::Timeout);
    assert_eq!(report.failing_step, Some(0));
    assert!(report.error.unwrap().contains("overall deadline"));
    // Deadline stops even a best-effort scenario.
    assert_eq!(report.steps.len(), 1);
    assert_eq!(driver.spy.closed(), 1);
}

#[tokio::test]
async fn test_best_effort_keeps_going() {
    let out = tempfile::tempdir().unwrap();
    let model = PageModel::default().with("#missing", Presence::Absent);
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let report = runner
        .run(&scenario(
            r##"
name: tolerant
best_effort: true
steps:
  - action: assert_visible
    target: "#here"
  - action: click
    target: "#missing"
  - action: screenshot
"##,
        ))
        .await;

    assert_eq!(report.status, ScenarioStatus::Failed);
    assert_eq!(report.steps.len(), 3);
    assert_eq!(report.failing_step, Some(1));
    assert_eq!(report.steps[1].error_kind.as_deref(), Some("element_not_found"));
    assert!(report.steps[2].success);
    assert_eq!(
        report.steps[2].screenshot_path.as_deref(),
        Some(out.path().join("tolerant-2.png").as_path())
    );
    let kinds: Vec<_> = report.artifacts.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![ArtifactKind::Diagnostic, ArtifactKind::Screenshot]);
}

#[tokio::test]
async fn test_visibility_assertions_tell_hidden_from_absent() {
    let out = tempfile::tempdir().unwrap();
    let model = PageModel::default()
        .with("text=\"Province\"", Presence::Hidden)
        .with("#gone", Presence::Absent);
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let hidden_ok = r##"
name: hidden
steps:
  - action: assert_hidden
    target: { text: Province, exact: true }
  - action: assert_hidden
    target: "#gone"
  - action: assert_absent
    target: "#gone"
"##;
    assert_eq!(runner.run(&scenario(hidden_ok)).await.status, ScenarioStatus::Passed);

    let absent_fails = r##"
name: absent
steps:
  - action: assert_absent
    target: { text: Province, exact: true }
"##;
    let report = runner.run(&scenario(absent_fails)).await;
    assert_eq!(report.status, ScenarioStatus::Failed);
    assert!(report.error.unwrap().contains("present in the DOM"));

    let visible_fails = r##"
name: visible
steps:
  - action: assert_visible
    target: { text: Province, exact: true }
"##;
    let report = runner.run(&scenario(visible_fails)).await;
    assert!(report.error.unwrap().contains("in the DOM but not visible"));
}

#[tokio::test]
async fn test_url_steps_and_terminal_expectation() {
    let out = tempfile::tempdir().unwrap();
    let mut model = PageModel::default();
    model.click_navigates.insert(
        "role=button[name=Réserver]".to_string(),
        "http://localhost:3000/checkout?session=1".to_string(),
    );
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let booking = r##"
name: booking
url: /formation/42
expect:
  url_matches: /checkout
  visible: "#vatNumber"
steps:
  - action: assert_url_matches
    pattern: /formation/\d+$
  - action: click
    target: { role: button, name: Réserver }
  - action: wait_for_url
    pattern: /checkout
    timeout_ms: 1000
"##;
    let report = runner.run(&scenario(booking)).await;
    assert_eq!(report.status, ScenarioStatus::Passed, "{:?}", report.error);
    assert_eq!(report.steps.len(), 3);

    let wrong_expectation = r##"
name: booking-expect
url: /formation/42
expect:
  url_matches: /confirmation
"##;
    let report = runner.run(&scenario(wrong_expectation)).await;
    assert_eq!(report.status, ScenarioStatus::Failed);
    assert_eq!(report.failing_step, None);
    assert!(report.error.unwrap().starts_with("terminal expectation"));
    assert_eq!(report.artifacts.len(), 1);
    assert_eq!(driver.spy.closed(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_all_keeps_input_order_when_concurrent() {
    let out = tempfile::tempdir().unwrap();
    let mut model = PageModel::default();
    for (target, ms) in [("#slow", 300), ("#medium", 200), ("#fast", 100)] {
        model
            .click_delay
            .insert(target.to_string(), Duration::from_millis(ms));
    }
    let driver = Arc::new(StubDriver::new(model));
    let runner = runner_with(
        &driver,
        out.path(),
        RunnerConfig {
            jobs: 3,
            ..Default::default()
        },
    );

    let scenarios: Vec<Scenario> = ["slow", "medium", "fast"]
        .iter()
        .map(|name| scenario(&format!("name: {0}\nsteps:\n  - action: click\n    target: \"#{0}\"\n", name)))
        .collect();

    let suite = runner.run_all(scenarios).await;

    let names: Vec<_> = suite.reports.iter().map(|r| r.scenario.as_str()).collect();
    assert_eq!(names, ["slow", "medium", "fast"]);
    assert_eq!(suite.passed, 3);
    assert_eq!(suite.exit_code(), 0);
    // Ran side by side: well under the 600ms a sequential run takes.
    assert!(suite.duration_ms < 600, "took {} ms", suite.duration_ms);
    assert_eq!(driver.spy.opened(), 3);
    assert_eq!(driver.spy.closed(), 3);
}

#[tokio::test]
async fn test_run_all_survives_setup_failure() {
    let out = tempfile::tempdir().unwrap();
    let driver = Arc::new(StubDriver::new(PageModel::default()).failing_setup_for("/broken"));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let scenarios = Scenario::from_yaml(
        r##"
version: 1
scenarios:
  - name: first
    url: /ok
  - name: broken
    url: /broken
  - name: last
    url: /ok
"##,
    )
    .unwrap();

    let suite = runner.run_all(scenarios).await;

    let statuses: Vec<_> = suite.reports.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [ScenarioStatus::Passed, ScenarioStatus::Errored, ScenarioStatus::Passed]
    );
    assert!(suite.reports[1].error.as_deref().unwrap().contains("chromium did not start"));
    assert_eq!(suite.exit_code(), 1);
    // No session was opened for the broken scenario, so none to close.
    assert_eq!(driver.spy.opened(), 2);
    assert_eq!(driver.spy.closed(), 2);
}

#[tokio::test]
async fn test_results_file_written() {
    let out = tempfile::tempdir().unwrap();
    let driver = Arc::new(StubDriver::new(PageModel::default()));
    let runner = runner_with(&driver, out.path(), RunnerConfig::default());

    let suite = runner.run_all(vec![scenario(LOGIN)]).await;
    let path = suite.write(out.path()).unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["reports"][0]["status"], "passed");
    assert_eq!(json["reports"][0]["steps"].as_array().unwrap().len(), 5);
}
