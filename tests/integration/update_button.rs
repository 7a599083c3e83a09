use super::{fixture, setup_workspace};
use patch_runner::presets;
use patch_runner::{PatchRunner, RuleStatus, RunOptions};
use std::fs;

const TARGET: &str = "src/components/Admin/AdminDashboard.css";

fn runner_for(workspace: &std::path::Path) -> PatchRunner {
    let script = presets::find("update-button").unwrap().load().unwrap();
    PatchRunner::from_script(&script, workspace).unwrap()
}

#[test]
fn test_matches_golden_output() {
    let (workspace, target) = setup_workspace(TARGET, &fixture("AdminDashboard.css"));

    let report = runner_for(workspace.path())
        .run(RunOptions::default())
        .unwrap();

    assert_eq!(report.outcomes[0].count, 1);
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        fixture("AdminDashboard.expected.css")
    );
}

#[test]
fn test_new_block_is_verbatim() {
    let (workspace, target) = setup_workspace(TARGET, &fixture("AdminDashboard.css"));

    runner_for(workspace.path())
        .run(RunOptions::default())
        .unwrap();

    let patched = fs::read_to_string(&target).unwrap();
    assert!(patched.contains(".create-product-btn::before {\n    content: '✨';"));
    assert!(patched.contains(".create-product-btn:active {\n    transform: translateY(-1px);\n}"));
    assert!(!patched.contains("var(--primary-dark)"));
    // Surrounding rules survive
    assert!(patched.starts_with(".admin-dashboard {"));
    assert!(patched.contains(".modal-overlay {"));
}

#[test]
fn test_hover_rule_missing_is_a_no_op() {
    let css = ".create-product-btn {\n    color: red;\n}\n";
    let (workspace, target) = setup_workspace(TARGET, css);

    let report = runner_for(workspace.path())
        .run(RunOptions::default())
        .unwrap();

    assert!(matches!(
        report.outcomes[0].status,
        RuleStatus::NoMatch { hint: None }
    ));
    assert!(!report.written);
    assert_eq!(fs::read_to_string(&target).unwrap(), css);
}

#[test]
fn test_crlf_stylesheet() {
    let crlf = fixture("AdminDashboard.css").replace('\n', "\r\n");
    let (workspace, target) = setup_workspace(TARGET, &crlf);

    runner_for(workspace.path())
        .run(RunOptions::default())
        .unwrap();

    let expected = fixture("AdminDashboard.expected.css").replace('\n', "\r\n");
    assert_eq!(fs::read_to_string(&target).unwrap(), expected);
}
