use super::{fixture, setup_workspace};
use patch_runner::presets;
use patch_runner::{PatchRunner, RuleStatus, RunError, RunOptions};
use std::fs;

const TARGET: &str = "src/components/Admin/AdminDashboard.tsx";

fn runner_for(workspace: &std::path::Path) -> PatchRunner {
    let script = presets::find("fix-image-upload").unwrap().load().unwrap();
    PatchRunner::from_script(&script, workspace).unwrap()
}

#[test]
fn test_matches_golden_output() {
    let (workspace, target) = setup_workspace(TARGET, &fixture("AdminDashboard.tsx"));

    let report = runner_for(workspace.path())
        .run(RunOptions::default())
        .unwrap();

    assert!(report.written);
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        fixture("AdminDashboard.expected.tsx")
    );
}

#[test]
fn test_every_rule_matches() {
    let (workspace, _target) = setup_workspace(TARGET, &fixture("AdminDashboard.tsx"));

    let report = runner_for(workspace.path()).plan().unwrap();

    let counts: Vec<(&str, usize)> = report
        .outcomes
        .iter()
        .map(|o| (o.id.as_str(), o.count))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("drop-upload-import", 1),
            ("image-url-state", 1),
            ("image-url-handler", 1),
            ("reset-image-url", 2),
            ("drop-upload-step", 1),
            ("image-field-fallback", 1),
            ("url-input-field", 1),
        ]
    );
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.status == RuleStatus::Applied));
}

#[test]
fn test_old_patterns_are_gone() {
    let (workspace, target) = setup_workspace(TARGET, &fixture("AdminDashboard.tsx"));

    runner_for(workspace.path())
        .run(RunOptions::default())
        .unwrap();

    let patched = fs::read_to_string(&target).unwrap();
    assert!(!patched.contains("uploadProductImage"));
    assert!(!patched.contains("imageFile"));
    assert!(!patched.contains("handleImageChange"));
    assert!(!patched.contains("type=\"file\""));
    assert!(patched.contains("const [imageUrl, setImageUrl] = useState('');"));
    assert!(patched.contains("onChange={handleImageUrlChange}"));
    assert!(patched.contains("image: imageUrl || editingProduct?.image || '',"));
}

#[test]
fn test_missing_import_is_a_no_op() {
    let original = fixture("AdminDashboard.tsx").replace(
        "import { uploadProductImage, createProduct, updateProduct, deleteProduct, toggleProductAvailability } from '../../services/adminService';\n",
        "",
    );
    let (workspace, target) = setup_workspace(TARGET, &original);

    let report = runner_for(workspace.path())
        .run(RunOptions::default())
        .unwrap();

    assert!(matches!(
        report.outcomes[0].status,
        RuleStatus::NoMatch { .. }
    ));
    assert_eq!(report.applied().count(), 6);

    let expected = fixture("AdminDashboard.expected.tsx").replace(
        "import { createProduct, updateProduct, deleteProduct, toggleProductAvailability } from '../../services/adminService';\n",
        "",
    );
    assert_eq!(fs::read_to_string(&target).unwrap(), expected);
}

#[test]
fn test_strict_mode_on_patched_file_leaves_it_alone() {
    let patched = fixture("AdminDashboard.expected.tsx");
    let (workspace, target) = setup_workspace(TARGET, &patched);

    let err = runner_for(workspace.path())
        .run(RunOptions {
            strict: true,
            dry_run: false,
        })
        .unwrap_err();

    match err {
        RunError::Unmatched { rules, .. } => {
            assert!(rules.contains(&"image-url-state".to_string()));
            // "image: imageUrl" still matches inside its own replacement
            assert!(!rules.contains(&"image-field-fallback".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read_to_string(&target).unwrap(), patched);
}

#[test]
fn test_drifted_state_line_gets_hint() {
    let original = fixture("AdminDashboard.tsx").replace(
        "const [imageFile, setImageFile] = useState<File | null>(null);",
        "const [imageFile, setImageFile] = useState<File | undefined>(undefined);",
    );
    let (workspace, _target) = setup_workspace(TARGET, &original);

    let report = runner_for(workspace.path()).plan().unwrap();

    let outcome = report
        .outcomes
        .iter()
        .find(|o| o.id == "image-url-state")
        .unwrap();
    match &outcome.status {
        RuleStatus::NoMatch { hint: Some(hint) } => {
            assert_eq!(hint.line, 11);
            assert!(hint.text.contains("useState<File | undefined>"));
        }
        other => panic!("expected a drift hint, got {other:?}"),
    }
}
