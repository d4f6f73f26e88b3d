//! End-to-end pipeline tests: unified diff + raw clang-tidy output in,
//! reconciled review or check-run payload out. No processes, no network.

use tidyrev::annotations::{MAX_ANNOTATIONS, build_check_run};
use tidyrev::diagnostics::{PathFilter, parse_diagnostics};
use tidyrev::diff::DiffIndex;
use tidyrev::reconcile::{ExistingComment, ReconcileOutcome, reconcile};
use tidyrev::review::{Review, build_review};

const DIFF: &str = "\
diff --git a/src/widget.cpp b/src/widget.cpp
--- a/src/widget.cpp
+++ b/src/widget.cpp
@@ -10,5 +10,6 @@ void Widget::reset() {
 void frob() {
   int x;
-  int* p = NULL;
+  int* p = 0;
+  use(p);
   done();
 }
@@ -40,2 +42,3 @@ void other() {
 a();
+b();
 c();
diff --git a/third_party/lib.cpp b/third_party/lib.cpp
--- a/third_party/lib.cpp
+++ b/third_party/lib.cpp
@@ -1,2 +1,3 @@
 x
+y
 z
";

// Lines 12 and 13 of src/widget.cpp are added by the first hunk, line 43 by
// the second.
const TIDY_OUTPUT: &str = "\
src/widget.cpp:12:12: warning: use nullptr [modernize-use-nullptr]
  int* p = 0;
           ^
           nullptr
src/widget.cpp:13:3: warning: do not call use() [misc-no-use]
  use(p);
  ^
src/widget.cpp:20:1: warning: off the diff [misc-unrelated]
third_party/lib.cpp:2:1: warning: excluded path [misc-x]
12345 warnings generated.
";

fn filter() -> PathFilter {
    let include: Vec<String> = vec!["*.cpp".into(), "*.h".into()];
    let exclude: Vec<String> = vec!["third_party/*".into()];
    PathFilter::new(&include, &exclude).unwrap()
}

fn review_from(diff: &str, tidy_output: &str) -> Review {
    let index = DiffIndex::parse(diff).unwrap();
    let diagnostics = parse_diagnostics(tidy_output, ".", &filter());
    build_review(&diagnostics, &index)
}

#[test]
fn warnings_on_changed_lines_become_comments() {
    let review = review_from(DIFF, TIDY_OUTPUT);

    // Line 20 is outside the diff, third_party is excluded.
    assert_eq!(review.comments.len(), 2);

    let first = &review.comments[0];
    assert_eq!(first.path, "src/widget.cpp");
    assert_eq!(first.line, 12);
    assert!(first.body.contains("use nullptr"));
    assert!(first.body.contains("modernize-use-nullptr"));
    assert!(
        first.body.contains("```suggestion\nnullptr\n```"),
        "fix-it below the caret becomes a suggestion: {}",
        first.body
    );

    let second = &review.comments[1];
    assert_eq!(second.line, 13);
    assert!(second.body.contains("do not call use()"));
    assert!(!second.body.contains("```suggestion"));
}

#[test]
fn first_run_posts_everything() {
    let review = review_from(DIFF, TIDY_OUTPUT);
    match reconcile(review, &[], 25) {
        ReconcileOutcome::Post { review, suppressed } => {
            assert_eq!(review.comments.len(), 2);
            assert_eq!(suppressed, 0);
            assert_eq!(review.body, "clang-tidy made some suggestions");
        }
        other => panic!("expected Post, got {other:?}"),
    }
}

#[test]
fn second_run_is_silent() {
    let first = review_from(DIFF, TIDY_OUTPUT);
    let posted = match reconcile(first, &[], 25) {
        ReconcileOutcome::Post { review, .. } => review,
        other => panic!("expected Post, got {other:?}"),
    };

    let existing: Vec<ExistingComment> = posted
        .comments
        .iter()
        .map(|c| ExistingComment {
            path: c.path.clone(),
            line: c.line,
            start_line: c.start_line,
            body: c.body.clone(),
        })
        .collect();

    let second = review_from(DIFF, TIDY_OUTPUT);
    assert_eq!(reconcile(second, &existing, 25), ReconcileOutcome::NothingNew);
}

#[test]
fn clean_output_is_clean_outcome() {
    let review = review_from(DIFF, "999 warnings generated.\n");
    assert!(review.is_empty());
    assert_eq!(reconcile(review, &[], 25), ReconcileOutcome::Clean);
}

#[test]
fn warnings_outside_diff_are_clean_too() {
    let tidy_output = "src/widget.cpp:999:1: warning: far away [misc-x]\n";
    let review = review_from(DIFF, tidy_output);
    assert!(review.is_empty());
    assert_eq!(reconcile(review, &[], 25), ReconcileOutcome::Clean);
}

#[test]
fn truncation_notes_suppressed_count() {
    // One warning per added line across both hunks of widget.cpp.
    let tidy_output = "\
src/widget.cpp:12:1: warning: one [misc-a]
src/widget.cpp:13:1: warning: two [misc-b]
src/widget.cpp:43:1: warning: three [misc-c]
";
    let review = review_from(DIFF, tidy_output);
    assert_eq!(review.comments.len(), 3);

    match reconcile(review, &[], 2) {
        ReconcileOutcome::Post { review, suppressed } => {
            assert_eq!(review.comments.len(), 2);
            assert_eq!(suppressed, 1);
            assert!(review.body.contains("1 comments suppressed"));
            // Stable order means the first two locations survive.
            assert_eq!(review.comments[0].line, 12);
            assert_eq!(review.comments[1].line, 13);
        }
        other => panic!("expected Post, got {other:?}"),
    }
}

#[test]
fn duplicate_diagnostics_collapse_to_one_comment() {
    // clang-tidy repeats header warnings once per including translation unit.
    let tidy_output = "\
src/widget.cpp:12:1: warning: repeated [misc-a]
src/widget.cpp:12:1: warning: repeated [misc-a]
src/widget.cpp:12:1: warning: repeated [misc-a]
";
    let review = review_from(DIFF, tidy_output);
    assert_eq!(review.comments.len(), 1);
    assert_eq!(review.comments[0].body.matches("repeated").count(), 1);
}

#[test]
fn check_run_payload_from_pipeline() {
    let review = review_from(DIFF, TIDY_OUTPUT);
    let payload = build_check_run(&review, "deadbeef");

    assert_eq!(payload.head_sha, "deadbeef");
    assert_eq!(payload.conclusion, "neutral");
    let output = payload.output.unwrap();
    assert_eq!(output.summary, "There were 2 warnings");
    assert!(output.annotations.len() <= MAX_ANNOTATIONS);
    assert_eq!(output.annotations[0].path, "src/widget.cpp");
    assert_eq!(output.annotations[0].end_line, 12);
}

#[test]
fn check_run_payload_clean() {
    let review = review_from(DIFF, "");
    let payload = build_check_run(&review, "deadbeef");
    assert_eq!(payload.conclusion, "success");
    assert!(payload.output.is_none());
}
