use std::fs;
use std::path::Path;

use artifact_courier::comment::CommentOutcome;
use artifact_courier::config::{PublishConfig, RepoSlug, Toggle};
use artifact_courier::context::RunContext;
use artifact_courier::contract::{
    IssueComment, MockCommentStore, MockContentStore, StoredFile, TargetLocation,
};
use artifact_courier::error::{PublishError, RemoteApiError};
use artifact_courier::publish::{publish, resolve_target, PublishReport};
use mockall::Sequence;
use tempfile::tempdir;

const BOT: &str = "github-actions[bot]";

fn base_config(artifacts: Vec<String>) -> PublishConfig {
    PublishConfig {
        commit: "abcdef123456".to_string(),
        repo_token: "local-token".to_string(),
        artifacts,
        artifacts_token: "local-token".to_string(),
        artifacts_repo: None,
        artifacts_branch: None,
        artifacts_dir: "ci".to_string(),
        inter_link: Toggle::Disabled,
        post_comment: Toggle::Enabled,
        title: "Artifacts".to_string(),
    }
}

fn context() -> RunContext {
    RunContext::new(RepoSlug::new("octo", "app"), Some(42))
}

fn write_artifacts(dir: &Path, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, name.as_bytes()).unwrap();
            path.to_string_lossy().into_owned()
        })
        .collect()
}

/// A content store that accepts every write and reports no prior files.
fn accepting_store(default_branch: &'static str) -> MockContentStore {
    let mut store = MockContentStore::new();
    store
        .expect_default_branch()
        .returning(move |_| Ok(default_branch.to_string()));
    store.expect_file_revision().returning(|_, _| Ok(None));
    store.expect_put_file().returning(|_, req| {
        Ok(StoredFile {
            path: req.path,
            revision: "sha".to_string(),
            commit: None,
        })
    });
    store
}

fn comment(id: u64, login: &str, body: &str) -> IssueComment {
    IssueComment {
        id,
        author_login: login.to_string(),
        body: body.to_string(),
    }
}

#[tokio::test]
async fn test_empty_artifact_list_makes_no_remote_calls() {
    let config = base_config(vec![]);

    let mut contents = MockContentStore::new();
    contents.expect_default_branch().never();
    contents.expect_file_revision().never();
    contents.expect_put_file().never();
    let mut comments = MockCommentStore::new();
    comments.expect_list_comments().never();
    comments.expect_update_comment().never();
    comments.expect_create_comment().never();

    let report = publish(&config, &context(), &contents, &comments)
        .await
        .expect("empty list is not an error");
    assert_eq!(report, PublishReport::Skipped);
}

#[tokio::test]
async fn test_report_lists_every_artifact_in_order() {
    let tmp = tempdir().unwrap();
    let artifacts = write_artifacts(
        tmp.path(),
        &["out/a/b/c/first.apk", "second.txt", "nested/dir/third.html"],
    );
    let mut config = base_config(artifacts.clone());
    config.post_comment = Toggle::Disabled;

    let contents = accepting_store("main");
    let mut comments = MockCommentStore::new();
    comments.expect_list_comments().never();

    let report = publish(&config, &context(), &contents, &comments)
        .await
        .expect("publish should succeed");
    let summary = match report {
        PublishReport::Published(summary) => summary,
        PublishReport::Skipped => panic!("expected a published report"),
    };

    assert!(summary.comment.is_none());
    assert_eq!(summary.artifacts.len(), 3);

    let bullets: Vec<&str> = summary
        .body
        .lines()
        .filter(|line| line.starts_with("* "))
        .collect();
    assert_eq!(bullets.len(), 3);
    assert!(bullets[0].starts_with("* [`b/c/first.apk`]("));
    assert!(bullets[1].contains("/second.txt`]("));
    assert!(bullets[2].starts_with("* [`nested/dir/third.html`]("));

    for (artifact, uploaded) in artifacts.iter().zip(&summary.artifacts) {
        assert_eq!(&uploaded.source_path, artifact);
        let expected_suffix = format!("{}?raw=true", uploaded.storage_path);
        assert!(uploaded.link.ends_with(&expected_suffix));
        assert!(uploaded.storage_path.starts_with("ci/"));
    }

    assert!(summary.body.starts_with("## Artifacts\n"));
    assert!(summary.body.ends_with("\nsynchronized with abcdef123456"));
}

#[tokio::test]
async fn test_unset_branch_and_repo_fall_back_to_defaults() {
    let config = base_config(vec!["unused".to_string()]);

    let mut contents = MockContentStore::new();
    contents
        .expect_default_branch()
        .times(1)
        .withf(|repo| repo.owner == "octo" && repo.name == "app")
        .returning(|_| Ok("trunk".to_string()));

    let target = resolve_target(&config, &context(), &contents)
        .await
        .expect("target should resolve");
    assert_eq!(
        target,
        TargetLocation {
            repo: RepoSlug::new("octo", "app"),
            branch: "trunk".to_string(),
        }
    );
}

#[tokio::test]
async fn test_explicit_repo_and_branch_skip_lookup() {
    let mut config = base_config(vec!["unused".to_string()]);
    config.artifacts_repo = Some(RepoSlug::new("octo", "artifact-store"));
    config.artifacts_branch = Some("builds".to_string());

    let mut contents = MockContentStore::new();
    contents.expect_default_branch().never();

    let target = resolve_target(&config, &context(), &contents)
        .await
        .expect("target should resolve");
    assert_eq!(target.repo, RepoSlug::new("octo", "artifact-store"));
    assert_eq!(target.branch, "builds");
}

#[tokio::test]
async fn test_existing_bot_comment_is_updated() {
    let tmp = tempdir().unwrap();
    let artifacts = write_artifacts(tmp.path(), &["app.apk"]);
    let config = base_config(artifacts);

    let contents = accepting_store("main");
    let mut comments = MockCommentStore::new();
    comments.expect_list_comments().times(1).returning(|_, _| {
        Ok(vec![
            comment(10, "reviewer", "## Artifacts please"),
            comment(11, BOT, "## Coverage report"),
            comment(12, BOT, "## Artifacts\n* old link"),
            comment(13, BOT, "## Artifacts\n* stale duplicate"),
        ])
    });
    comments
        .expect_update_comment()
        .times(1)
        .withf(|repo, id, body| {
            repo.name == "app" && *id == 12 && body.contains("synchronized with abcdef123456")
        })
        .returning(|_, _, _| Ok(()));
    comments.expect_create_comment().never();

    let report = publish(&config, &context(), &contents, &comments)
        .await
        .expect("publish should succeed");
    match report {
        PublishReport::Published(summary) => {
            assert_eq!(summary.comment, Some(CommentOutcome::Updated(12)))
        }
        PublishReport::Skipped => panic!("expected a published report"),
    }
}

#[tokio::test]
async fn test_new_comment_is_created_when_none_matches() {
    let tmp = tempdir().unwrap();
    let artifacts = write_artifacts(tmp.path(), &["app.apk"]);
    let config = base_config(artifacts);

    let contents = accepting_store("main");
    let mut comments = MockCommentStore::new();
    comments
        .expect_list_comments()
        .times(1)
        .withf(|_, issue| *issue == 42)
        .returning(|_, _| Ok(vec![comment(1, "reviewer", "## Artifacts look fine")]));
    comments.expect_update_comment().never();
    comments
        .expect_create_comment()
        .times(1)
        .withf(|_, issue, body| *issue == 42 && body.starts_with("## Artifacts\n"))
        .returning(|_, _, _| Ok(99));

    let report = publish(&config, &context(), &contents, &comments)
        .await
        .expect("publish should succeed");
    match report {
        PublishReport::Published(summary) => {
            assert_eq!(summary.comment, Some(CommentOutcome::Created(99)))
        }
        PublishReport::Skipped => panic!("expected a published report"),
    }
}

#[tokio::test]
async fn test_uploads_run_in_listed_order_before_comment() {
    let tmp = tempdir().unwrap();
    let artifacts = write_artifacts(tmp.path(), &["one.bin", "two.bin"]);
    let config = base_config(artifacts);

    let mut seq = Sequence::new();
    let mut contents = MockContentStore::new();
    contents
        .expect_default_branch()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("main".to_string()));
    for name in ["one.bin", "two.bin"] {
        contents
            .expect_file_revision()
            .times(1)
            .in_sequence(&mut seq)
            .withf(move |_, path| path.ends_with(name))
            .returning(|_, _| Ok(None));
        contents
            .expect_put_file()
            .times(1)
            .in_sequence(&mut seq)
            .withf(move |_, req| req.path.ends_with(name))
            .returning(|_, req| {
                Ok(StoredFile {
                    path: req.path,
                    revision: "sha".to_string(),
                    commit: None,
                })
            });
    }

    let mut comments = MockCommentStore::new();
    comments
        .expect_list_comments()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(vec![]));
    comments
        .expect_create_comment()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(5));

    publish(&config, &context(), &contents, &comments)
        .await
        .expect("publish should succeed");
}

#[tokio::test]
async fn test_missing_artifact_aborts_without_comment() {
    let tmp = tempdir().unwrap();
    let mut artifacts = write_artifacts(tmp.path(), &["present.bin"]);
    artifacts.push(tmp.path().join("absent.bin").to_string_lossy().into_owned());
    artifacts.extend(write_artifacts(tmp.path(), &["never-reached.bin"]));
    let config = base_config(artifacts);

    let mut contents = MockContentStore::new();
    contents
        .expect_default_branch()
        .returning(|_| Ok("main".to_string()));
    contents.expect_file_revision().times(1).returning(|_, _| Ok(None));
    contents.expect_put_file().times(1).returning(|_, req| {
        Ok(StoredFile {
            path: req.path,
            revision: "sha".to_string(),
            commit: None,
        })
    });
    let mut comments = MockCommentStore::new();
    comments.expect_list_comments().never();
    comments.expect_create_comment().never();
    comments.expect_update_comment().never();

    let err = publish(&config, &context(), &contents, &comments)
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::LocalFileNotFound { .. }));
}

#[tokio::test]
async fn test_posting_without_issue_fails_before_uploading() {
    let config = base_config(vec!["anything.bin".to_string()]);
    let context = RunContext::new(RepoSlug::new("octo", "app"), None);

    let mut contents = MockContentStore::new();
    contents.expect_default_branch().never();
    contents.expect_put_file().never();
    let comments = MockCommentStore::new();

    let err = publish(&config, &context, &contents, &comments)
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::MissingContext(_)));
}

#[tokio::test]
async fn test_default_branch_failure_aborts_run() {
    let config = base_config(vec!["anything.bin".to_string()]);

    let mut contents = MockContentStore::new();
    contents
        .expect_default_branch()
        .returning(|_| Err(RemoteApiError::new("get repository", Some(404), "Not Found")));
    contents.expect_put_file().never();
    let comments = MockCommentStore::new();

    let err = publish(&config, &context(), &contents, &comments)
        .await
        .unwrap_err();
    match err {
        PublishError::Remote(e) => assert_eq!(e.status, Some(404)),
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_comment_listing_failure_is_fatal_after_uploads() {
    let tmp = tempdir().unwrap();
    let artifacts = write_artifacts(tmp.path(), &["app.apk"]);
    let config = base_config(artifacts);

    let mut contents = MockContentStore::new();
    contents
        .expect_default_branch()
        .returning(|_| Ok("main".to_string()));
    contents.expect_file_revision().returning(|_, _| Ok(None));
    contents.expect_put_file().times(1).returning(|_, req| {
        Ok(StoredFile {
            path: req.path,
            revision: "sha".to_string(),
            commit: None,
        })
    });

    let mut comments = MockCommentStore::new();
    comments.expect_list_comments().times(1).returning(|_, _| {
        Err(RemoteApiError::new(
            "list comments",
            Some(403),
            "Resource not accessible by integration",
        ))
    });
    comments.expect_update_comment().never();
    comments.expect_create_comment().never();

    let err = publish(&config, &context(), &contents, &comments)
        .await
        .unwrap_err();
    match err {
        PublishError::Remote(e) => {
            assert_eq!(e.status, Some(403));
            assert_eq!(e.operation, "list comments");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_comment_update_failure_is_fatal_without_fallback_create() {
    let tmp = tempdir().unwrap();
    let artifacts = write_artifacts(tmp.path(), &["app.apk"]);
    let config = base_config(artifacts);

    let contents = accepting_store("main");
    let mut comments = MockCommentStore::new();
    comments
        .expect_list_comments()
        .times(1)
        .returning(|_, _| Ok(vec![comment(12, BOT, "## Artifacts\n* old link")]));
    comments
        .expect_update_comment()
        .times(1)
        .withf(|_, id, _| *id == 12)
        .returning(|_, _, _| Err(RemoteApiError::new("update comment", Some(422), "Validation Failed")));
    comments.expect_create_comment().never();

    let err = publish(&config, &context(), &contents, &comments)
        .await
        .unwrap_err();
    match err {
        PublishError::Remote(e) => assert_eq!(e.status, Some(422)),
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_comment_create_failure_is_fatal() {
    let tmp = tempdir().unwrap();
    let artifacts = write_artifacts(tmp.path(), &["app.apk"]);
    let config = base_config(artifacts);

    let contents = accepting_store("main");
    let mut comments = MockCommentStore::new();
    comments.expect_list_comments().times(1).returning(|_, _| Ok(vec![]));
    comments.expect_update_comment().never();
    comments
        .expect_create_comment()
        .times(1)
        .returning(|_, _, _| Err(RemoteApiError::new("create comment", None, "connection reset")));

    let err = publish(&config, &context(), &contents, &comments)
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Remote(ref e) if e.status.is_none()));
}
