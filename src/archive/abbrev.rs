//! Flattening of archived resources into one-line CSV rows.

use serde_json::Value;
use tracing::debug;

use crate::github::{CommentView, CommitView, PullView};

/// Comment bodies are cut to this many characters in the CSV summary.
pub const BODY_CHAR_LIMIT: usize = 400;

/// Escape newlines as the two characters `\n`, then truncate to `BODY_CHAR_LIMIT` chars.
pub fn body_for_csv(body: &str) -> String {
    body.replace('\n', "\\n")
        .chars()
        .take(BODY_CHAR_LIMIT)
        .collect()
}

/// `(author, created_at, truncated_body, html_url, id, path_or_empty)`
pub fn comment_row(comment: &CommentView) -> [String; 6] {
    [
        comment
            .user
            .as_ref()
            .map(|user| user.login.clone())
            .unwrap_or_default(),
        comment.created_at.clone(),
        body_for_csv(&comment.body),
        comment.html_url.clone(),
        comment.id.to_string(),
        comment.path.clone().unwrap_or_default(),
    ]
}

/// `(sha, author_date, author_name, comma_joined_filenames)`
pub fn commit_row(commit: &CommitView) -> [String; 4] {
    let files: Vec<&str> = commit.files.iter().map(|f| f.filename.as_str()).collect();
    [
        commit.sha.clone(),
        commit.commit.author.date.clone(),
        commit_author_name(commit),
        files.join(","),
    ]
}

/// Platform login when GitHub linked the commit to an account, else the git author name.
pub fn commit_author_name(commit: &CommitView) -> String {
    match commit.author.as_ref() {
        Some(Value::Object(account)) if !account.is_empty() => account
            .get("login")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => commit.commit.author.name.clone(),
    }
}

/// `(number, created_at, author, title, comma_joined_labels, closed_at, merged_at, merged_by)`
pub fn pull_row(pull: &PullView) -> [String; 8] {
    let labels: Vec<&str> = pull.labels.iter().map(|l| l.name.as_str()).collect();
    let (merged_at, merged_by) = if pull.merged {
        (pull.merged_at.clone().unwrap_or_default(), merged_by_login(pull))
    } else {
        (String::new(), String::new())
    };

    [
        pull.number.to_string(),
        pull.created_at.clone(),
        pull.user
            .as_ref()
            .map(|user| user.login.clone())
            .unwrap_or_default(),
        pull.title.clone(),
        labels.join(","),
        pull.closed_at.clone().unwrap_or_default(),
        merged_at,
        merged_by,
    ]
}

fn merged_by_login(pull: &PullView) -> String {
    let login = pull
        .merged_by
        .as_ref()
        .and_then(|user| user.get("login"))
        .and_then(Value::as_str);
    match login {
        Some(login) => login.to_string(),
        None => {
            // Accounts deleted since merging come back null.
            debug!(pr = pull.number, "merging user is not accessible");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comment(value: Value) -> CommentView {
        serde_json::from_value(value).unwrap()
    }

    fn pull(value: Value) -> PullView {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_long_body_truncated_to_limit() {
        let body = "a".repeat(500);
        assert_eq!(body_for_csv(&body).chars().count(), 400);
    }

    #[test]
    fn test_short_body_untouched() {
        assert_eq!(body_for_csv("ACK 1234abcd"), "ACK 1234abcd");
    }

    #[test]
    fn test_newline_escaped() {
        let rendered = body_for_csv("utACK\nlooks good");
        assert_eq!(rendered, "utACK\\nlooks good");
        assert!(!rendered.contains('\n'));
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let body = "é".repeat(450);
        let rendered = body_for_csv(&body);
        assert_eq!(rendered.chars().count(), 400);
    }

    #[test]
    fn test_comment_without_user_has_empty_author() {
        let row = comment_row(&comment(json!({
            "id": 99,
            "user": null,
            "created_at": "2015-06-01T00:00:00Z",
            "body": "Concept ACK",
            "html_url": "https://github.com/o/r/pull/1#issuecomment-99"
        })));
        assert_eq!(row[0], "");
        assert_eq!(row[4], "99");
        assert_eq!(row[5], "");
    }

    #[test]
    fn test_review_comment_row_keeps_path() {
        let row = comment_row(&comment(json!({
            "id": 5,
            "user": { "login": "sipa" },
            "created_at": "2015-06-01T00:00:00Z",
            "body": "nit: spacing",
            "html_url": "https://github.com/o/r/pull/1#discussion_r5",
            "path": "src/main.cpp"
        })));
        assert_eq!(row[0], "sipa");
        assert_eq!(row[5], "src/main.cpp");
    }

    #[test]
    fn test_commit_author_prefers_login() {
        let commit: CommitView = serde_json::from_value(json!({
            "sha": "deadbeef",
            "commit": { "author": { "name": "Wladimir", "date": "2016-01-01T00:00:00Z" } },
            "author": { "login": "laanwj" },
            "files": [{ "filename": "a.cpp" }, { "filename": "b.h" }]
        }))
        .unwrap();
        assert_eq!(
            commit_row(&commit),
            [
                "deadbeef".to_string(),
                "2016-01-01T00:00:00Z".to_string(),
                "laanwj".to_string(),
                "a.cpp,b.h".to_string(),
            ]
        );
    }

    #[test]
    fn test_commit_author_falls_back_to_git_name() {
        let commit: CommitView = serde_json::from_value(json!({
            "sha": "deadbeef",
            "commit": { "author": { "name": "Unlinked Person", "date": "2016-01-01T00:00:00Z" } },
            "author": null,
            "files": []
        }))
        .unwrap();
        assert_eq!(commit_author_name(&commit), "Unlinked Person");
        assert_eq!(commit_row(&commit)[3], "");
    }

    #[test]
    fn test_open_pull_has_empty_close_and_merge_fields() {
        let row = pull_row(&pull(json!({
            "number": 3,
            "created_at": "2011-01-01T00:00:00Z",
            "user": { "login": "gavinandresen" },
            "title": "Add RPC",
            "labels": [{ "name": "RPC" }, { "name": "Feature" }],
            "closed_at": null,
            "merged_at": null,
            "merged": false,
            "merged_by": null
        })));
        assert_eq!(row[4], "RPC,Feature");
        assert_eq!(row[5], "");
        assert_eq!(row[6], "");
        assert_eq!(row[7], "");
    }

    #[test]
    fn test_merged_pull_with_deleted_merger() {
        let row = pull_row(&pull(json!({
            "number": 117,
            "created_at": "2011-03-01T00:00:00Z",
            "user": { "login": "someone" },
            "title": "Old change",
            "labels": [],
            "closed_at": "2011-03-02T00:00:00Z",
            "merged_at": "2011-03-02T00:00:00Z",
            "merged": true,
            "merged_by": null
        })));
        assert_eq!(row[5], "2011-03-02T00:00:00Z");
        assert_eq!(row[6], "2011-03-02T00:00:00Z");
        assert_eq!(row[7], "");
    }

    #[test]
    fn test_merged_pull_with_merger() {
        let row = pull_row(&pull(json!({
            "number": 20000,
            "created_at": "2020-01-01T00:00:00Z",
            "user": { "login": "author" },
            "title": "Refactor",
            "closed_at": "2020-02-01T00:00:00Z",
            "merged_at": "2020-02-01T00:00:00Z",
            "merged": true,
            "merged_by": { "login": "maintainer" }
        })));
        assert_eq!(row[7], "maintainer");
    }
}
