//! Markdown summary posted on the pull request.

use crate::uploader::UploadedArtifact;

const DISPLAY_SEGMENTS: usize = 3;

/// At most the last three `/`-separated segments of a path. Display only;
/// links always address the full storage path.
pub fn short_display_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let start = segments.len().saturating_sub(DISPLAY_SEGMENTS);
    segments[start..].join("/")
}

/// Accumulates one bullet per uploaded artifact under a `## <title>` heading.
#[derive(Debug, Clone)]
pub struct ReportBody {
    body: String,
}

impl ReportBody {
    pub fn new(title: &str) -> Self {
        Self {
            body: format!("## {title}\n"),
        }
    }

    pub fn push(&mut self, artifact: &UploadedArtifact) {
        self.body.push_str(&format!(
            "* [`{}`]({})\n",
            short_display_path(&artifact.source_path),
            artifact.link
        ));
    }

    /// Appends the synchronization footer and returns the finished body.
    pub fn finish(mut self, commit: &str) -> String {
        self.body.push_str(&format!("\nsynchronized with {commit}"));
        self.body
    }
}
