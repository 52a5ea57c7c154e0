//! Sync Stage: brings every selected checkout to its Active Reference and
//! writes the tag and commit reports.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::decision::DecisionProvider;
use crate::error::{BuildError, Result};
use crate::git::{resolve_latest_tag, CommitInfo, VersionControl};
use crate::registry::RepoDescriptor;
use crate::ui;
use crate::warning::PipelineWarning;

/// Sentinel selecting the most recent tag instead of a branch
pub const LATEST: &str = "latest";

pub const TAGLIST_FILE: &str = "taglist.txt";
pub const COMMITS_FILE: &str = "commits_since_last_tag.txt";

const RULE: &str = "-------------------------";

/// Which reference to check out, applied to every selected repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchDirective {
    Named(String),
    Latest,
    /// Ask per repository
    Prompt,
}

impl BranchDirective {
    pub fn from_arg(branch: Option<&str>) -> Self {
        match branch {
            None => BranchDirective::Prompt,
            Some(name) if name == LATEST => BranchDirective::Latest,
            Some(name) => BranchDirective::Named(name.to_string()),
        }
    }
}

/// Resolved tag of one repository, as written to `taglist.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub repo: String,
    pub tag: Option<String>,
}

pub fn write_tag_record(out: &mut impl Write, record: &TagRecord) -> io::Result<()> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "{}", record.repo)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "{}", record.tag.as_deref().unwrap_or("(no tags)"))?;
    writeln!(out)
}

/// Formats a commit the way `git log` prints it.
pub fn format_commit(commit: &CommitInfo) -> String {
    let mut text = format!(
        "commit {}\nAuthor: {} <{}>\nDate:   {}\n\n",
        commit.hash, commit.author, commit.email, commit.date
    );
    for line in commit.message.lines() {
        if line.is_empty() {
            text.push('\n');
        } else {
            text.push_str(&format!("    {}\n", line));
        }
    }
    text
}

pub fn write_commit_report(
    out: &mut impl Write,
    repo: &str,
    tag: &str,
    commits: &[CommitInfo],
) -> io::Result<()> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "Commits since last tag ({}) for {}", tag, repo)?;
    writeln!(out, "{}", RULE)?;
    let log: Vec<String> = commits.iter().map(format_commit).collect();
    writeln!(out, "{}", log.join("\n"))?;
    writeln!(out)
}

fn require_branch(branch: &str, branches: &[String], repo: &str) -> Result<()> {
    if branches.iter().any(|b| b == branch) {
        Ok(())
    } else {
        Err(BuildError::BranchNotFound {
            branch: branch.to_string(),
            repo: repo.to_string(),
        })
    }
}

/// Turns the run-wide directive into the reference used for one repository.
fn resolve_active_reference(
    vcs: &dyn VersionControl,
    decisions: &mut dyn DecisionProvider,
    path: &Path,
    repo: &str,
    directive: &BranchDirective,
) -> Result<BranchDirective> {
    match directive {
        BranchDirective::Latest => Ok(BranchDirective::Latest),
        BranchDirective::Named(branch) => {
            require_branch(branch, &vcs.list_branches(path)?, repo)?;
            Ok(directive.clone())
        }
        BranchDirective::Prompt => {
            let branches = vcs.list_branches(path)?;
            match decisions.resolve_branch(repo, &branches)? {
                BranchDirective::Named(branch) => {
                    require_branch(&branch, &branches, repo)?;
                    Ok(BranchDirective::Named(branch))
                }
                BranchDirective::Latest => Ok(BranchDirective::Latest),
                BranchDirective::Prompt => Err(BuildError::decision(format!(
                    "no branch chosen for {}",
                    repo
                ))),
            }
        }
    }
}

/// Checks out a branch named after the latest tag, reusing it if it already exists.
fn checkout_latest_tag(vcs: &dyn VersionControl, path: &Path, repo: &str) -> Result<String> {
    let tag = resolve_latest_tag(vcs, path)?.ok_or_else(|| BuildError::BranchNotFound {
        branch: LATEST.to_string(),
        repo: repo.to_string(),
    })?;

    ui::display_status(&format!("Checkout {}'s {} tag", repo, tag));
    match vcs.checkout_new_branch(path, &tag, &tag) {
        Ok(()) => {}
        Err(BuildError::CheckoutConflict(branch)) => {
            let warning = PipelineWarning::BranchAlreadyExists {
                repo: repo.to_string(),
                branch: branch.clone(),
            };
            warn!("{}", warning);
            ui::display_warning(&warning);
            vcs.checkout_branch(path, &branch)?;
        }
        Err(e) => return Err(e),
    }
    Ok(tag)
}

fn sync_repo(
    vcs: &dyn VersionControl,
    decisions: &mut dyn DecisionProvider,
    root: &Path,
    repo: &RepoDescriptor,
    directive: &BranchDirective,
    taglist: &mut impl Write,
    commit_report: &mut impl Write,
) -> Result<TagRecord> {
    let path = repo.local_path(root);
    if !path.exists() {
        ui::display_status(&format!("Cloning {} repo from GitHub", repo.name));
        vcs.clone_repo(&repo.url, &path)?;
        ui::display_success(&format!(
            "{} successfully cloned -> {}",
            repo.name,
            path.display()
        ));
    }

    match resolve_active_reference(vcs, decisions, &path, &repo.name, directive)? {
        BranchDirective::Named(branch) => {
            ui::display_status(&format!("Checkout {}'s {} branch", repo.name, branch));
            vcs.checkout_branch(&path, &branch)?;
            vcs.pull(&path, &branch)?;
        }
        _ => {
            checkout_latest_tag(vcs, &path, &repo.name)?;
        }
    }
    info!("Updated {}", repo.name);

    let record = TagRecord {
        repo: repo.name.clone(),
        tag: resolve_latest_tag(vcs, &path)?,
    };
    write_tag_record(taglist, &record)?;

    match &record.tag {
        Some(tag) => {
            let commits = vcs.commits_since(&path, tag)?;
            if !commits.is_empty() {
                ui::display_status(&format!(
                    "There are new commits since the last annotated tag for {}; see {} for more details",
                    repo.name, COMMITS_FILE
                ));
                write_commit_report(commit_report, &repo.name, tag, &commits)?;
            }
        }
        None => {
            let warning = PipelineWarning::NoTags {
                repo: repo.name.clone(),
            };
            warn!("{}", warning);
            ui::display_warning(&warning);
        }
    }

    Ok(record)
}

/// Syncs every repository of the selection, in order.
///
/// `taglist.txt` and `commits_since_last_tag.txt` under `root` are truncated
/// first and rewritten.
pub fn sync_all(
    vcs: &dyn VersionControl,
    decisions: &mut dyn DecisionProvider,
    root: &Path,
    selection: &[RepoDescriptor],
    directive: &BranchDirective,
) -> Result<Vec<TagRecord>> {
    info!("Beginning to update directories");
    let mut taglist = BufWriter::new(File::create(root.join(TAGLIST_FILE))?);
    let mut commit_report = BufWriter::new(File::create(root.join(COMMITS_FILE))?);

    let mut records = Vec::with_capacity(selection.len());
    for repo in selection {
        records.push(sync_repo(
            vcs,
            decisions,
            root,
            repo,
            directive,
            &mut taglist,
            &mut commit_report,
        )?);
    }

    taglist.flush()?;
    commit_report.flush()?;
    ui::display_success("Directory updates complete.");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(hash: &str, message: &str) -> CommitInfo {
        CommitInfo {
            hash: hash.to_string(),
            author: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            date: "Thu Jan  1 00:00:00 1970 +0000".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_branch_directive_from_arg() {
        assert_eq!(BranchDirective::from_arg(None), BranchDirective::Prompt);
        assert_eq!(
            BranchDirective::from_arg(Some("latest")),
            BranchDirective::Latest
        );
        assert_eq!(
            BranchDirective::from_arg(Some("devel")),
            BranchDirective::Named("devel".to_string())
        );
    }

    #[test]
    fn test_tag_record_block() {
        let mut out = Vec::new();
        write_tag_record(
            &mut out,
            &TagRecord {
                repo: "esg-orp".to_string(),
                tag: Some("v2.11.0".to_string()),
            },
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "-------------------------\nesg-orp\n-------------------------\nv2.11.0\n\n"
        );
    }

    #[test]
    fn test_tag_record_without_tag() {
        let mut out = Vec::new();
        write_tag_record(
            &mut out,
            &TagRecord {
                repo: "esg-orp".to_string(),
                tag: None,
            },
        )
        .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("(no tags)"));
    }

    #[test]
    fn test_format_commit_indents_message() {
        let text = format_commit(&commit("abc123", "Fix login\n\nDetails here"));
        assert_eq!(
            text,
            "commit abc123\nAuthor: Ada <ada@example.com>\nDate:   Thu Jan  1 00:00:00 1970 +0000\n\n    Fix login\n\n    Details here\n"
        );
    }

    #[test]
    fn test_commit_report_header() {
        let mut out = Vec::new();
        write_commit_report(&mut out, "esgf-idp", "v1.0.0", &[commit("abc", "one")]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Commits since last tag (v1.0.0) for esgf-idp"));
        assert!(text.contains("commit abc"));
    }
}
