use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{BranchType, ErrorCode, FetchOptions, RemoteCallbacks, Repository, Signature, Sort};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{BuildError, Result};
use crate::git::progress::ProgressPrinter;
use crate::git::{select_latest_tag, CommitInfo, TagCandidate, VersionControl};

const REMOTE: &str = "origin";

/// [VersionControl] backed by libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2VersionControl;

impl Git2VersionControl {
    pub fn new() -> Self {
        Git2VersionControl
    }

    fn open(path: &Path) -> Result<Repository> {
        Ok(Repository::open(path)?)
    }
}

/// Remote callbacks with SSH/default credentials and percentage progress.
///
/// SSH key authentication tries keys from ~/.ssh/ first, then the SSH agent.
fn remote_callbacks<'a>(label: &str) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let key_path = home.join(".ssh").join(key);
                    if key_path.exists() {
                        if let Ok(cred) = git2::Cred::ssh_key(username, None, &key_path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }
            if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }
        git2::Cred::default()
    });

    let mut printer = ProgressPrinter::new(label);
    callbacks.transfer_progress(move |stats| {
        printer.update(stats.received_objects(), stats.total_objects());
        true
    });
    callbacks
}

fn fetch_options<'a>(label: &str) -> FetchOptions<'a> {
    let mut options = FetchOptions::new();
    options.remote_callbacks(remote_callbacks(label));
    options
}

fn checkout_local_branch(repo: &Repository, branch: &str) -> Result<()> {
    let refname = format!("refs/heads/{}", branch);
    let object = repo.revparse_single(&refname)?;
    let mut checkout = CheckoutBuilder::new();
    checkout.safe();
    repo.checkout_tree(&object, Some(&mut checkout))?;
    repo.set_head(&refname)?;
    Ok(())
}

fn format_commit_time(time: git2::Time) -> String {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)
        .unwrap_or_else(|| Utc.fix());
    match DateTime::from_timestamp(time.seconds(), 0) {
        Some(utc) => utc
            .with_timezone(&offset)
            .format("%a %b %e %H:%M:%S %Y %z")
            .to_string(),
        None => time.seconds().to_string(),
    }
}

impl VersionControl for Git2VersionControl {
    fn clone_repo(&self, url: &str, path: &Path) -> Result<()> {
        debug!("git clone {} {}", url, path.display());
        RepoBuilder::new()
            .fetch_options(fetch_options(&format!("clone {}", url)))
            .clone(url, path)?;
        Ok(())
    }

    fn fetch_tags(&self, path: &Path) -> Result<()> {
        let repo = Self::open(path)?;
        let mut remote = repo.find_remote(REMOTE)?;
        debug!("git fetch --tags in {}", path.display());
        remote.fetch(
            &["+refs/tags/*:refs/tags/*"],
            Some(&mut fetch_options("fetch tags")),
            None,
        )?;
        Ok(())
    }

    fn list_branches(&self, path: &Path) -> Result<Vec<String>> {
        let repo = Self::open(path)?;
        let mut names = Vec::new();
        for branch in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn latest_tag(&self, path: &Path) -> Result<Option<String>> {
        let repo = Self::open(path)?;
        let names = repo.tag_names(None)?;

        let candidates: Vec<TagCandidate> = names
            .iter()
            .flatten()
            .map(|name| match repo.revparse_single(&format!("refs/tags/{}", name)) {
                Ok(object) => {
                    let tagged_at = object
                        .as_tag()
                        .and_then(|tag| tag.tagger())
                        .map(|tagger| tagger.when().seconds());
                    let committed_at = object
                        .peel_to_commit()
                        .map(|commit| commit.time().seconds())
                        .ok();
                    TagCandidate::new(name, committed_at).with_tagged_at(tagged_at)
                }
                Err(e) => {
                    debug!("cannot resolve tag {}: {}", name, e);
                    TagCandidate::new(name, None)
                }
            })
            .collect();

        Ok(select_latest_tag(&candidates))
    }

    fn checkout_new_branch(&self, path: &Path, branch: &str, tag: &str) -> Result<()> {
        let repo = Self::open(path)?;
        let commit = repo
            .revparse_single(&format!("refs/tags/{}", tag))?
            .peel_to_commit()?;

        match repo.branch(branch, &commit, false) {
            Ok(_) => {}
            Err(e) if e.code() == ErrorCode::Exists => {
                return Err(BuildError::CheckoutConflict(branch.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        checkout_local_branch(&repo, branch)
    }

    fn checkout_branch(&self, path: &Path, branch: &str) -> Result<()> {
        let repo = Self::open(path)?;
        checkout_local_branch(&repo, branch)
    }

    fn pull(&self, path: &Path, branch: &str) -> Result<()> {
        let repo = Self::open(path)?;
        let mut remote = repo.find_remote(REMOTE)?;
        let refspec = format!("+refs/heads/{0}:refs/remotes/{1}/{0}", branch, REMOTE);
        debug!("git pull {} {} in {}", REMOTE, branch, path.display());
        remote.fetch(
            &[refspec.as_str()],
            Some(&mut fetch_options(&format!("pull {}", branch))),
            None,
        )?;

        let remote_oid = match repo.refname_to_id(&format!("refs/remotes/{}/{}", REMOTE, branch)) {
            Ok(oid) => oid,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let branch_ref_name = format!("refs/heads/{}", branch);
        let mut local_ref = repo.find_reference(&branch_ref_name)?;
        let local_oid = match local_ref.target() {
            Some(oid) => oid,
            None => return Ok(()),
        };

        if local_oid == remote_oid {
            return Ok(());
        }

        if !repo.graph_descendant_of(remote_oid, local_oid)? {
            warn!(
                "{} has diverged from {}/{}; keeping the local branch",
                branch, REMOTE, branch
            );
            return Ok(());
        }

        local_ref.set_target(
            remote_oid,
            &format!("pull: fast-forward from {}/{}", REMOTE, branch),
        )?;

        let head_is_branch = repo
            .head()
            .ok()
            .and_then(|head| head.name().map(|name| name == branch_ref_name))
            .unwrap_or(false);
        if head_is_branch {
            let mut checkout = CheckoutBuilder::new();
            checkout.force();
            repo.checkout_head(Some(&mut checkout))?;
        }

        Ok(())
    }

    fn commits_since(&self, path: &Path, tag: &str) -> Result<Vec<CommitInfo>> {
        let repo = Self::open(path)?;
        let tag_commit = repo
            .revparse_single(&format!("refs/tags/{}", tag))?
            .peel_to_commit()?;

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push_head()?;
        revwalk.hide(tag_commit.id())?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;
            let author = commit.author();
            commits.push(CommitInfo {
                hash: commit.id().to_string(),
                author: author.name().unwrap_or("unknown").to_string(),
                email: author.email().unwrap_or("").to_string(),
                date: format_commit_time(commit.time()),
                message: commit.message().unwrap_or("").trim_end().to_string(),
            });
        }
        Ok(commits)
    }

    fn create_annotated_tag(&self, path: &Path, name: &str, message: &str) -> Result<()> {
        let repo = Self::open(path)?;
        let head = repo.head()?.peel_to_commit()?;
        let tagger = repo
            .signature()
            .or_else(|_| Signature::now("esgf-build", "esgf-build@localhost"))?;
        repo.tag(name, head.as_object(), &tagger, message, false)?;
        Ok(())
    }
}
