use std::io::{BufRead, StdinLock, Stdout, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::decision::DecisionProvider;
use crate::error::Result;
use crate::registry::{Registry, RepoDescriptor};
use crate::selector;
use crate::sync::{BranchDirective, LATEST};
use crate::ui::{parse_yes_no, Prompter};
use crate::version::{self, VersionBump};

/// Answers every question by prompting on a terminal.
pub struct InteractiveDecisions<R, W> {
    prompter: Prompter<R, W>,
}

impl InteractiveDecisions<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        InteractiveDecisions::new(Prompter::stdio())
    }
}

impl<R: BufRead, W: Write> InteractiveDecisions<R, W> {
    pub fn new(prompter: Prompter<R, W>) -> Self {
        InteractiveDecisions { prompter }
    }

    pub fn into_prompter(self) -> Prompter<R, W> {
        self.prompter
    }
}

impl<R: BufRead, W: Write> DecisionProvider for InteractiveDecisions<R, W> {
    fn select_repos(&mut self, registry: &Registry) -> Result<Vec<RepoDescriptor>> {
        self.prompter.say(&registry.menu())?;
        loop {
            let answer = self
                .prompter
                .ask("Which repositories will be built? (Hit [Enter] for all) ")?;

            if answer.is_empty() {
                let all = self
                    .prompter
                    .ask("Do you want to build all repositories? (Y or YES) ")?;
                if parse_yes_no(&all, true) == Some(true) {
                    return Ok(registry.all().to_vec());
                }
                self.prompter.say("Not a valid response.")?;
                continue;
            }

            match selector::parse_index_list(registry, &answer) {
                Ok(repos) => return Ok(repos),
                Err(e) => {
                    debug!("rejected repo selection '{}': {}", answer, e);
                    self.prompter
                        .say("Invalid entry, please enter repos to build.")?;
                }
            }
        }
    }

    fn resolve_branch(&mut self, repo: &str, branches: &[String]) -> Result<BranchDirective> {
        loop {
            self.prompter.say(&format!(
                "Available branches for {}: {}",
                repo,
                branches.join(", ")
            ))?;
            let answer = self.prompter.ask(
                "Enter a branch name to checkout for the build. You can also enter 'latest' to build from the latest tag: ",
            )?;

            if answer.eq_ignore_ascii_case(LATEST) {
                return Ok(BranchDirective::Latest);
            }
            if branches.iter().any(|b| *b == answer) {
                return Ok(BranchDirective::Named(answer));
            }
            self.prompter.say(&format!(
                "{} is not a valid branch. Please choose either a valid branch from the list or '{}' for the most recent tag.",
                answer, LATEST
            ))?;
        }
    }

    fn resolve_upload(&mut self) -> Result<bool> {
        self.prompter
            .confirm("Would you like to upload the built assets to GitHub? [Y/n] ", true)
    }

    fn resolve_bump(&mut self, repo: &str, current_tag: &str) -> Result<VersionBump> {
        let mut menu = String::from("----------------------------------------\n");
        for (i, bump) in VersionBump::ALL.iter().enumerate() {
            let next = version::next_tag(current_tag, *bump)?;
            menu.push_str(&format!(
                "{}: Bump {} version of {} {} -> {}\n",
                i, bump, repo, current_tag, next
            ));
        }
        self.prompter.say(&menu)?;

        loop {
            let answer = self
                .prompter
                .ask("Choose version number component to increment: ")?;
            match VersionBump::from_choice(&answer) {
                Some(bump) => return Ok(bump),
                None => self
                    .prompter
                    .say("Invalid selection. Please make a valid selection.")?,
            }
        }
    }

    fn confirm_create_directory(&mut self, path: &Path) -> Result<bool> {
        let answer = self.prompter.ask(&format!(
            "The path does not exist. Do you want {} to be created? (Y or YES) ",
            path.display()
        ))?;
        if parse_yes_no(&answer, true) == Some(true) {
            Ok(true)
        } else {
            self.prompter
                .say("Not a valid response. Directory not created.")?;
            Ok(false)
        }
    }

    fn choose_directory(&mut self) -> Result<PathBuf> {
        loop {
            let answer = self
                .prompter
                .ask("Please provide the path to the repositories on your system: ")?;
            if !answer.is_empty() {
                return Ok(PathBuf::from(answer));
            }
        }
    }
}
