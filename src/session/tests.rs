use super::testing::{paths, Call, FakeDrafter, FakeRepository, FakeTickets, Harness};
use super::workflow::{NO_COMMIT_MESSAGE, NO_FILES_SELECTED};
use super::*;

fn open_tickets() -> FakeTickets {
    FakeTickets::with(&[("RG-12", "Fix crash"), ("RG-3", "Add tests"), ("RG-9", "Refactor")])
}

fn harness(repo: FakeRepository) -> Harness {
    Harness::new(repo, open_tickets(), FakeDrafter::replying("RG-12 Guard against null config")).started()
}

fn basic_repo() -> FakeRepository {
    FakeRepository::new()
        .with_unstaged(&["b.py", "a.py"])
        .with_staged(&["c.py"])
        .with_untracked(&["new.py"])
}

fn status_message(h: &Harness) -> String {
    h.session
        .status()
        .map(|n| n.message.clone())
        .unwrap_or_default()
}

#[test]
fn startup_loads_files_branch_and_tickets() {
    let h = harness(basic_repo());

    let labels: Vec<&str> = h.session.files().iter().map(|f| f.label.as_str()).collect();
    assert_eq!(labels, vec!["a.py", "b.py", "c.py", "[UNTRACKED] new.py"]);
    assert_eq!(h.session.branch(), Some("main"));
    assert_eq!(h.session.known_ticket_ids(), ["RG-12", "RG-3", "RG-9"]);
    // Already-staged files start checked.
    assert_eq!(h.session.selection(), &paths(&["c.py"]));
    assert!(h.repo.mutations().is_empty());
}

#[test]
fn selection_change_reconciles_index() {
    let mut h = harness(basic_repo());

    h.select(&["a.py", "new.py"]);

    assert_eq!(h.repo.staged(), paths(&["a.py", "new.py"]));
    assert_eq!(
        h.repo.mutations(),
        vec![
            Call::Stage(paths(&["a.py", "new.py"])),
            Call::Unstage("c.py".to_string()),
        ]
    );
}

#[test]
fn unknown_paths_are_never_staged() {
    let mut h = harness(basic_repo());

    h.select(&["a.py", "../outside.py", "ghost.py"]);

    assert_eq!(h.session.selection(), &paths(&["a.py"]));
    assert_eq!(h.repo.staged(), paths(&["a.py"]));
}

#[test]
fn unchanged_selection_issues_no_pass() {
    let mut h = harness(basic_repo());
    h.select(&["c.py"]);
    assert!(h.repo.mutations().is_empty());
}

#[test]
fn selection_changes_during_a_pass_are_coalesced() {
    let mut h = harness(basic_repo());

    let first = h.send_deferred(Event::SelectionChanged(paths(&["a.py"])));
    assert_eq!(first.len(), 1);
    // Two more changes while the first pass is "running".
    assert!(h
        .send_deferred(Event::SelectionChanged(paths(&["a.py", "b.py"])))
        .is_empty());
    assert!(h
        .send_deferred(Event::SelectionChanged(paths(&["b.py"])))
        .is_empty());

    h.run(first);

    let stages: Vec<Call> = h
        .repo
        .mutations()
        .into_iter()
        .filter(|c| matches!(c, Call::Stage(_)))
        .collect();
    assert_eq!(
        stages,
        vec![Call::Stage(paths(&["a.py"])), Call::Stage(paths(&["b.py"]))]
    );
    assert_eq!(h.repo.staged(), paths(&["b.py"]));
}

#[test]
fn commit_blocked_for_every_empty_combination() {
    let cases: [(&[&str], &str, &str); 3] = [
        (&[], "", NO_FILES_SELECTED),
        (&[], "RG-3 body", NO_FILES_SELECTED),
        (&["a.py"], "", NO_COMMIT_MESSAGE),
    ];
    for (selection, message, expected) in cases {
        let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]));
        h.select(selection);
        h.send(Event::MessageEdited(message.to_string()));
        let before = h.repo.mutations();

        h.send(Event::CommitRequested);

        assert_eq!(status_message(&h), expected);
        assert!(!h.session.is_confirming());
        assert_eq!(h.repo.mutations(), before);
        assert!(h
            .repo
            .calls()
            .iter()
            .all(|c| !matches!(c, Call::Commit(_))));
    }
}

#[test]
fn empty_message_with_ticket_chosen_is_rejected() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py", "b.py"]));
    h.select(&["a.py", "b.py"]);
    let before = h.repo.mutations();
    h.send(Event::MessageEdited(String::new()));
    h.send(Event::TicketChosen("RG-12".to_string()));
    h.send(Event::MessageEdited(String::new()));

    h.send(Event::CommitRequested);

    assert_eq!(status_message(&h), NO_COMMIT_MESSAGE);
    assert_eq!(h.repo.mutations(), before);
    assert_eq!(h.session.chosen_ticket(), Some("RG-12"));
}

#[test]
fn commit_decision_commits_once_and_ends_session() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]));
    h.select(&["a.py"]);
    h.send(Event::MessageEdited("RG-3 add tests".to_string()));

    h.send(Event::CommitRequested);
    assert!(h.session.is_confirming());
    h.send(Event::CommitDecided(CommitDecision::Commit));

    let calls = h.repo.calls();
    let commits: Vec<&Call> = calls.iter().filter(|c| matches!(c, Call::Commit(_))).collect();
    assert_eq!(commits, vec![&Call::Commit("RG-3 add tests".to_string())]);
    assert!(!calls.contains(&Call::Pull));
    assert!(!calls.contains(&Call::Push));
    assert_eq!(h.session.commit_phase(), &CommitPhase::Done);
    assert!(h.session.should_quit());
}

#[test]
fn commit_and_push_pulls_before_pushing_after_commit() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]));
    h.select(&["a.py"]);
    h.send(Event::MessageEdited("RG-3 add tests".to_string()));
    h.send(Event::CommitRequested);
    h.send(Event::CommitDecided(CommitDecision::CommitAndPush));

    let tail: Vec<Call> = h
        .repo
        .mutations()
        .into_iter()
        .filter(|c| matches!(c, Call::Commit(_) | Call::Pull | Call::Push))
        .collect();
    assert_eq!(
        tail,
        vec![
            Call::Commit("RG-3 add tests".to_string()),
            Call::Pull,
            Call::Push
        ]
    );
    assert!(h.session.should_quit());
}

#[test]
fn failed_commit_never_pulls_or_pushes() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]).failing_commit());
    h.select(&["a.py"]);
    h.send(Event::MessageEdited("RG-3 add tests".to_string()));
    h.send(Event::CommitRequested);
    h.send(Event::CommitDecided(CommitDecision::CommitAndPush));

    let calls = h.repo.calls();
    assert!(!calls.contains(&Call::Pull));
    assert!(!calls.contains(&Call::Push));
    assert!(matches!(h.session.commit_phase(), CommitPhase::Failed(_)));
    assert!(!h.session.should_quit());
    assert_eq!(h.session.status().map(|n| n.level), Some(NoticeLevel::Error));

    // Still usable: a second attempt opens the dialog again.
    h.send(Event::CommitRequested);
    assert!(h.session.is_confirming());
}

#[test]
fn failed_push_keeps_commit_and_refreshes() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py", "b.py"]).failing_push());
    h.select(&["a.py"]);
    h.send(Event::MessageEdited("RG-3 add tests".to_string()));
    h.send(Event::CommitRequested);
    h.send(Event::CommitDecided(CommitDecision::CommitAndPush));

    assert_eq!(h.repo.snapshot().commits, vec!["RG-3 add tests".to_string()]);
    assert!(matches!(h.session.commit_phase(), CommitPhase::Failed(_)));
    assert!(!h.session.should_quit());
    let labels: Vec<&str> = h.session.files().iter().map(|f| f.label.as_str()).collect();
    assert_eq!(labels, vec!["b.py"]);
}

#[test]
fn cancel_leaves_repository_and_staging_untouched() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]));
    h.select(&["a.py"]);
    h.send(Event::MessageEdited("RG-3 add tests".to_string()));
    let before = h.repo.snapshot();

    h.send(Event::CommitRequested);
    h.send(Event::CommitDecided(CommitDecision::Cancel));

    assert_eq!(h.session.commit_phase(), &CommitPhase::Cancelled);
    assert_eq!(h.repo.snapshot(), before);
    assert_eq!(h.repo.staged(), paths(&["a.py"]));
    assert!(!h.session.should_quit());
}

#[test]
fn dialog_holds_exclusive_input() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py", "b.py"]));
    h.select(&["a.py"]);
    h.send(Event::MessageEdited("RG-3 add tests".to_string()));
    h.send(Event::CommitRequested);
    let before = h.repo.calls().len();

    h.send(Event::SelectionChanged(paths(&["a.py", "b.py"])));
    h.send(Event::MessageEdited("changed".to_string()));
    h.send(Event::GenerateRequested);
    h.send(Event::TicketChosen("RG-9".to_string()));

    assert_eq!(h.repo.calls().len(), before);
    assert_eq!(h.session.selection(), &paths(&["a.py"]));
    assert_eq!(h.session.message(), "RG-3 add tests");
    assert!(h.session.is_confirming());
}

#[test]
fn commit_uses_drafted_message() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]));
    h.select(&["a.py"]);
    h.send(Event::MessageEdited("first draft".to_string()));
    h.send(Event::GenerateRequested);
    h.send(Event::CommitRequested);
    h.send(Event::CommitDecided(CommitDecision::Commit));

    assert_eq!(
        h.repo.snapshot().commits,
        vec!["RG-12 Guard against null config".to_string()]
    );
}

#[test]
fn pending_selection_is_flushed_before_commit() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py", "b.py"]));
    let in_flight = h.send_deferred(Event::SelectionChanged(paths(&["a.py"])));
    assert!(h
        .send_deferred(Event::SelectionChanged(paths(&["a.py", "b.py"])))
        .is_empty());
    h.send(Event::MessageEdited("RG-3 both".to_string()));
    h.send(Event::CommitRequested);

    // The commit waits for the running pass and the one owed after it.
    assert!(h
        .send_deferred(Event::CommitDecided(CommitDecision::Commit))
        .is_empty());

    h.run(in_flight);
    assert_eq!(h.repo.snapshot().commits, vec!["RG-3 both".to_string()]);
    let mutations = h.repo.mutations();
    assert_eq!(
        mutations[mutations.len() - 2..],
        [
            Call::Stage(paths(&["a.py", "b.py"])),
            Call::Commit("RG-3 both".to_string()),
        ]
    );
    assert_eq!(h.session.commit_phase(), &CommitPhase::Done);
}

#[test]
fn failed_pass_before_commit_aborts_it() {
    let repo = FakeRepository::new()
        .with_staged(&["a.py", "b.py"])
        .failing_unstage("b.py");
    let mut h = harness(repo);
    assert_eq!(h.session.selection(), &paths(&["a.py", "b.py"]));

    let in_flight = h.send_deferred(Event::SelectionChanged(paths(&["a.py"])));
    h.send(Event::MessageEdited("RG-3 only a".to_string()));
    h.send(Event::CommitRequested);
    assert!(h
        .send_deferred(Event::CommitDecided(CommitDecision::Commit))
        .is_empty());
    h.run(in_flight);

    assert!(!h.repo.calls().iter().any(|c| matches!(c, Call::Commit(_))));
    assert!(h.repo.snapshot().commits.is_empty());
    assert!(matches!(h.session.commit_phase(), CommitPhase::Failed(_)));
    assert!(!h.session.should_quit());
    assert_eq!(h.session.status().map(|n| n.level), Some(NoticeLevel::Error));
}

#[test]
fn commit_after_failed_pass_retries_staging_first() {
    let repo = FakeRepository::new()
        .with_staged(&["a.py", "b.py"])
        .failing_unstage("b.py");
    let mut h = harness(repo);
    h.select(&["a.py"]);
    assert_eq!(h.session.status().map(|n| n.title.as_str()), Some("Staging failed"));

    h.send(Event::MessageEdited("RG-3 only a".to_string()));
    h.send(Event::CommitRequested);
    h.send(Event::CommitDecided(CommitDecision::Commit));

    let unstages = h
        .repo
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Unstage(_)))
        .count();
    assert_eq!(unstages, 2);
    assert!(h.repo.snapshot().commits.is_empty());
    assert!(matches!(h.session.commit_phase(), CommitPhase::Failed(_)));
}

#[test]
fn draft_landing_while_commit_waits_is_committed() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]));
    let in_flight = h.send_deferred(Event::SelectionChanged(paths(&["a.py"])));
    h.send(Event::MessageEdited("first draft".to_string()));
    h.send(Event::CommitRequested);
    assert!(h
        .send_deferred(Event::CommitDecided(CommitDecision::Commit))
        .is_empty());

    h.send(Event::GenerateRequested);
    h.run(in_flight);

    assert_eq!(
        h.repo.snapshot().commits,
        vec!["RG-12 Guard against null config".to_string()]
    );
}

#[test]
fn ticket_choice_reprefixes_message() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]));
    h.send(Event::MessageEdited("RG-3: old body".to_string()));
    let rev = h.session.message_rev();

    h.send(Event::TicketChosen("RG-9".to_string()));

    assert_eq!(h.session.message(), "RG-9 old body");
    assert_eq!(h.session.chosen_ticket(), Some("RG-9"));
    assert!(h.session.message_rev() > rev);
}

#[test]
fn ticket_focus_selects_default_from_history() {
    let repo = FakeRepository::new()
        .with_unstaged(&["a.py"])
        .with_history(&["RG-7 fix typo", "RG-3 add tests"]);
    let mut h = Harness::new(
        repo,
        FakeTickets::with(&[("RG-3", "Add tests"), ("RG-9", "Refactor")]),
        FakeDrafter::replying("unused"),
    )
    .started();

    h.send(Event::TicketListFocused);

    assert_eq!(h.session.chosen_ticket(), Some("RG-3"));
    assert_eq!(h.session.message(), "RG-3 ");
    assert!(h
        .repo
        .calls()
        .contains(&Call::RecentMessages(tickets::RECENT_MESSAGE_LIMIT)));

    // Only the first focus triggers the scan.
    let scans = h.repo.calls().len();
    h.send(Event::TicketListFocused);
    assert_eq!(h.repo.calls().len(), scans);
}

#[test]
fn ticket_focus_without_match_leaves_ticket_unselected() {
    let repo = FakeRepository::new()
        .with_unstaged(&["a.py"])
        .with_history(&["initial commit"]);
    let mut h = harness(repo);

    h.send(Event::TicketListFocused);

    assert_eq!(h.session.chosen_ticket(), None);
    assert_eq!(h.session.message(), "");
}

#[test]
fn ticket_focus_before_tickets_arrive_waits_for_them() {
    let repo = FakeRepository::new().with_history(&["RG-9 refactor"]);
    let mut h = Harness::new(repo, open_tickets(), FakeDrafter::replying("unused"));
    let startup = h.session.start();

    // Focus lands before the fetch has completed.
    assert!(h.send_deferred(Event::TicketListFocused).is_empty());
    h.run(startup);

    assert_eq!(h.session.chosen_ticket(), Some("RG-9"));
}

#[test]
fn manual_choice_beats_default_association() {
    let repo = FakeRepository::new().with_history(&["RG-9 refactor"]);
    let mut h = harness(repo);

    let scan = h.send_deferred(Event::TicketListFocused);
    h.send(Event::TicketChosen("RG-12".to_string()));
    h.run(scan);

    assert_eq!(h.session.chosen_ticket(), Some("RG-12"));
    assert_eq!(h.session.message(), "RG-12 ");
}

#[test]
fn ticket_fetch_failure_falls_back_to_empty_list() {
    let repo = FakeRepository::new().with_history(&["RG-9 refactor"]);
    let mut h = Harness::new(repo, FakeTickets::failing(), FakeDrafter::replying("unused")).started();

    assert!(h.session.tickets().is_empty());
    assert_eq!(h.session.status().map(|n| n.title.as_str()), Some("Ticket fetch failed"));

    h.send(Event::TicketListFocused);
    assert_eq!(h.session.chosen_ticket(), None);
}

#[test]
fn diff_request_shows_highlighted_file_without_mutation() {
    let repo = FakeRepository::new()
        .with_unstaged(&["a.py"])
        .with_diff("a.py", "@@ -1 +1 @@\n-old\n+new\n");
    let mut h = harness(repo);

    h.send(Event::DiffRequested(Some("a.py".to_string())));

    let view = h.session.diff_view().cloned();
    assert_eq!(
        view,
        Some(DiffView {
            path: "a.py".to_string(),
            text: "@@ -1 +1 @@\n-old\n+new\n".to_string()
        })
    );
    assert!(h.repo.mutations().is_empty());

    h.send(Event::DiffClosed);
    assert!(h.session.diff_view().is_none());
}

#[test]
fn diff_request_without_highlight_is_a_notice() {
    let mut h = harness(FakeRepository::new());
    h.send(Event::DiffRequested(None));
    assert!(h.session.diff_view().is_none());
    assert_eq!(status_message(&h), "No file is highlighted.");
}

#[test]
fn generation_sends_ticket_summary_draft_and_diffs() {
    let repo = FakeRepository::new()
        .with_unstaged(&["a.py", "b.py"])
        .with_diff("a.py", "+alpha\n")
        .with_diff("b.py", "+beta\n");
    let mut h = harness(repo);
    h.select(&["a.py", "b.py"]);
    h.send(Event::MessageEdited("RG-12: handle missing config".to_string()));

    h.send(Event::GenerateRequested);

    let prompts = h.drafter.prompts();
    assert_eq!(prompts.len(), 1);
    let (system, user) = &prompts[0];
    assert_eq!(system, prompt::SYSTEM_PROMPT);
    assert!(user.contains("Ticket: RG-12\nTicket summary: Fix crash"));
    assert!(user.contains("Draft message:\nhandle missing config"));
    assert!(user.contains("File: a.py\n+alpha"));
    assert!(user.contains("File: b.py\n+beta"));
    assert_eq!(h.session.message(), "RG-12 Guard against null config");
    assert!(!h.session.is_generating());
}

#[test]
fn generation_result_overwrites_edits_made_meanwhile() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]));
    h.select(&["a.py"]);
    let jobs = h.send_deferred(Event::GenerateRequested);
    assert!(h.session.is_generating());
    h.send(Event::MessageEdited("typed while waiting".to_string()));

    h.run(jobs);

    assert_eq!(h.session.message(), "RG-12 Guard against null config");
}

#[test]
fn generation_failure_keeps_existing_message() {
    let mut h = Harness::new(
        FakeRepository::new().with_unstaged(&["a.py"]),
        open_tickets(),
        FakeDrafter::failing(),
    )
    .started();
    h.select(&["a.py"]);
    h.send(Event::MessageEdited("RG-3 keep me".to_string()));

    h.send(Event::GenerateRequested);

    assert_eq!(h.session.message(), "RG-3 keep me");
    assert_eq!(h.session.status().map(|n| n.level), Some(NoticeLevel::Error));
    assert!(!h.session.is_generating());
}

#[test]
fn generation_diff_failure_is_surfaced() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]).failing_diff());
    h.select(&["a.py"]);
    h.send(Event::MessageEdited("RG-3 keep me".to_string()));

    h.send(Event::GenerateRequested);

    assert!(h.drafter.prompts().is_empty());
    assert_eq!(h.session.message(), "RG-3 keep me");
    assert!(!h.session.is_generating());
}

#[test]
fn only_one_generation_at_a_time() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]));
    h.select(&["a.py"]);
    let first = h.send_deferred(Event::GenerateRequested);
    let second = h.send_deferred(Event::GenerateRequested);
    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[test]
fn staging_failure_is_surfaced_and_session_stays_usable() {
    let repo = FakeRepository::new()
        .with_staged(&["a.py"])
        .with_unstaged(&["b.py"])
        .failing_unstage("a.py");
    let mut h = harness(repo);

    h.select(&["b.py"]);

    assert_eq!(h.session.status().map(|n| n.title.as_str()), Some("Staging failed"));
    h.send(Event::MessageEdited("RG-3 b only".to_string()));
    h.send(Event::CommitRequested);
    assert!(h.session.is_confirming());
}

#[test]
fn refresh_rebuilds_list_from_index() {
    let mut h = harness(FakeRepository::new().with_unstaged(&["a.py"]));
    h.select(&["a.py"]);
    h.send(Event::Refresh);
    assert_eq!(h.session.selection(), &paths(&["a.py"]));
    assert!(h.session.files()[0].already_staged);
}

#[test]
fn quit_ends_session() {
    let mut h = harness(FakeRepository::new());
    h.send(Event::Quit);
    assert!(h.session.should_quit());
}

#[test]
fn job_lanes_keep_repository_work_together() {
    assert_eq!(Job::LoadFiles.lane(), Lane::Repository);
    assert_eq!(Job::PullPush.lane(), Lane::Repository);
    assert_eq!(
        Job::CollectDiffs {
            paths: vec![],
            message: String::new()
        }
        .lane(),
        Lane::Repository
    );
    assert_eq!(Job::FetchTickets.lane(), Lane::Network);
    assert_eq!(
        Job::Draft {
            user_prompt: String::new()
        }
        .lane(),
        Lane::Network
    );
}
