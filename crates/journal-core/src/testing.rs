//! Shared fixtures for unit tests

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use proptest::prelude::*;

use crate::access::{Actor, Role};
use crate::blob::BlobStore;
use crate::credentials::hash_password;
use crate::error::{JournalError, Result};
use crate::journal::Journal;
use crate::manuscript::ManuscriptId;
use crate::store::InMemoryRepository;
use crate::user::NewUser;
use crate::workflow::{Command, ManuscriptUpload};

/// Blob store kept in a map
#[derive(Default)]
pub(crate) struct MemoryBlobs {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl BlobStore for MemoryBlobs {
    fn put(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let mut files = self.files.lock().unwrap();
        let locator = format!("mem/{}-{}", files.len(), original_name);
        files.insert(locator.clone(), bytes.to_vec());
        Ok(locator)
    }

    fn get(&self, locator: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(locator)
            .cloned()
            .ok_or_else(|| JournalError::NotFound(locator.to_string()))
    }

    fn remove(&self, locator: &str) -> Result<()> {
        self.files.lock().unwrap().remove(locator);
        Ok(())
    }
}

/// alice (author), rev1 (reviewer) and ed1 (editor)
pub(crate) struct Cast {
    pub author: Actor,
    pub reviewer: Actor,
    pub editor: Actor,
}

/// Register a user whose password is "pw", hashing it only once per run
pub(crate) fn register(journal: &mut Journal, username: &str, role: &str) -> Actor {
    static PW_HASH: OnceLock<String> = OnceLock::new();
    let password_hash = PW_HASH.get_or_init(|| hash_password("pw").unwrap()).clone();
    let role = Role::parse(role).unwrap();
    let id = journal
        .register(NewUser {
            username: username.to_string(),
            password_hash,
            role,
            email: format!("{}@example.org", username),
        })
        .unwrap();
    Actor::user(id, role)
}

pub(crate) fn seeded() -> (Journal, Cast) {
    let mut journal = Journal::new(InMemoryRepository::new(), MemoryBlobs::default());
    let author = register(&mut journal, "alice", "author");
    let reviewer = register(&mut journal, "rev1", "reviewer");
    let editor = register(&mut journal, "ed1", "editor");
    (
        journal,
        Cast {
            author,
            reviewer,
            editor,
        },
    )
}

pub(crate) fn submit(title: &str) -> Command {
    Command::SubmitManuscript {
        title: title.to_string(),
        abstract_text: format!("Abstract of {}", title),
        file: Some(ManuscriptUpload {
            file_name: "paper.pdf".to_string(),
            bytes: b"%PDF".to_vec(),
        }),
    }
}

/// One step of a random editorial history
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Submit,
    Assign(i64),
    Decide(i64, bool),
}

pub(crate) fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Submit),
        (1i64..10).prop_map(Step::Assign),
        (1i64..10, any::<bool>()).prop_map(|(id, accept)| Step::Decide(id, accept)),
    ]
}

/// Apply a step; steps naming a manuscript that does not exist yet fail and
/// are ignored.
pub(crate) fn apply(journal: &mut Journal, cast: &Cast, step: &Step) {
    let result = match step {
        Step::Submit => journal.execute(&cast.author, submit("Random")),
        Step::Assign(id) => journal.execute(
            &cast.editor,
            Command::AssignReviewer {
                manuscript_id: ManuscriptId(*id),
                reviewer_id: cast.reviewer.user_id,
            },
        ),
        Step::Decide(id, accept) => journal.execute(
            &cast.reviewer,
            Command::RecordDecision {
                manuscript_id: ManuscriptId(*id),
                feedback: "ok".to_string(),
                decision: if *accept { "accepted" } else { "rejected" }.to_string(),
            },
        ),
    };
    if let Err(err) = result {
        assert!(matches!(err, JournalError::NotFound(_)), "unexpected {:?}", err);
    }
}
