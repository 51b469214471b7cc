//! HTTP collaborators: question source, answer check, level unlock and the
//! remote leaderboard
//!
//! The core only sees the traits; `HttpServices` is the reqwest-backed
//! implementation the binary wires in.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::error::ServiceError;
use crate::leaderboard::{LeaderboardEntry, LeaderboardSink};
use crate::oracle::{VerdictReply, VerdictRequest};
use crate::questions::{Question, QuestionBank, next_folder};

/// Upper bound on any single request, connect through body
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub type ServiceFuture<T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'static>>;

pub trait QuestionSource: Send + Sync {
    fn fetch_questions(&self, folder: &str) -> ServiceFuture<Vec<Question>>;
}

pub trait AnswerCheck: Send + Sync {
    fn check_answer(&self, request: &VerdictRequest) -> ServiceFuture<VerdictReply>;
}

pub trait LevelUnlockCheck: Send + Sync {
    fn folder_exists(&self, folder: &str) -> ServiceFuture<bool>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerCheckBody<'a> {
    folder: &'a str,
    question_index: usize,
    selected_label: &'a str,
}

#[derive(Debug, Deserialize)]
struct FolderExists {
    exists: bool,
}

/// reqwest client bound to one server
#[derive(Debug, Clone)]
pub struct HttpServices {
    client: reqwest::Client,
    base_url: String,
    runtime: Handle,
}

impl HttpServices {
    pub fn new(base_url: impl Into<String>, runtime: Handle) -> Result<Self, ServiceError> {
        let base_url: String = base_url.into();
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            runtime,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl QuestionSource for HttpServices {
    fn fetch_questions(&self, folder: &str) -> ServiceFuture<Vec<Question>> {
        let request = self
            .client
            .get(self.url("/api/questions"))
            .query(&[("folder", folder)]);
        Box::pin(async move {
            let resp = request.send().await?.error_for_status()?;
            let questions: Vec<Question> = resp.json().await?;
            Ok(questions)
        })
    }
}

impl AnswerCheck for HttpServices {
    fn check_answer(&self, request: &VerdictRequest) -> ServiceFuture<VerdictReply> {
        let body = AnswerCheckBody {
            folder: &request.folder,
            question_index: request.question_index,
            selected_label: request.selected.as_str(),
        };
        let request = self.client.post(self.url("/api/answers/check")).json(&body);
        Box::pin(async move {
            let resp = request.send().await?.error_for_status()?;
            let reply: VerdictReply = resp.json().await?;
            Ok(reply)
        })
    }
}

impl LevelUnlockCheck for HttpServices {
    fn folder_exists(&self, folder: &str) -> ServiceFuture<bool> {
        let request = self
            .client
            .get(self.url("/api/folders/exists"))
            .query(&[("folder", folder)]);
        Box::pin(async move {
            let resp = request.send().await?.error_for_status()?;
            let body: FolderExists = resp.json().await?;
            Ok(body.exists)
        })
    }
}

impl LeaderboardSink for HttpServices {
    fn submit(&self, entry: &LeaderboardEntry) {
        let request = self.client.post(self.url("/api/leaderboard")).json(entry);
        let name = entry.name.clone();
        self.runtime.spawn(async move {
            match request.send().await.and_then(|r| r.error_for_status()) {
                Ok(_) => log::debug!("Leaderboard entry for {} submitted", name),
                Err(err) => log::warn!("Leaderboard submit failed: {}", ServiceError::from(err)),
            }
        });
    }
}

/// Load a folder's questions, falling back to the built-in bank when the
/// source fails or the folder is empty
pub async fn load_bank(source: &dyn QuestionSource, folder: &str) -> QuestionBank {
    match source.fetch_questions(folder).await {
        Ok(questions) if !questions.is_empty() => {
            log::info!("Loaded {} questions from '{}'", questions.len(), folder);
            QuestionBank::new(folder, questions)
        }
        Ok(_) => {
            log::warn!("Folder '{}' has no questions, using built-in bank", folder);
            QuestionBank::builtin()
        }
        Err(err) => {
            log::warn!("Could not load '{}' ({}), using built-in bank", folder, err);
            QuestionBank::builtin()
        }
    }
}

/// The folder a player may unlock next, if the server has it
pub async fn next_unlocked_folder(
    check: &dyn LevelUnlockCheck,
    folder: &str,
) -> Result<Option<String>, ServiceError> {
    let Some(next) = next_folder(folder) else {
        return Ok(None);
    };
    if check.folder_exists(&next).await? {
        log::info!("Next level unlocked: {}", next);
        Ok(Some(next))
    } else {
        Ok(None)
    }
}
