//! Verdict on whether an eaten target was the right answer
//!
//! In local mode the verdict is known when the targets are laid out. In remote
//! mode the check runs on the async runtime and the caller gets a oneshot
//! receiver it polls from the logic loop; the simulation never blocks on it.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::error::ServiceError;
use crate::questions::OptionLabel;
use crate::services::AnswerCheck;

/// Who decides correctness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustMode {
    /// Answers ship with the questions
    #[default]
    Local,
    /// Answers stay on the server
    Remote,
}

impl TrustMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "remote" | "server" => Some(Self::Remote),
            _ => None,
        }
    }
}

/// One answer to check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictRequest {
    pub folder: String,
    pub question_index: usize,
    pub selected: OptionLabel,
    /// Correctness computed at placement time (local mode only)
    pub precomputed: Option<bool>,
    /// Answer key if the client holds it
    pub known_answer: Option<OptionLabel>,
}

/// Wire reply of the answer check endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictReply {
    pub correct: bool,
    #[serde(default)]
    pub correct_answer: Option<String>,
}

/// Resolved outcome of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect { correct_answer: Option<OptionLabel> },
    /// No usable reply; treated as incorrect
    Failed,
}

impl Verdict {
    /// Interpret a remote result, failing closed on any error
    pub fn from_reply(result: Result<VerdictReply, ServiceError>) -> Self {
        match result {
            Ok(reply) if reply.correct => Verdict::Correct,
            Ok(reply) => Verdict::Incorrect {
                correct_answer: reply.correct_answer.as_deref().and_then(OptionLabel::from_str),
            },
            Err(err) => {
                log::warn!("Answer check failed, treating as incorrect: {}", err);
                Verdict::Failed
            }
        }
    }

}

pub type VerdictReceiver = oneshot::Receiver<Result<VerdictReply, ServiceError>>;

/// Immediate verdict or a handle to one in flight
#[derive(Debug)]
pub enum VerdictTicket {
    Ready(Verdict),
    Pending(VerdictReceiver),
}

pub trait CorrectnessOracle {
    fn mode(&self) -> TrustMode;

    fn check(&self, request: VerdictRequest) -> VerdictTicket;
}

/// Answers from the precomputed target flag
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOracle;

impl CorrectnessOracle for LocalOracle {
    fn mode(&self) -> TrustMode {
        TrustMode::Local
    }

    fn check(&self, request: VerdictRequest) -> VerdictTicket {
        let verdict = match request.precomputed {
            Some(true) => Verdict::Correct,
            Some(false) => Verdict::Incorrect {
                correct_answer: request.known_answer,
            },
            None => {
                log::warn!(
                    "Question {} in '{}' has no answer key",
                    request.question_index,
                    request.folder
                );
                Verdict::Failed
            }
        };
        VerdictTicket::Ready(verdict)
    }
}

/// How long a suspended step waits before the check counts as failed
pub const VERDICT_TIMEOUT: Duration = Duration::from_secs(8);

/// Asks the server, one spawned task per check
pub struct RemoteOracle {
    checker: Arc<dyn AnswerCheck>,
    runtime: Handle,
    timeout: Duration,
}

impl RemoteOracle {
    pub fn new(checker: Arc<dyn AnswerCheck>, runtime: Handle) -> Self {
        Self {
            checker,
            runtime,
            timeout: VERDICT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl CorrectnessOracle for RemoteOracle {
    fn mode(&self) -> TrustMode {
        TrustMode::Remote
    }

    fn check(&self, request: VerdictRequest) -> VerdictTicket {
        let (tx, rx) = oneshot::channel();
        let checker = Arc::clone(&self.checker);
        let timeout = self.timeout;
        self.runtime.spawn(async move {
            let result = match tokio::time::timeout(timeout, checker.check_answer(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Transport(format!(
                    "no reply within {} ms",
                    timeout.as_millis()
                ))),
            };
            // Receiver gone means the session moved on
            let _ = tx.send(result);
        });
        VerdictTicket::Pending(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceFuture;

    fn request(precomputed: Option<bool>) -> VerdictRequest {
        VerdictRequest {
            folder: "builtin-01".into(),
            question_index: 0,
            selected: OptionLabel::A,
            precomputed,
            known_answer: Some(OptionLabel::B),
        }
    }

    #[test]
    fn test_local_verdicts() {
        let oracle = LocalOracle;
        assert!(matches!(
            oracle.check(request(Some(true))),
            VerdictTicket::Ready(Verdict::Correct)
        ));
        assert!(matches!(
            oracle.check(request(Some(false))),
            VerdictTicket::Ready(Verdict::Incorrect {
                correct_answer: Some(OptionLabel::B)
            })
        ));
        assert!(matches!(
            oracle.check(request(None)),
            VerdictTicket::Ready(Verdict::Failed)
        ));
    }

    #[test]
    fn test_reply_fails_closed() {
        assert_eq!(
            Verdict::from_reply(Err(ServiceError::Status(500))),
            Verdict::Failed
        );
        let reply = VerdictReply {
            correct: false,
            correct_answer: Some("c".into()),
        };
        assert_eq!(
            Verdict::from_reply(Ok(reply)),
            Verdict::Incorrect {
                correct_answer: Some(OptionLabel::C)
            }
        );
    }

    #[test]
    fn test_reply_wire_format() {
        let reply: VerdictReply =
            serde_json::from_str(r#"{"correct":true,"correctAnswer":"B"}"#).unwrap();
        assert!(reply.correct);
        assert_eq!(reply.correct_answer.as_deref(), Some("B"));
        let bare: VerdictReply = serde_json::from_str(r#"{"correct":false}"#).unwrap();
        assert_eq!(bare.correct_answer, None);
    }

    struct AlwaysRight;

    impl AnswerCheck for AlwaysRight {
        fn check_answer(&self, request: &VerdictRequest) -> ServiceFuture<VerdictReply> {
            let answer = request.selected.to_string();
            Box::pin(async move {
                Ok(VerdictReply {
                    correct: true,
                    correct_answer: Some(answer),
                })
            })
        }
    }

    #[test]
    fn test_remote_resolves_through_channel() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let oracle = RemoteOracle::new(Arc::new(AlwaysRight), runtime.handle().clone());
        let VerdictTicket::Pending(rx) = oracle.check(request(None)) else {
            panic!("remote check must be pending");
        };
        let result = runtime.block_on(rx).unwrap();
        assert_eq!(Verdict::from_reply(result), Verdict::Correct);
    }

    struct Stalled;

    impl AnswerCheck for Stalled {
        fn check_answer(&self, _request: &VerdictRequest) -> ServiceFuture<VerdictReply> {
            Box::pin(std::future::pending())
        }
    }

    #[test]
    fn test_stalled_check_fails_closed() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let oracle = RemoteOracle::new(Arc::new(Stalled), runtime.handle().clone())
            .with_timeout(Duration::from_millis(20));
        let VerdictTicket::Pending(rx) = oracle.check(request(None)) else {
            panic!("remote check must be pending");
        };
        let result = runtime.block_on(rx).unwrap();
        assert!(matches!(result, Err(ServiceError::Transport(_))));
        assert_eq!(Verdict::from_reply(result), Verdict::Failed);
    }
}
