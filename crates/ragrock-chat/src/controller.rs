//! Session controller: drives one chat session's request lifecycle.
//!
//! A turn is committed to the transcript in two phases. `begin` runs
//! synchronously: it checks the guard, appends the user's message and
//! captures the scope. `complete` appends the assistant's answer, or an
//! error explanation, once the backend call resolves. `submit` chains both
//! around the backend call. Failures never escape as errors; they always
//! become a transcript entry.

use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ragrock_core::backend::ChatBackend;
use ragrock_core::config::StaleResponsePolicy;
use ragrock_core::types::{ChatRequest, ChatResponse};

use crate::error::ChatError;
use crate::request::build_request;
use crate::scope::ChatScope;
use crate::state::{SessionState, StateMachine};
use crate::transcript::{Message, MessageId, Transcript};

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Not accepted: blank question or a request already in flight.
    /// Nothing was appended and no request was sent.
    Rejected(ChatError),
    /// The backend answered; the assistant message was appended.
    Answered {
        message_id: MessageId,
        source_count: usize,
    },
    /// The request failed; an explanatory assistant message was appended.
    Failed { message_id: MessageId, reason: String },
    /// The transcript was cleared while the request was in flight and the
    /// session discards stale responses.
    Discarded,
}

/// A turn whose user message is recorded but whose answer is outstanding.
///
/// Carries the scope captured at submission so the answer is attributed to
/// the scope the question was asked under, whatever the selection is by the
/// time it arrives.
///
/// Holds the session in `Submitting`. Dropping it without `complete` (a
/// cancelled `submit` future, for instance) returns the session to `Idle`;
/// the user message stays in the transcript without an answer.
#[derive(Debug)]
pub struct PendingTurn {
    request: ChatRequest,
    scope: ChatScope,
    generation: u64,
    user_message_id: MessageId,
    state: StateMachine,
    settled: bool,
}

impl PendingTurn {
    fn settle(&mut self) {
        if self.settled {
            return;
        }
        self.settled = true;
        if let Err(e) = self.state.transition(SessionState::Idle) {
            tracing::warn!(error = %e, "Unexpected state on completion");
            self.state.reset();
        }
    }

    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    pub fn scope(&self) -> &ChatScope {
        &self.scope
    }

    pub fn user_message_id(&self) -> MessageId {
        self.user_message_id
    }
}

impl Drop for PendingTurn {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(
                question_id = %self.user_message_id,
                "Chat request abandoned before completion"
            );
            self.settle();
        }
    }
}

/// Text shown in place of an answer when a request fails.
pub fn failure_message(reason: &str) -> String {
    format!(
        "I apologize, but I encountered an error: {}. Please try again.",
        reason
    )
}

/// Orchestrates one chat session.
///
/// Clones share the same transcript and state, so a clone can be moved into
/// a task while this handle keeps serving reads. Separate sessions must use
/// separate controllers.
pub struct SessionController<B> {
    backend: Arc<B>,
    state: StateMachine,
    transcript: Arc<Mutex<Transcript>>,
    stale_policy: StaleResponsePolicy,
}

impl<B> Clone for SessionController<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: self.state.clone(),
            transcript: Arc::clone(&self.transcript),
            stale_policy: self.stale_policy,
        }
    }
}

impl<B: ChatBackend> SessionController<B> {
    /// Create an idle session with an empty transcript.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            state: StateMachine::new(),
            transcript: Arc::new(Mutex::new(Transcript::new())),
            stale_policy: StaleResponsePolicy::default(),
        }
    }

    /// Choose what happens to responses that outlive a `clear`.
    pub fn with_stale_policy(mut self, policy: StaleResponsePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    fn transcript_guard(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        self.state.current()
    }

    pub fn is_busy(&self) -> bool {
        self.state() == SessionState::Submitting
    }

    /// Snapshot of the transcript, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.transcript_guard().messages().to_vec()
    }

    /// Run `f` against the transcript without copying it.
    pub fn with_transcript<R>(&self, f: impl FnOnce(&Transcript) -> R) -> R {
        f(&*self.transcript_guard())
    }

    pub fn len(&self) -> usize {
        self.transcript_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript_guard().is_empty()
    }

    /// Empty the transcript. An in-flight request is not affected.
    pub fn clear(&self) {
        let mut transcript = self.transcript_guard();
        transcript.clear();
        tracing::info!(
            generation = transcript.generation(),
            in_flight = self.is_busy(),
            "Chat transcript cleared"
        );
    }

    /// Ask a question under `scope` and record the outcome.
    pub async fn submit(&self, input: &str, scope: ChatScope) -> SubmitOutcome {
        let pending = match self.begin(input, scope) {
            Ok(pending) => pending,
            Err(rejection) => return SubmitOutcome::Rejected(rejection),
        };

        let result = self.backend.chat(pending.request()).await;
        self.complete(pending, result)
    }

    /// Phase one: validate, append the user message, enter `Submitting`.
    pub fn begin(&self, input: &str, scope: ChatScope) -> Result<PendingTurn, ChatError> {
        let question = input.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }
        if !self.state.try_begin() {
            tracing::debug!("Submission ignored, request already in flight");
            return Err(ChatError::Busy);
        }

        let request = build_request(question, &scope);
        let mut transcript = self.transcript_guard();
        let user_message_id = transcript.next_id();
        transcript.append(Message::user(user_message_id, question, scope.file_id));

        tracing::info!(
            message_id = %user_message_id,
            file_id = ?scope.file_id,
            k = request.k,
            keywords = request.keywords.as_ref().map_or(0, Vec::len),
            "Chat question submitted"
        );

        Ok(PendingTurn {
            request,
            scope,
            generation: transcript.generation(),
            user_message_id,
            state: self.state.clone(),
            settled: false,
        })
    }

    /// Phase two: record the answer or failure and return to `Idle`.
    pub fn complete<E: Display>(
        &self,
        mut pending: PendingTurn,
        result: Result<ChatResponse, E>,
    ) -> SubmitOutcome {
        let outcome = {
            let mut transcript = self.transcript_guard();

            if self.stale_policy == StaleResponsePolicy::Discard
                && transcript.generation() != pending.generation
            {
                tracing::info!(
                    question_id = %pending.user_message_id,
                    "Discarding response for a cleared transcript"
                );
                SubmitOutcome::Discarded
            } else {
                let message_id = transcript.next_id();
                match result {
                    Ok(response) => {
                        let source_count = response.sources.len();
                        transcript.append(Message::assistant(
                            message_id,
                            response.answer,
                            pending.scope.file_id,
                            response.sources,
                        ));
                        tracing::info!(
                            question_id = %pending.user_message_id,
                            source_count,
                            "Chat answer received"
                        );
                        SubmitOutcome::Answered {
                            message_id,
                            source_count,
                        }
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        transcript.append(Message::assistant(
                            message_id,
                            failure_message(&reason),
                            pending.scope.file_id,
                            Vec::new(),
                        ));
                        tracing::warn!(
                            question_id = %pending.user_message_id,
                            error = %reason,
                            "Chat request failed"
                        );
                        SubmitOutcome::Failed { message_id, reason }
                    }
                }
            }
        };

        pending.settle();
        outcome
    }
}
