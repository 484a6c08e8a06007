//! Observable question collection kept in sync with the remote service.
//!
//! # Design
//! `QuestionStore` is a cheap, cloneable handle to an actor task. Every
//! operation enqueues a command and returns immediately. The actor is the
//! only owner of the collection: it runs gateway calls in a `JoinSet` and
//! applies each completion inside its own loop, one at a time, then
//! publishes a fresh `StoreState` snapshot on a `watch` channel. Observers
//! therefore never see a half-applied change.
//!
//! A refresh replaces the collection wholesale. Mutations confirmed while a
//! refresh is outstanding are journaled and replayed on top of the fetched
//! list, so a create that lands during a refresh is not lost. A refresh
//! result older than one already applied is discarded.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinSet};

use crate::error::{ErrorKind, GatewayError};
use crate::gateway::QuestionGateway;
use crate::transport::{Transport, TransportError};
use crate::types::{Question, QuestionId};

/// Store operation, used to label errors and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Refresh,
    Submit,
    Update,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Refresh => "refresh",
            Operation::Submit => "submit",
            Operation::Update => "update",
            Operation::Remove => "remove",
        };
        f.write_str(name)
    }
}

/// Display-ready summary of the most recent failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub operation: Operation,
    pub kind: ErrorKind,
    pub message: String,
}

impl LastError {
    fn new(operation: Operation, err: &GatewayError) -> Self {
        Self {
            operation,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for LastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.message)
    }
}

/// Snapshot published after every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    /// Persisted questions, unique by id, in server order.
    pub questions: Vec<Question>,
    /// True while at least one refresh is outstanding.
    pub busy: bool,
    pub last_error: Option<LastError>,
    /// Gateway calls issued but not yet applied.
    pub in_flight: usize,
    /// Increments with every published snapshot.
    pub version: u64,
}

impl StoreState {
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

#[derive(Debug)]
enum Command {
    Refresh,
    Submit(Question),
    Update(Question),
    Remove(QuestionId),
    Settle(oneshot::Sender<()>),
}

/// Result of one gateway call, carried back into the actor.
#[derive(Debug)]
enum Outcome {
    Listed {
        issued: u64,
        result: Result<Vec<Question>, GatewayError>,
    },
    Created(Result<Question, GatewayError>),
    Updated(Result<Question, GatewayError>),
    Removed {
        id: QuestionId,
        result: Result<(), GatewayError>,
    },
}

/// Mutation confirmed by the server while a refresh was outstanding.
#[derive(Debug, Clone)]
enum Change {
    Created(Question),
    Updated(Question),
    Removed(QuestionId),
}

/// Handle to the question store actor.
#[derive(Debug, Clone)]
pub struct QuestionStore {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<StoreState>,
}

impl QuestionStore {
    /// Start the store actor on the current Tokio runtime.
    ///
    /// The actor keeps running until every handle is dropped and all issued
    /// operations have completed.
    pub fn spawn<T: Transport>(gateway: QuestionGateway<T>) -> Self {
        Self::spawn_shared(Arc::new(gateway))
    }

    /// Like `spawn`, for a gateway that is also used elsewhere.
    pub fn spawn_shared<T: Transport>(gateway: Arc<QuestionGateway<T>>) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(StoreState::default());
        let actor = StoreActor::new(gateway, state_tx);
        tokio::spawn(actor.run(command_rx));
        Self { commands, state }
    }

    /// Reload the whole collection from the server.
    pub fn refresh(&self) {
        self.send(Command::Refresh);
    }

    /// Create `draft` on the server and append the persisted result.
    pub fn submit(&self, draft: Question) {
        self.send(Command::Submit(draft));
    }

    /// Save an edited question and replace the local entry with the server's
    /// copy.
    pub fn update(&self, question: Question) {
        self.send(Command::Update(question));
    }

    /// Delete a question on the server, then drop it locally.
    pub fn remove(&self, id: QuestionId) {
        self.send(Command::Remove(id));
    }

    /// Wait until no operation is in flight.
    pub async fn settle(&self) {
        let (tx, rx) = oneshot::channel();
        if self.send(Command::Settle(tx)) {
            let _ = rx.await;
        }
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub fn questions(&self) -> Vec<Question> {
        self.state.borrow().questions.clone()
    }

    pub fn busy(&self) -> bool {
        self.state.borrow().busy
    }

    pub fn last_error(&self) -> Option<LastError> {
        self.state.borrow().last_error.clone()
    }

    /// Receiver that is notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.clone()
    }

    fn send(&self, command: Command) -> bool {
        if self.commands.send(command).is_err() {
            tracing::warn!("question store actor is no longer running");
            return false;
        }
        true
    }
}

struct StoreActor<T> {
    gateway: Arc<QuestionGateway<T>>,
    state: watch::Sender<StoreState>,
    tasks: JoinSet<Outcome>,
    questions: Vec<Question>,
    last_error: Option<LastError>,
    pending_refreshes: usize,
    /// Logical clock shared by refresh issue points and confirmed changes.
    clock: u64,
    newest_applied_refresh: Option<u64>,
    journal: Vec<(u64, Change)>,
    settle_waiters: Vec<oneshot::Sender<()>>,
    version: u64,
}

impl<T: Transport> StoreActor<T> {
    fn new(gateway: Arc<QuestionGateway<T>>, state: watch::Sender<StoreState>) -> Self {
        Self {
            gateway,
            state,
            tasks: JoinSet::new(),
            questions: Vec::new(),
            last_error: None,
            pending_refreshes: 0,
            clock: 0,
            newest_applied_refresh: None,
            journal: Vec::new(),
            settle_waiters: Vec::new(),
            version: 0,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut open = true;
        loop {
            tokio::select! {
                command = commands.recv(), if open => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::debug!(in_flight = self.tasks.len(), "store handles dropped, draining");
                        open = false;
                    }
                },
                Some(joined) = self.tasks.join_next() => self.handle_joined(joined),
                else => break,
            }
        }
        tracing::debug!("question store actor stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Refresh => {
                self.clock += 1;
                let issued = self.clock;
                self.pending_refreshes += 1;
                tracing::info!(issued, pending = self.pending_refreshes, "refreshing questions");
                let gateway = Arc::clone(&self.gateway);
                self.tasks.spawn(async move {
                    let result = isolated(async move { gateway.list().await }).await;
                    Outcome::Listed { issued, result }
                });
            }
            Command::Submit(draft) => {
                tracing::info!(text = %draft.text, choices = draft.choices.len(), "submitting question");
                let gateway = Arc::clone(&self.gateway);
                self.tasks.spawn(async move {
                    Outcome::Created(isolated(async move { gateway.create(&draft).await }).await)
                });
            }
            Command::Update(question) => {
                tracing::info!(id = question.id, "updating question");
                let gateway = Arc::clone(&self.gateway);
                self.tasks.spawn(async move {
                    Outcome::Updated(isolated(async move { gateway.update(&question).await }).await)
                });
            }
            Command::Remove(id) => {
                tracing::info!(id, "removing question");
                let gateway = Arc::clone(&self.gateway);
                self.tasks.spawn(async move {
                    let result = isolated(async move { gateway.delete(id).await }).await;
                    Outcome::Removed { id, result }
                });
            }
            Command::Settle(waiter) => {
                if self.tasks.is_empty() {
                    let _ = waiter.send(());
                } else {
                    self.settle_waiters.push(waiter);
                }
                return;
            }
        }
        self.publish();
    }

    fn handle_joined(&mut self, joined: Result<Outcome, JoinError>) {
        match joined {
            Ok(outcome) => self.apply(outcome),
            Err(err) => tracing::error!(error = %err, "store operation task failed"),
        }

        if self.pending_refreshes == 0 {
            self.journal.clear();
        }
        self.publish();
        if self.tasks.is_empty() {
            for waiter in self.settle_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Listed { issued, result } => self.apply_list(issued, result),
            Outcome::Created(Ok(question)) => {
                tracing::info!(id = question.id, "question created");
                self.record(Change::Created(question.clone()));
                upsert(&mut self.questions, question);
                self.last_error = None;
            }
            Outcome::Updated(Ok(question)) => {
                tracing::info!(id = question.id, "question updated");
                self.record(Change::Updated(question.clone()));
                replace(&mut self.questions, question);
                self.last_error = None;
            }
            Outcome::Removed { id, result: Ok(()) } => {
                tracing::info!(id, "question removed");
                self.record(Change::Removed(id));
                self.questions.retain(|q| q.id != id);
                self.last_error = None;
            }
            Outcome::Created(Err(err)) => self.fail(Operation::Submit, err),
            Outcome::Updated(Err(err)) => self.fail(Operation::Update, err),
            Outcome::Removed { result: Err(err), .. } => self.fail(Operation::Remove, err),
        }
    }

    fn apply_list(&mut self, issued: u64, result: Result<Vec<Question>, GatewayError>) {
        self.pending_refreshes = self.pending_refreshes.saturating_sub(1);

        if self.newest_applied_refresh.is_some_and(|newest| newest > issued) {
            tracing::debug!(issued, "discarding refresh overtaken by a newer one");
            return;
        }

        match result {
            Ok(questions) => {
                tracing::info!(issued, count = questions.len(), "questions refreshed");
                self.newest_applied_refresh = Some(issued);
                self.questions = questions;
                for (_, change) in self.journal.iter().filter(|(at, _)| *at > issued) {
                    match change.clone() {
                        Change::Created(question) => upsert(&mut self.questions, question),
                        Change::Updated(question) => replace(&mut self.questions, question),
                        Change::Removed(id) => self.questions.retain(|q| q.id != id),
                    }
                }
                self.last_error = None;
            }
            Err(err) => self.fail(Operation::Refresh, err),
        }
    }

    fn record(&mut self, change: Change) {
        if self.pending_refreshes > 0 {
            self.clock += 1;
            self.journal.push((self.clock, change));
        }
    }

    fn fail(&mut self, operation: Operation, err: GatewayError) {
        tracing::warn!(%operation, kind = %err.kind(), error = %err, "store operation failed");
        self.last_error = Some(LastError::new(operation, &err));
    }

    fn publish(&mut self) {
        self.version += 1;
        self.state.send_replace(StoreState {
            questions: self.questions.clone(),
            busy: self.pending_refreshes > 0,
            last_error: self.last_error.clone(),
            in_flight: self.tasks.len(),
            version: self.version,
        });
    }
}

/// Run a gateway call on its own task so a panic inside the transport still
/// yields an outcome for the operation that issued it.
async fn isolated<F, R>(call: F) -> Result<R, GatewayError>
where
    F: Future<Output = Result<R, GatewayError>> + Send + 'static,
    R: Send + 'static,
{
    match tokio::spawn(call).await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(error = %err, "gateway call aborted");
            Err(GatewayError::Transport(TransportError::with_source(
                "gateway call aborted",
                err,
            )))
        }
    }
}

/// Replace the entry with the same id, or append if there is none.
fn upsert(questions: &mut Vec<Question>, question: Question) {
    match questions.iter_mut().find(|q| q.id == question.id) {
        Some(slot) => *slot = question,
        None => questions.push(question),
    }
}

/// Replace the entry with the same id; unknown ids are ignored.
fn replace(questions: &mut [Question], question: Question) {
    if let Some(slot) = questions.iter_mut().find(|q| q.id == question.id) {
        *slot = question;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};
    use crate::types::Choice;

    const BASE_URL: &str = "http://quiz.test";

    /// A request parked until the test decides how it completes.
    struct Pending {
        request: HttpRequest,
        reply: oneshot::Sender<Result<HttpResponse, TransportError>>,
    }

    impl Pending {
        fn respond(self, status: u16, body: impl Into<String>) {
            let _ = self.reply.send(Ok(HttpResponse::new(status, body)));
        }

        fn respond_json<S: serde::Serialize>(self, value: &S) {
            let body = serde_json::to_string(value).unwrap();
            self.respond(200, body);
        }

        fn fail(self) {
            let _ = self
                .reply
                .send(Err(TransportError::new("connection refused")));
        }
    }

    struct ManualTransport {
        requests: mpsc::UnboundedSender<Pending>,
    }

    impl Transport for ManualTransport {
        fn execute(
            &self,
            request: HttpRequest,
        ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
            let (reply, rx) = oneshot::channel();
            let _ = self.requests.send(Pending { request, reply });
            async move {
                rx.await
                    .unwrap_or_else(|_| Err(TransportError::new("request abandoned")))
            }
        }
    }

    fn harness() -> (QuestionStore, mpsc::UnboundedReceiver<Pending>) {
        let (requests, rx) = mpsc::unbounded_channel();
        let gateway = QuestionGateway::new(BASE_URL, ManualTransport { requests });
        (QuestionStore::spawn(gateway), rx)
    }

    fn question(id: QuestionId, text: &str) -> Question {
        Question {
            id,
            text: text.to_string(),
            choices: vec![
                Choice {
                    id: 1,
                    text: "yes".to_string(),
                    is_correct: true,
                },
                Choice {
                    id: 2,
                    text: "no".to_string(),
                    is_correct: false,
                },
            ],
        }
    }

    fn ids(questions: &[Question]) -> Vec<QuestionId> {
        questions.iter().map(|q| q.id).collect()
    }

    async fn loaded(questions: &[Question]) -> (QuestionStore, mpsc::UnboundedReceiver<Pending>) {
        let (store, mut rx) = harness();
        store.refresh();
        rx.recv().await.unwrap().respond_json(&questions);
        store.settle().await;
        assert_eq!(store.questions(), questions);
        (store, rx)
    }

    async fn wait_in_flight(store: &QuestionStore, count: usize) {
        store
            .subscribe()
            .wait_for(|s| s.in_flight == count)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn refresh_replaces_collection_in_server_order() {
        let (store, mut rx) = harness();
        store.refresh();

        let pending = rx.recv().await.unwrap();
        assert_eq!(pending.request.method, HttpMethod::Get);
        assert_eq!(pending.request.url, "http://quiz.test/questions/");
        assert!(store.busy());

        let fetched = vec![question(3, "c"), question(1, "a"), question(2, "b")];
        pending.respond_json(&fetched);
        store.settle().await;

        let state = store.snapshot();
        assert_eq!(state.questions, fetched);
        assert!(!state.busy);
        assert_eq!(state.last_error, None);
        assert_eq!(state.in_flight, 0);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_collection() {
        let (store, mut rx) = loaded(&[question(1, "a")]).await;

        store.refresh();
        rx.recv().await.unwrap().fail();
        store.settle().await;

        let state = store.snapshot();
        assert_eq!(ids(&state.questions), vec![1]);
        assert!(!state.busy);
        let err = state.last_error.unwrap();
        assert_eq!(err.operation, Operation::Refresh);
        assert_eq!(err.kind, ErrorKind::Transport);
    }

    #[tokio::test]
    async fn undecodable_refresh_is_invalid_response() {
        let (store, mut rx) = loaded(&[question(1, "a")]).await;

        store.refresh();
        rx.recv().await.unwrap().respond(200, "<html>oops</html>");
        store.settle().await;

        assert_eq!(ids(&store.questions()), vec![1]);
        assert_eq!(
            store.last_error().map(|e| e.kind),
            Some(ErrorKind::InvalidResponse)
        );
    }

    #[tokio::test]
    async fn submit_appends_persisted_question() {
        let (store, mut rx) = loaded(&[question(1, "a")]).await;

        let draft = Question::draft("new").choice("x", true).build();
        store.submit(draft);

        let pending = rx.recv().await.unwrap();
        assert_eq!(pending.request.method, HttpMethod::Post);
        let body: serde_json::Value =
            serde_json::from_str(pending.request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["question_text"], "new");
        pending.respond_json(&question(7, "new"));
        store.settle().await;

        let questions = store.questions();
        assert_eq!(ids(&questions), vec![1, 7]);
        assert_eq!(questions.iter().filter(|q| q.id == 7).count(), 1);
        assert!(questions.iter().all(|q| q.id != 0));
        assert!(!store.busy());
    }

    #[tokio::test]
    async fn submit_encode_failure_never_reaches_network() {
        let (store, mut rx) = loaded(&[question(1, "a")]).await;

        store.submit(Question::draft("no choices").build());
        store.settle().await;

        assert!(rx.try_recv().is_err());
        assert_eq!(ids(&store.questions()), vec![1]);
        let err = store.last_error().unwrap();
        assert_eq!(err.operation, Operation::Submit);
        assert_eq!(err.kind, ErrorKind::EncodeFailure);
    }

    #[tokio::test]
    async fn update_replaces_entry_in_place() {
        let (store, mut rx) = loaded(&[question(1, "a"), question(2, "b"), question(3, "c")]).await;

        let edited = question(2, "b, edited");
        store.update(edited.clone());
        let pending = rx.recv().await.unwrap();
        assert_eq!(pending.request.method, HttpMethod::Put);
        assert_eq!(pending.request.url, "http://quiz.test/questions/2");
        pending.respond_json(&edited);
        store.settle().await;

        let state = store.snapshot();
        assert_eq!(ids(&state.questions), vec![1, 2, 3]);
        assert_eq!(state.get(2).unwrap().text, "b, edited");
    }

    #[tokio::test]
    async fn failed_update_leaves_collection_untouched() {
        let (store, mut rx) = loaded(&[question(1, "a")]).await;

        store.update(question(1, "changed"));
        rx.recv()
            .await
            .unwrap()
            .respond(404, r#"{"detail":"Question not found"}"#);
        store.settle().await;

        assert_eq!(store.questions()[0].text, "a");
        assert_eq!(store.last_error().unwrap().operation, Operation::Update);
    }

    #[tokio::test]
    async fn remove_unknown_id_is_a_noop() {
        let (store, mut rx) = loaded(&[question(1, "a"), question(2, "b")]).await;

        store.remove(99);
        let pending = rx.recv().await.unwrap();
        assert_eq!(pending.request.method, HttpMethod::Delete);
        assert_eq!(pending.request.url, "http://quiz.test/questions/99");
        pending.respond(200, r#"{"message":"deleted"}"#);
        store.settle().await;

        assert_eq!(ids(&store.questions()), vec![1, 2]);
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test]
    async fn failed_remove_keeps_entry() {
        let (store, mut rx) = loaded(&[question(1, "a")]).await;

        store.remove(1);
        rx.recv().await.unwrap().fail();
        store.settle().await;

        assert_eq!(ids(&store.questions()), vec![1]);
        assert_eq!(store.last_error().unwrap().operation, Operation::Remove);
    }

    #[tokio::test]
    async fn concurrent_removes_apply_independently() {
        let all: Vec<Question> = (1..=4).map(|id| question(id, "q")).collect();
        let (store, mut rx) = loaded(&all).await;

        store.remove(1);
        store.remove(2);
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        second.respond(200, "");
        first.respond(200, "");
        store.settle().await;

        assert_eq!(ids(&store.questions()), vec![3, 4]);
    }

    #[tokio::test]
    async fn busy_stays_set_until_last_refresh_completes() {
        let (store, mut rx) = harness();

        store.refresh();
        store.refresh();
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();

        first.respond_json(&vec![question(1, "a")]);
        wait_in_flight(&store, 1).await;
        assert!(store.busy());

        second.respond_json(&vec![question(1, "a")]);
        store.settle().await;
        assert!(!store.busy());
    }

    #[tokio::test]
    async fn stale_refresh_result_is_discarded() {
        let (store, mut rx) = harness();

        store.refresh();
        store.refresh();
        let older = rx.recv().await.unwrap();
        let newer = rx.recv().await.unwrap();

        newer.respond_json(&vec![question(2, "fresh")]);
        wait_in_flight(&store, 1).await;
        older.respond_json(&vec![question(1, "stale")]);
        store.settle().await;

        assert_eq!(ids(&store.questions()), vec![2]);
        assert!(!store.busy());
    }

    #[tokio::test]
    async fn submit_confirmed_during_refresh_survives_replacement() {
        let (store, mut rx) = harness();

        store.refresh();
        let listing = rx.recv().await.unwrap();
        store.submit(Question::draft("new").choice("x", true).build());
        let creating = rx.recv().await.unwrap();

        creating.respond_json(&question(7, "new"));
        wait_in_flight(&store, 1).await;
        assert_eq!(ids(&store.questions()), vec![7]);

        // The listing was served before the create reached the server.
        listing.respond_json(&vec![question(1, "a")]);
        store.settle().await;

        assert_eq!(ids(&store.questions()), vec![1, 7]);
    }

    #[tokio::test]
    async fn created_question_already_in_listing_is_not_duplicated() {
        let (store, mut rx) = harness();

        store.refresh();
        let listing = rx.recv().await.unwrap();
        store.submit(Question::draft("new").choice("x", true).build());
        let creating = rx.recv().await.unwrap();

        creating.respond_json(&question(7, "new"));
        wait_in_flight(&store, 1).await;
        listing.respond_json(&vec![question(1, "a"), question(7, "new")]);
        store.settle().await;

        assert_eq!(ids(&store.questions()), vec![1, 7]);
    }

    #[tokio::test]
    async fn remove_confirmed_during_refresh_is_not_resurrected() {
        let (store, mut rx) = loaded(&[question(1, "a"), question(2, "b")]).await;

        store.refresh();
        let listing = rx.recv().await.unwrap();
        store.remove(1);
        rx.recv().await.unwrap().respond(200, "");
        wait_in_flight(&store, 1).await;

        listing.respond_json(&vec![question(1, "a"), question(2, "b")]);
        store.settle().await;

        assert_eq!(ids(&store.questions()), vec![2]);
    }

    #[tokio::test]
    async fn success_clears_previous_error() {
        let (store, mut rx) = loaded(&[]).await;

        store.refresh();
        rx.recv().await.unwrap().fail();
        store.settle().await;
        assert!(store.last_error().is_some());

        store.refresh();
        rx.recv().await.unwrap().respond_json(&vec![question(1, "a")]);
        store.settle().await;
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test]
    async fn observers_are_notified_of_changes() {
        let (store, mut rx) = harness();
        let mut updates = store.subscribe();
        let start = updates.borrow_and_update().version;

        store.refresh();
        updates.changed().await.unwrap();
        assert!(updates.borrow_and_update().busy);

        rx.recv().await.unwrap().respond_json(&vec![question(5, "e")]);
        updates
            .wait_for(|s| !s.busy && s.questions.len() == 1)
            .await
            .unwrap();
        assert!(store.snapshot().version > start);
    }

    #[tokio::test]
    async fn create_reply_without_id_is_rejected() {
        let (store, mut rx) = loaded(&[question(1, "a")]).await;

        store.submit(Question::draft("new").choice("x", true).build());
        rx.recv().await.unwrap().respond(
            200,
            r#"{"question_text":"new","choices":[{"choice_text":"x","is_correct":true}]}"#,
        );
        store.settle().await;

        assert_eq!(ids(&store.questions()), vec![1]);
        let err = store.last_error().unwrap();
        assert_eq!(err.operation, Operation::Submit);
        assert_eq!(err.kind, ErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn listing_with_duplicate_ids_keeps_collection() {
        let (store, mut rx) = loaded(&[question(1, "a")]).await;

        store.refresh();
        rx.recv()
            .await
            .unwrap()
            .respond_json(&vec![question(2, "b"), question(2, "b again")]);
        store.settle().await;

        assert_eq!(ids(&store.questions()), vec![1]);
        assert_eq!(
            store.last_error().map(|e| e.kind),
            Some(ErrorKind::InvalidResponse)
        );
        assert!(!store.busy());
    }

    #[tokio::test]
    async fn updating_a_draft_never_reaches_network() {
        let (store, mut rx) = loaded(&[question(1, "a")]).await;

        store.update(Question::draft("unsaved").choice("x", true).build());
        store.settle().await;

        assert!(rx.try_recv().is_err());
        let err = store.last_error().unwrap();
        assert_eq!(err.operation, Operation::Update);
        assert_eq!(err.kind, ErrorKind::EncodeFailure);
    }

    struct PanickingTransport;

    impl Transport for PanickingTransport {
        fn execute(
            &self,
            request: HttpRequest,
        ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
            async move {
                if !request.url.is_empty() {
                    panic!("transport exploded on {}", request.url);
                }
                Err(TransportError::new("empty url"))
            }
        }
    }

    #[tokio::test]
    async fn panicking_refresh_still_clears_busy() {
        let store = QuestionStore::spawn(QuestionGateway::new(BASE_URL, PanickingTransport));

        store.refresh();
        store.settle().await;

        let state = store.snapshot();
        assert!(!state.busy);
        assert_eq!(state.in_flight, 0);
        let err = state.last_error.unwrap();
        assert_eq!(err.operation, Operation::Refresh);
        assert_eq!(err.kind, ErrorKind::Transport);

        store.remove(1);
        store.settle().await;
        assert_eq!(store.last_error().unwrap().operation, Operation::Remove);
    }

    #[test]
    fn last_error_display_names_operation() {
        let err = LastError::new(
            Operation::Remove,
            &GatewayError::InvalidEndpoint("bad".to_string()),
        );
        assert_eq!(err.to_string(), "remove failed: invalid endpoint: bad");
        assert_eq!(err.kind, ErrorKind::InvalidEndpoint);
    }
}
