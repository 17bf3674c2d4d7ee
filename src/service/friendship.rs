//! Friendship workflow engine
//!
//! Orchestrates the friend-request tracker and the friendship ledger.
//! Every check-then-write sequence runs inside one immediate transaction,
//! so the two tables never disagree and concurrent calls serialize.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data::{
    Database, FriendEntry, FriendRequest, FriendRequestStatus, Identity, LedgerError,
    RequestPayload, TrackerError, friend_requests, friendships,
};
use crate::error::{AppError, FriendshipError};
use crate::metrics::observe_friend_request;

/// Recipient's answer to a friend request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendAction {
    Accept,
    Reject,
}

impl FriendAction {
    /// Parse "accept" or "reject", ignoring case and surrounding whitespace
    pub fn parse(raw: &str) -> Result<Self, FriendshipError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            _ => Err(FriendshipError::InvalidAction(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }

    fn target_status(&self) -> FriendRequestStatus {
        match self {
            Self::Accept => FriendRequestStatus::Accepted,
            Self::Reject => FriendRequestStatus::Rejected,
        }
    }
}

/// What a respond did to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipResult {
    Added,
    AlreadyExists,
    Removed,
    None,
}

/// Result of a send
#[derive(Debug, Clone, Serialize)]
pub struct SentRequest {
    pub request_id: i64,
    pub sender: String,
    pub recipient: String,
    pub status: FriendRequestStatus,
    pub payload: RequestPayload,
    pub created_at: DateTime<Utc>,
}

/// Result of a respond
#[derive(Debug, Clone, Serialize)]
pub struct RespondOutcome {
    pub request_id: i64,
    pub friend_username: String,
    pub action: FriendAction,
    pub previous_status: FriendRequestStatus,
    pub new_status: FriendRequestStatus,
    pub friendship_changed: bool,
    pub friendship_result: FriendshipResult,
    pub message: String,
    pub your_friends_count: i64,
    pub their_friends_count: i64,
}

/// Incoming pending and outgoing requests of one user
#[derive(Debug, Clone, Serialize)]
pub struct RequestListing {
    pub received: Vec<FriendRequest>,
    pub sent: Vec<FriendRequest>,
    pub total_received: usize,
    pub total_sent: usize,
}

/// Confirmed friends of one user
#[derive(Debug, Clone, Serialize)]
pub struct FriendListing {
    pub user_id: String,
    pub username: String,
    pub friends: Vec<FriendEntry>,
    pub total_friends: usize,
}

fn respond_message(
    sender_handle: &str,
    previous: FriendRequestStatus,
    action: FriendAction,
) -> String {
    match (previous, action) {
        (FriendRequestStatus::Rejected, FriendAction::Accept) => format!(
            "Previously rejected friend request from {sender_handle} has been accepted! You are now friends."
        ),
        (_, FriendAction::Accept) => format!(
            "Friend request from {sender_handle} accepted successfully! You are now friends."
        ),
        (FriendRequestStatus::Rejected, FriendAction::Reject) => {
            format!("Friend request from {sender_handle} rejected again")
        }
        (_, FriendAction::Reject) => {
            format!("Friend request from {sender_handle} rejected successfully")
        }
    }
}

fn outcome_label<T>(result: &Result<T, AppError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(AppError::Friendship(_)) => "refused",
        Err(_) => "failed",
    }
}

/// Friendship workflow service
pub struct FriendshipService {
    db: Arc<Database>,
}

impl FriendshipService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn resolve_caller(&self, caller: &Identity) -> Result<Identity, AppError> {
        self.db
            .resolve_by_id(&caller.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", caller.id)))
    }

    /// Send a friend request from `caller` to the user named `recipient_handle`.
    ///
    /// # Errors
    /// `SelfRequest`, `UnknownRecipient`, `AlreadyFriends` or
    /// `RequestAlreadyPending` (in either direction)
    pub async fn send_request(
        &self,
        caller: &Identity,
        recipient_handle: &str,
    ) -> Result<SentRequest, AppError> {
        let result = self.send_request_inner(caller, recipient_handle).await;
        observe_friend_request("send", outcome_label(&result));
        result
    }

    async fn send_request_inner(
        &self,
        caller: &Identity,
        recipient_handle: &str,
    ) -> Result<SentRequest, AppError> {
        let recipient_handle = recipient_handle.trim();
        if recipient_handle.is_empty() {
            return Err(FriendshipError::MissingHandle.into());
        }
        if recipient_handle == caller.handle {
            return Err(FriendshipError::SelfRequest.into());
        }

        let sender = self.resolve_caller(caller).await?;
        let recipient = self
            .db
            .resolve_by_handle(recipient_handle)
            .await?
            .ok_or_else(|| FriendshipError::UnknownRecipient(recipient_handle.to_string()))?;
        if sender.id == recipient.id {
            return Err(FriendshipError::SelfRequest.into());
        }

        let now = Utc::now();
        let payload = RequestPayload::for_sender(&sender.handle);
        let mut tx = self.db.begin_immediate().await?;

        let result: Result<FriendRequest, AppError> = async {
            let conn = tx.conn();

            if friendships::exists(conn, &sender.id, &recipient.id).await? {
                return Err(FriendshipError::AlreadyFriends(recipient.handle.clone()).into());
            }

            if let Some(existing) =
                friend_requests::find_between(conn, &sender.id, &recipient.id).await?
            {
                if existing.status == FriendRequestStatus::Pending {
                    return Err(FriendshipError::RequestAlreadyPending {
                        request_id: existing.id,
                        sender: existing.sender_handle,
                        recipient: existing.recipient_handle,
                        status: existing.status,
                    }
                    .into());
                }
            }

            match friend_requests::create(conn, &sender, &recipient, &payload, now).await {
                Ok(request) => Ok(request),
                Err(TrackerError::DuplicatePair { .. }) => {
                    Ok(friend_requests::reopen(conn, &sender, &recipient, &payload, now).await?)
                }
                Err(error) => Err(error.into()),
            }
        }
        .await;

        let request = tx.finish(result).await?;

        tracing::info!(
            request_id = request.id,
            sender = %request.sender_id,
            recipient = %request.recipient_id,
            "Friend request sent"
        );

        Ok(SentRequest {
            request_id: request.id,
            sender: request.sender_handle,
            recipient: request.recipient_handle,
            status: request.status,
            payload: request.payload,
            created_at: request.created_at,
        })
    }

    /// Accept or reject the request `sender_handle` sent to `responder`.
    ///
    /// Pending and previously rejected requests can be answered; an
    /// accepted one cannot.
    pub async fn respond(
        &self,
        responder: &Identity,
        sender_handle: &str,
        action: &str,
    ) -> Result<RespondOutcome, AppError> {
        let result = self.respond_inner(responder, sender_handle, action).await;
        observe_friend_request("respond", outcome_label(&result));
        result
    }

    async fn respond_inner(
        &self,
        responder: &Identity,
        sender_handle: &str,
        action: &str,
    ) -> Result<RespondOutcome, AppError> {
        let action = FriendAction::parse(action)?;
        let sender_handle = sender_handle.trim();
        if sender_handle.is_empty() {
            return Err(FriendshipError::MissingHandle.into());
        }

        let responder = self.resolve_caller(responder).await?;
        let sender = self
            .db
            .resolve_by_handle(sender_handle)
            .await?
            .ok_or_else(|| FriendshipError::UnknownSender(sender_handle.to_string()))?;

        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;

        let result: Result<RespondOutcome, AppError> = async {
            let conn = tx.conn();

            let request = friend_requests::find_directed(conn, &sender.id, &responder.id)
                .await?
                .ok_or_else(|| FriendshipError::NoSuchRequest(sender.handle.clone()))?;
            if !request.status.is_respondable() {
                return Err(FriendshipError::AlreadyFriends(sender.handle.clone()).into());
            }
            let previous_status = request.status;

            let updated =
                friend_requests::transition(conn, request.id, action.target_status(), now).await?;

            // A counter-request in the other direction follows the ledger:
            // accepted exactly when the pair are friends.
            if let Some(reverse) =
                friend_requests::find_directed(conn, &responder.id, &sender.id).await?
            {
                let follows = match action {
                    FriendAction::Accept => reverse.status != FriendRequestStatus::Accepted,
                    FriendAction::Reject => reverse.status == FriendRequestStatus::Accepted,
                };
                if follows {
                    friend_requests::transition(conn, reverse.id, action.target_status(), now)
                        .await?;
                }
            }

            let friendship_result = match action {
                FriendAction::Accept => match friendships::add(conn, &responder, &sender, now).await
                {
                    Ok(_) => FriendshipResult::Added,
                    Err(LedgerError::AlreadyExists { .. }) => FriendshipResult::AlreadyExists,
                    Err(LedgerError::Store(error)) => return Err(error),
                },
                FriendAction::Reject => {
                    if friendships::remove(conn, &responder.id, &sender.id).await? {
                        FriendshipResult::Removed
                    } else {
                        FriendshipResult::None
                    }
                }
            };

            let your_friends_count = friendships::count_for(conn, &responder.id).await?;
            let their_friends_count = friendships::count_for(conn, &sender.id).await?;

            Ok(RespondOutcome {
                request_id: updated.id,
                friend_username: sender.handle.clone(),
                action,
                previous_status,
                new_status: updated.status,
                friendship_changed: matches!(
                    friendship_result,
                    FriendshipResult::Added | FriendshipResult::Removed
                ),
                friendship_result,
                message: respond_message(&sender.handle, previous_status, action),
                your_friends_count,
                their_friends_count,
            })
        }
        .await;

        let outcome = tx.finish(result).await?;

        tracing::info!(
            request_id = outcome.request_id,
            responder = %responder.id,
            sender = %sender.id,
            action = outcome.action.as_str(),
            previous_status = %outcome.previous_status,
            "Friend request answered"
        );

        Ok(outcome)
    }

    /// Pending requests addressed to `user` and every request `user` sent
    pub async fn list_requests(&self, user: &Identity) -> Result<RequestListing, AppError> {
        let mut conn = self.db.acquire().await?;
        let received = friend_requests::find_incoming_pending(&mut conn, &user.id).await?;
        let sent = friend_requests::find_by_sender(&mut conn, &user.id).await?;

        Ok(RequestListing {
            total_received: received.len(),
            total_sent: sent.len(),
            received,
            sent,
        })
    }

    /// Confirmed friends of `user`, newest friendship first
    pub async fn list_friends(&self, user: &Identity) -> Result<FriendListing, AppError> {
        let user = self.resolve_caller(user).await?;
        let mut conn = self.db.acquire().await?;
        let friends = friendships::list_for(&mut conn, &user.id).await?;

        Ok(FriendListing {
            total_friends: friends.len(),
            user_id: user.id,
            username: user.handle,
            friends,
        })
    }
}
