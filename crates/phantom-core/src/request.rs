use phantom_types::models::{Message, MessageKind, RequestStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn status(self) -> RequestStatus {
        match self {
            Self::Accept => RequestStatus::Accepted,
            Self::Reject => RequestStatus::Rejected,
        }
    }
}

/// What a request bubble shows to a given viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestView {
    /// Receiver, still pending: accept and reject buttons.
    Actions,
    /// Receiver, already answered.
    Answered(RequestStatus),
    /// Sender: a status label only.
    Status(RequestStatus),
}

impl RequestView {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Actions => "Decline | Accept",
            Self::Answered(RequestStatus::Accepted) => "Permission granted",
            Self::Answered(RequestStatus::Rejected) => "Permission denied",
            Self::Answered(RequestStatus::Pending) => "Decline | Accept",
            Self::Status(RequestStatus::Pending) => "Waiting for a reply...",
            Self::Status(RequestStatus::Accepted) => "Request accepted",
            Self::Status(RequestStatus::Rejected) => "Request declined",
        }
    }
}

pub fn request_view(message: &Message, viewer_id: &str) -> Option<RequestView> {
    let status = message.request_status()?;
    if message.is_own(viewer_id) {
        return Some(RequestView::Status(status));
    }
    Some(match status {
        RequestStatus::Pending => RequestView::Actions,
        decided => RequestView::Answered(decided),
    })
}

/// Apply the receiver's decision. Only the receiver may answer and only once;
/// anything else returns `None` and changes nothing.
pub fn respond(message: &mut Message, viewer_id: &str, decision: Decision) -> Option<RequestStatus> {
    if message.is_own(viewer_id) || message.receiver_id != viewer_id {
        return None;
    }
    let MessageKind::Request { metadata } = &mut message.kind else {
        return None;
    };
    if metadata.status != RequestStatus::Pending {
        return None;
    }
    metadata.status = decision.status();
    Some(metadata.status)
}

/// Adopt a status observed remotely (e.g. by polling). A decided request never
/// goes back to pending or flips to the other decision.
pub fn sync_status(message: &mut Message, remote: RequestStatus) -> bool {
    let MessageKind::Request { metadata } = &mut message.kind else {
        return false;
    };
    if metadata.status != RequestStatus::Pending || remote == RequestStatus::Pending {
        return false;
    }
    metadata.status = remote;
    true
}
