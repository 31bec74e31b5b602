use crate::mint::mint_encoded;
use thrum_types::{EventId, GroupId, MessageId, SessionId, SessionToken, ThreadId};

/// Mint a fresh, time-ordered `EventId`.
pub fn new_event_id() -> EventId {
    EventId::from_raw(format!("{}{}", EventId::PREFIX, mint_encoded()))
}

pub fn new_message_id() -> MessageId {
    MessageId::from_raw(format!("{}{}", MessageId::PREFIX, mint_encoded()))
}

pub fn new_session_id() -> SessionId {
    SessionId::from_raw(format!("{}{}", SessionId::PREFIX, mint_encoded()))
}

pub fn new_thread_id() -> ThreadId {
    ThreadId::from_raw(format!("{}{}", ThreadId::PREFIX, mint_encoded()))
}

pub fn new_group_id() -> GroupId {
    GroupId::from_raw(format!("{}{}", GroupId::PREFIX, mint_encoded()))
}

pub fn new_session_token() -> SessionToken {
    SessionToken::from_raw(format!("{}{}", SessionToken::PREFIX, mint_encoded()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_the_expected_prefix() {
        assert!(new_event_id().as_str().starts_with("evt_"));
        assert!(new_message_id().as_str().starts_with("msg_"));
        assert!(new_session_id().as_str().starts_with("ses_"));
    }

    #[test]
    fn successive_ids_sort_after_each_other() {
        let a = new_message_id();
        let b = new_message_id();
        assert!(b.as_str() > a.as_str());
    }
}
