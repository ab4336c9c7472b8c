use crate::domain::entities::UserId;

/// What a READY hands us that outlives a single websocket.
#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    session_id: Option<String>,
    resume_gateway_url: Option<String>,
    sequence: Option<u64>,
    bot_user: Option<UserId>,
}

impl SessionInfo {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session_id: None,
            resume_gateway_url: None,
            sequence: None,
            bot_user: None,
        }
    }

    pub fn record_ready(&mut self, session_id: String, resume_url: Option<String>, bot_user: UserId) {
        self.session_id = Some(session_id);
        self.resume_gateway_url = resume_url;
        self.bot_user = Some(bot_user);
    }

    /// Keeps the highest dispatch sequence seen.
    pub fn observe_sequence(&mut self, sequence: Option<u64>) {
        if let Some(seq) = sequence {
            self.sequence = Some(self.sequence.map_or(seq, |current| current.max(seq)));
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    #[must_use]
    pub fn resume_gateway_url(&self) -> Option<&str> {
        self.resume_gateway_url.as_deref()
    }

    #[must_use]
    pub const fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    #[must_use]
    pub const fn bot_user(&self) -> Option<UserId> {
        self.bot_user
    }

    #[must_use]
    pub const fn can_resume(&self) -> bool {
        self.session_id.is_some() && self.sequence.is_some()
    }

    /// Forgets the session so the next connection identifies from scratch.
    pub fn invalidate(&mut self) {
        self.session_id = None;
        self.resume_gateway_url = None;
        self.sequence = None;
    }
}
