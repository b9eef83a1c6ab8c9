use crate::ChannelError;

/// State of a single-assignment future.
///
/// Created `Pending`; moves to `Resolved` or `Failed` exactly once and never
/// changes again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FutureState<T> {
    Pending,
    Resolved(T),
    Failed(ChannelError),
}

impl<T> Default for FutureState<T> {
    fn default() -> Self {
        FutureState::Pending
    }
}

impl<T> FutureState<T> {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, FutureState::Pending)
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, FutureState::Resolved(_))
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, FutureState::Failed(_))
    }

    /// The outcome, if terminal.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<T, ChannelError>>
    where
        T: Clone,
    {
        match self {
            FutureState::Pending => None,
            FutureState::Resolved(value) => Some(Ok(value.clone())),
            FutureState::Failed(err) => Some(Err(err.clone())),
        }
    }
}

impl<T> From<Result<T, ChannelError>> for FutureState<T> {
    fn from(result: Result<T, ChannelError>) -> Self {
        match result {
            Ok(value) => FutureState::Resolved(value),
            Err(err) => FutureState::Failed(err),
        }
    }
}
