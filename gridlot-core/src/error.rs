use gridlot_catalog::Tier;

/// Business-level failure taxonomy shared by every service. Repository
/// traits return boxed errors; services fold those into `Store`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("tier {0} is closed for new reservations")]
    TierClosed(Tier),

    #[error("slot already has a pending or active booking for that window")]
    SlotConflict,

    #[error("buyer already has a pending offer on this slot")]
    DuplicateOffer,

    #[error("target booking is not active")]
    BookingNotActive,

    #[error("not allowed to act on this resource")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("already in the requested state")]
    AlreadyResolved,

    #[error("payment provider error: {0}")]
    UpstreamPayment(String),

    #[error("storage error: {0}")]
    Store(String),
}

impl CoreError {
    pub fn store(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Store(err.to_string())
    }

    /// Idempotency-guard misses signal "already in the desired state" and
    /// are not protocol errors; callers may treat them as success.
    pub fn is_noop(&self) -> bool {
        matches!(self, CoreError::AlreadyResolved)
    }

    /// Terminal business-rule violations are surfaced to the caller and
    /// never retried by the core itself.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_)
                | CoreError::TierClosed(_)
                | CoreError::SlotConflict
                | CoreError::DuplicateOffer
                | CoreError::BookingNotActive
                | CoreError::Unauthorized
        )
    }
}
