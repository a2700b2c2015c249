use displaydoc::Display;

/// Any error which can occur while constructing or joining a synchronization primitive.
///
/// Once constructed, none of the primitives in this crate fail at run time: an operation either
/// eventually proceeds or, if a caller broke the enter/exit protocol, waits forever.
#[derive(Debug, Display, Eq, PartialEq)]
pub enum Error {
    /// A participant count of {0} was requested, but at least one participant is required.
    InvalidParticipantCount(usize),

    /// A semaphore's initial count must not be negative, but {0} was requested.
    NegativeInitialCount(isize),

    /// All {0} participant ids of the coordinator are already reserved.
    NoParticipantIdAvailable(usize),
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// All {participants} participant slots of the coordinator are already in use.
#[derive(Debug, Display, Eq, PartialEq)]
pub(crate) struct NoParticipantIdAvailableError {
    pub(crate) participants: usize,
}

impl From<NoParticipantIdAvailableError> for Error {
    fn from(error: NoParticipantIdAvailableError) -> Self {
        Error::NoParticipantIdAvailable(error.participants)
    }
}

/// Reject a participant count which cannot back any primitive.
pub(crate) fn check_participants(participants: usize) -> Result<usize, Error> {
    if participants == 0 {
        return Err(Error::InvalidParticipantCount(participants));
    }
    Ok(participants)
}
