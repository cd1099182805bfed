//! The per-mount state machine and its transition table.

/// Lifecycle of one mounted conversation view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Choosing between cache, server snapshot and a resumed stream.
    Hydrating,
    /// Stable sequence, ready for a new turn.
    Live,
    /// User message appended, waiting for the first event.
    Submitting,
    /// Events are being folded into the trailing assistant message.
    Streaming,
    /// The last turn failed. Partial output is kept.
    Errored,
}

/// What the outside world sees of the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Submitted,
    Streaming,
    Error,
}

impl Status {
    /// A new turn may start. A failed turn leaves the conversation usable.
    pub fn accepts_submit(self) -> bool {
        matches!(self, Status::Ready | Status::Error)
    }
}

/// Everything that can move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Hydrated,
    HydratedResuming,
    Submit,
    /// A text delta or file part.
    Content,
    Usage,
    Done,
    Failed,
    Cancel,
    LocalEdit,
    Remount,
}

impl Phase {
    pub fn status(self) -> Status {
        match self {
            Phase::Hydrating | Phase::Live => Status::Ready,
            Phase::Submitting => Status::Submitted,
            Phase::Streaming => Status::Streaming,
            Phase::Errored => Status::Error,
        }
    }

    /// The phase reached by applying `input`, or `None` when the pair is not
    /// in the table. Callers log and ignore rejected inputs.
    pub fn next(self, input: Input) -> Option<Phase> {
        use Input as I;
        use Phase as P;

        match (self, input) {
            (_, I::Remount) => Some(P::Hydrating),
            (P::Hydrating, I::Hydrated) => Some(P::Live),
            (P::Hydrating, I::HydratedResuming) => Some(P::Streaming),
            (P::Live | P::Errored, I::Submit) => Some(P::Submitting),
            (P::Submitting | P::Streaming, I::Content | I::Usage) => Some(P::Streaming),
            (P::Submitting | P::Streaming, I::Done) => Some(P::Live),
            (P::Submitting | P::Streaming, I::Failed) => Some(P::Errored),
            (P::Submitting | P::Streaming, I::Cancel) => Some(P::Live),
            (P::Live | P::Errored, I::LocalEdit) => Some(self),
            _ => None,
        }
    }
}
