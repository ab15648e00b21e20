//! Values returned from `main` state handlers.

use std::borrow::Cow;

use crate::state::StateName;

/// One opaque token carried by a [`Signal`].
pub type Token = Cow<'static, str>;

/// Values a state handler passes back to its caller instead of (or alongside)
/// a transition.
///
/// Tokens that name a handled state of the machine interpreting the signal
/// become transition requests; everything else bubbles out unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signal(Vec<Token>);

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Token>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    pub fn push(&mut self, token: impl Into<Token>) {
        self.0.push(token.into());
    }

    /// Append every token of `other`, keeping order.
    pub fn extend(&mut self, other: Signal) {
        self.0.extend(other.0);
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.0
    }

    /// `None` for an empty signal, so callers never see a signal with nothing in it.
    pub fn non_empty(self) -> Option<Signal> {
        if self.is_empty() { None } else { Some(self) }
    }
}

impl From<&'static str> for Signal {
    fn from(token: &'static str) -> Self {
        Self(vec![Cow::Borrowed(token)])
    }
}

impl From<String> for Signal {
    fn from(token: String) -> Self {
        Self(vec![Cow::Owned(token)])
    }
}

impl FromIterator<Token> for Signal {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What a `main` handler asks the machine to do next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Outcome {
    /// Stay in the current state; clears any pending transition.
    #[default]
    Stay,
    /// Transition to a state. A name the machine does not handle is
    /// returned to the caller as a signal instead.
    Goto(StateName),
    /// Transition to a state and pass the signal back to the caller.
    GotoWith(StateName, Signal),
    /// Pass values back to the caller. Exactly one token may name a handled
    /// state, in which case it becomes the transition request.
    Signal(Signal),
}

impl Outcome {
    /// Flatten the outcome into the token list the machine partitions.
    pub(crate) fn into_tokens(self) -> Vec<Token> {
        match self {
            Outcome::Stay => Vec::new(),
            Outcome::Goto(state) => vec![Cow::Borrowed(state)],
            Outcome::GotoWith(state, signal) => {
                let mut tokens = Vec::with_capacity(signal.len() + 1);
                tokens.push(Cow::Borrowed(state));
                tokens.extend(signal.into_tokens());
                tokens
            }
            Outcome::Signal(signal) => signal.into_tokens(),
        }
    }
}

impl From<StateName> for Outcome {
    fn from(state: StateName) -> Self {
        Outcome::Goto(state)
    }
}

impl From<Signal> for Outcome {
    fn from(signal: Signal) -> Self {
        Outcome::Signal(signal)
    }
}
