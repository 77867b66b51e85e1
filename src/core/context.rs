//! Read-only context handed to guards and transition actions.

/// Information about the event currently being dispatched.
///
/// Borrowed for the duration of a single guard or action invocation.
/// `source` is the originating state — the current leaf at the time the
/// event was fired, which may lie below the state that declared the
/// matched transition when the event bubbled up.
pub struct TransitionContext<'a, S, E, A> {
    event: &'a E,
    argument: Option<&'a A>,
    source: &'a S,
}

impl<'a, S, E, A> TransitionContext<'a, S, E, A> {
    pub(crate) fn new(event: &'a E, argument: Option<&'a A>, source: &'a S) -> Self {
        Self {
            event,
            argument,
            source,
        }
    }

    /// The event being dispatched.
    pub fn event(&self) -> &E {
        self.event
    }

    /// The argument the event was fired with, if any.
    pub fn argument(&self) -> Option<&A> {
        self.argument
    }

    /// The state the event originated in.
    pub fn source(&self) -> &S {
        self.source
    }
}

/// An event plus its argument, as held on the runner's queue.
///
/// The argument is reference-counted so that queue consumers and
/// extension callbacks can observe it without cloning the user value.
pub(crate) struct EventInfo<E, A> {
    pub(crate) event: E,
    pub(crate) argument: Option<std::sync::Arc<A>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_exposes_event_argument_and_source() {
        let ctx: TransitionContext<'_, &str, &str, u32> =
            TransitionContext::new(&"toggle", Some(&7), &"off");

        assert_eq!(*ctx.event(), "toggle");
        assert_eq!(ctx.argument(), Some(&7));
        assert_eq!(*ctx.source(), "off");
    }

    #[test]
    fn argument_is_optional() {
        let ctx: TransitionContext<'_, &str, &str, u32> =
            TransitionContext::new(&"toggle", None, &"off");

        assert!(ctx.argument().is_none());
    }
}
