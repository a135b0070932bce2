//! Logical channel identifier.

use std::fmt;
use std::sync::Arc;

/// Opaque identifier of a logical channel multiplexed over one physical connection.
///
/// Immutable and cheap to clone; used as the session registry key.
///
/// ```
/// use tether::Topic;
///
/// assert_eq!(Topic::default(), Topic::main());
/// assert_eq!(Topic::new("prices").as_str(), "prices");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(Arc<str>);

impl Topic {
    const MAIN: &'static str = "main";

    /// Creates a topic with the given id.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// The default topic used when a protocol carries a single channel.
    pub fn main() -> Self {
        Self(Arc::from(Self::MAIN))
    }

    /// Topic id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shared handle to the id (used as the event bus `topic` field).
    pub fn as_arc(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }
}

impl Default for Topic {
    fn default() -> Self {
        Self::main()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Topic {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}
