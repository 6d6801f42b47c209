use serde::{Deserialize, Serialize};

/// An audit-trail entry recording what happened during a traversal.
///
/// Every message names its `source` (the node that produced it, or one of
/// the well-known constants on [`Message`]) and carries free-form text
/// content. The engine only ever appends messages; nothing in a traversal
/// can rewrite history.
///
/// # Examples
///
/// ## Basic Construction
/// ```
/// use taskloom::message::Message;
///
/// // Manual construction
/// let message = Message {
///     source: Message::ENGINE.to_string(),
///     content: "task started".to_string(),
/// };
///
/// // Using convenience constructors
/// let node_msg = Message::new("validate", "payload accepted");
/// let engine_msg = Message::engine("checkpoint saved");
/// let human_msg = Message::human("approved");
/// ```
///
/// # Serialization
///
/// Messages implement `Serialize` and `Deserialize` for checkpoint storage:
/// ```
/// use taskloom::message::Message;
///
/// let msg = Message::engine("test");
/// let json = serde_json::to_string(&msg).unwrap();
/// let parsed: Message = serde_json::from_str(&json).unwrap();
/// assert_eq!(msg, parsed);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Which node (or engine/human actor) produced this entry.
    ///
    /// Use the constants on [`Message`] for the non-node sources.
    pub source: String,
    /// The text content of the entry.
    pub content: String,
}

impl Message {
    /// Source for entries written by the engine itself.
    pub const ENGINE: &'static str = "engine";
    /// Source for entries originating from a human decision.
    pub const HUMAN: &'static str = "human";

    /// Creates a new message with the specified source and content.
    ///
    /// # Examples
    /// ```
    /// use taskloom::message::Message;
    ///
    /// let msg = Message::new("generate", "draft produced");
    /// assert_eq!(msg.source, "generate");
    /// assert_eq!(msg.content, "draft produced");
    /// ```
    #[must_use]
    pub fn new(source: &str, content: &str) -> Self {
        Self {
            source: source.to_string(),
            content: content.to_string(),
        }
    }

    /// Creates an engine-sourced message.
    ///
    /// # Examples
    /// ```
    /// use taskloom::message::Message;
    ///
    /// let msg = Message::engine("routing to fix");
    /// assert_eq!(msg.source, "engine");
    /// ```
    #[must_use]
    pub fn engine(content: &str) -> Self {
        Self::new(Self::ENGINE, content)
    }

    /// Creates a human-sourced message.
    ///
    /// # Examples
    /// ```
    /// use taskloom::message::Message;
    ///
    /// let msg = Message::human("approved");
    /// assert_eq!(msg.source, "human");
    /// ```
    #[must_use]
    pub fn human(content: &str) -> Self {
        Self::new(Self::HUMAN, content)
    }

    /// Returns true if this message came from the specified source.
    ///
    /// # Examples
    /// ```
    /// use taskloom::message::Message;
    ///
    /// let msg = Message::engine("hello");
    /// assert!(msg.has_source(Message::ENGINE));
    /// assert!(!msg.has_source("validate"));
    /// ```
    #[must_use]
    pub fn has_source(&self, source: &str) -> bool {
        self.source == source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// Verifies that a Message struct can be constructed and its fields are set correctly.
    fn test_message_construction() {
        let msg = Message {
            source: "validate".to_string(),
            content: "hello".to_string(),
        };
        assert_eq!(msg.source, "validate");
        assert_eq!(msg.content, "hello");
    }

    #[test]
    /// Checks that cloning a Message produces an identical copy, and modifying the clone does not affect the original.
    fn test_message_cloning() {
        let msg1 = Message::engine("foo");
        let msg2 = msg1.clone();
        assert_eq!(msg1, msg2);
        let mut msg2 = msg2;
        msg2.content = "bar".to_string();
        assert_ne!(msg1, msg2);
    }

    #[test]
    /// Tests convenience constructors for common message sources.
    fn test_convenience_constructors() {
        let engine_msg = Message::engine("checkpoint saved");
        assert_eq!(engine_msg.source, Message::ENGINE);
        assert_eq!(engine_msg.content, "checkpoint saved");

        let human_msg = Message::human("rejected");
        assert_eq!(human_msg.source, Message::HUMAN);

        let node_msg = Message::new("generate", "result: 42");
        assert_eq!(node_msg.source, "generate");
        assert_eq!(node_msg.content, "result: 42");
    }

    #[test]
    /// Tests source checking against constants and node names.
    fn test_source_checking() {
        let engine_msg = Message::engine("hi");
        assert!(engine_msg.has_source(Message::ENGINE));
        assert!(!engine_msg.has_source(Message::HUMAN));

        let node_msg = Message::new("fix", "retrying");
        assert!(node_msg.has_source("fix"));
        assert!(!node_msg.has_source(Message::ENGINE));
    }

    #[test]
    /// Tests serialization and deserialization.
    fn test_serialization() {
        let original = Message::new("validate", "payload ok");
        let json = serde_json::to_string(&original).expect("Serialization failed");
        let deserialized: Message = serde_json::from_str(&json).expect("Deserialization failed");

        assert_eq!(original, deserialized);
        assert_eq!(deserialized.source, "validate");
        assert_eq!(deserialized.content, "payload ok");
    }
}
