//! Task id generation.

use uuid::Uuid;

/// Generates unique task identifiers of the form `task-<uuid-v4>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh task id.
    #[must_use]
    pub fn generate_task_id(&self) -> String {
        format!("task-{}", Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let generator = IdGenerator::new();
        let a = generator.generate_task_id();
        let b = generator.generate_task_id();
        assert!(a.starts_with("task-"));
        assert_ne!(a, b);
    }
}
