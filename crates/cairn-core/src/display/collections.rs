//! Collection wrapper types for displaying groups of domain objects.

use std::fmt;

use crate::models::Step;

/// Newtype wrapper for displaying a list of steps.
///
/// Formats each step with its own `Display` implementation and handles the
/// empty list.
pub struct Steps(pub Vec<Step>);

impl fmt::Display for Steps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No steps found.")
        } else {
            for step in &self.0 {
                write!(f, "{step}")?;
            }
            Ok(())
        }
    }
}
