//! Clause categorization: prompt construction, the provider call and the
//! tolerant recovery of structured clause lists from free-text replies.

pub mod clause;
pub mod extract;
pub mod literal;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod request;
