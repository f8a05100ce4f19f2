//! Pattern evaluator tests
//!
//! Behavioural tests for binding templates as device integrations use them.
