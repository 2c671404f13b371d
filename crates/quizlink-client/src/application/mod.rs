//! Application layer for quizlink-client.
//!
//! One use case: observe the channel.  [`QuizChannel`] is the subscriber
//! facade UI state bindings hold; it turns the dispatcher's event stream into
//! stable current-value views and forwards commands to the connection layer.

pub mod channel;

pub use channel::QuizChannel;
