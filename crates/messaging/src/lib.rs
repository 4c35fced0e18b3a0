//! Messaging domain module: conversation threads between the client who
//! posted a find and a finder working on it.

pub mod thread;

pub use thread::{
    MessagePosted, PostMessage, StartThread, Thread, ThreadCommand, ThreadEvent, ThreadId,
    ThreadStarted,
};
