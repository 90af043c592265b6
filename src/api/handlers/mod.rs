//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Homework, quiz and attendance handlers.
pub mod assignments;
/// Authentication handlers (register, login, refresh).
pub mod auth;
/// Groups, their students and co-teachers.
pub mod groups;
/// Submission handlers.
pub mod submissions;
/// Account handlers for the authenticated user.
pub mod users;
