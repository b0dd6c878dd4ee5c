//! Behavioural tests for the watcher components.

mod tracker_tests;
