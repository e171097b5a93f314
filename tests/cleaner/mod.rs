// Test module entry point for cleaner tests

mod support;

mod pipeline_tests;
mod filter_tests;
mod event_tests;
mod pattern_source_tests;
