mod classify_tests;
mod extract_tests;
