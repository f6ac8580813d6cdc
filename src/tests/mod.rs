//! Cross-module flow tests
