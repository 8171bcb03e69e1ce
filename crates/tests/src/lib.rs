//! Cross-crate integration tests for the Contour signal path

#[cfg(test)]
mod pipeline_integration;
