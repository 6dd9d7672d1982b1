//! Integration tests for Layer 3: the end-to-end execution driver.

mod concurrency;
mod driver;
mod isolation;
