//! HTTP request handlers.

pub(crate) mod convert;
pub(crate) mod health;
pub(crate) mod templates;

#[cfg(test)]
pub(crate) mod test_support;
