//! This module holds typed parameters for endpoint inputs.

pub(crate) mod stream;
