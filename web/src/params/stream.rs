use serde::Deserialize;
use sse::Framing;
use std::collections::HashMap;

/// Query parameters of the event stream endpoint.
///
/// Only the presence of `raw` matters: `?raw`, `?raw=1` and `?raw=false` all
/// select raw framing. Unknown parameters are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub(crate) struct StreamParams(HashMap<String, String>);

impl StreamParams {
    pub(crate) fn raw(&self) -> bool {
        self.0.contains_key("raw")
    }

    pub(crate) fn framing(&self) -> Framing {
        Framing::from_raw_flag(self.raw())
    }
}
