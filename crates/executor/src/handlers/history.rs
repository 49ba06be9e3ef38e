//! History command handler.

use std::sync::Arc;

use fabric_engine::{Fabric, HistoryFilter};
use fabric_security::CallerContext;

use crate::convert::convert_result;
use crate::{Output, Result};

/// Handle History command.
pub fn history(
    fabric: &Arc<Fabric>,
    caller: &CallerContext,
    filter: HistoryFilter,
    limit: usize,
) -> Result<Output> {
    let page = convert_result(fabric.get_history(caller, &filter, limit))?;
    Ok(Output::History(page))
}
