//! Following soft and external links.

use exdir_store::Link;
use exdir_types::ErrorKind;
use tracing::debug;

use crate::error::{ExdirError, Result};
use crate::group::Group;
use crate::node::Node;

/// Links followed in a single lookup before giving up.
pub const MAX_LINK_HOPS: usize = 32;

/// Resolve `link`, stored in `holder`, to the object it points at.
///
/// Absolute targets start at the root of the file holding the target;
/// relative targets start at `holder`. Every failure along the way,
/// including a link chain longer than [`MAX_LINK_HOPS`], reads as
/// `NotFound`.
pub(crate) fn follow(holder: &Group, link: &Link, hops: usize) -> Result<Node> {
    if hops > MAX_LINK_HOPS {
        return Err(ExdirError::not_found(format!(
            "{link} (more than {MAX_LINK_HOPS} links)"
        )));
    }
    debug!(holder = %holder.name(), %link, hops, "following link");
    match link {
        Link::Soft { target } => holder.resolve(target, hops),
        Link::External { file, target } => {
            let external = holder
                .core()
                .external(file)
                .map_err(|e| ExdirError::not_found(format!("{file}: {e}")))?;
            external.resolve(target, hops).map_err(|e| match e.kind() {
                ErrorKind::NotFound => e,
                _ => ExdirError::not_found(format!("{file}:{target}: {e}")),
            })
        }
    }
}
