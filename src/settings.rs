//! Settings adapter for the host application.
//!
//! The host owns the admin form and request handling; it hands raw list text
//! to these functions and gets sanitized lists back. Saving the htaccess list
//! also rewrites the `.htaccess` rule block.

use anyhow::Result;
use tracing::info;

use crate::config::{RuleList, RuleStore};
use crate::fs_abstraction::FileSystem;
use crate::htaccess::HtaccessFile;
use crate::sanitize::{sanitize, RuleListInput, RuleSet};

/// Sanitize `input`, mirror it into `.htaccess` if `list` requires it, and
/// store it.
///
/// The `.htaccess` block is written before the store is updated, so a failed
/// write leaves the stored list unchanged. An empty result leaves any existing
/// block in place.
pub fn sanitize_and_persist<S, F>(
    store: &mut S,
    list: RuleList,
    input: impl Into<RuleListInput>,
    htaccess: &HtaccessFile<F>,
) -> Result<RuleSet>
where
    S: RuleStore + ?Sized,
    F: FileSystem,
{
    let rules = sanitize(input);

    if list.is_mirrored_to_htaccess() {
        htaccess.apply_rules(&rules)?;
    }

    store.set_rules(list, rules.clone())?;
    info!(list = %list, rules = rules.len(), "Saved rule list");

    Ok(rules)
}

/// Text shown in the admin form for `list`: the rules joined by `", "`.
///
/// Feeding it back through [`sanitize_and_persist`] yields the same list.
pub fn form_value<S: RuleStore + ?Sized>(store: &S, list: RuleList) -> String {
    store.rules(list).to_strings().join(", ")
}

/// Clear every stored list, strip the rule block from `.htaccess` and delete
/// the lock file next to it.
pub fn uninstall<S, F>(store: &mut S, htaccess: &HtaccessFile<F>) -> Result<()>
where
    S: RuleStore + ?Sized,
    F: FileSystem,
{
    for list in RuleList::ALL {
        store.set_rules(list, RuleSet::new())?;
    }

    if htaccess.remove_rules()? {
        info!(path = ?htaccess.path(), "Removed rule block during uninstall");
    }
    htaccess.remove_lock_file()?;

    Ok(())
}
