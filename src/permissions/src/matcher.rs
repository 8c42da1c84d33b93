//! Wildcard matching between granted and requested permissions
//!
//! Wildcards are explicit and live only on the granted side. A granted
//! permission covers a requested one when:
//!
//! - both have the same length and every position is equal, or the granted
//!   position is `*`;
//! - the granted permission is longer, the shared prefix is exactly equal,
//!   and every extra granted position is `*` (`user:*` covers `user`);
//! - never when the granted permission is shorter (`user` does not cover
//!   `user:add`).

use crate::grammar::WILDCARD;

/// Decides whether `granted` segments satisfy `requested` segments
///
/// # Examples
///
/// ```
/// use cretoai_permissions::matcher::matches;
///
/// assert!(matches(&["user", "*"], &["user"]));
/// assert!(matches(&["user", "*"], &["user", "add"]));
/// assert!(!matches(&["user"], &["user", "add"]));
/// ```
pub fn matches<G, R>(granted: &[G], requested: &[R]) -> bool
where
    G: AsRef<str>,
    R: AsRef<str>,
{
    if granted.len() < requested.len() {
        return false;
    }

    if granted.len() == requested.len() {
        return granted
            .iter()
            .zip(requested)
            .all(|(g, r)| g.as_ref() == WILDCARD || g.as_ref() == r.as_ref());
    }

    let (prefix, tail) = granted.split_at(requested.len());
    prefix.iter().zip(requested).all(|(g, r)| g.as_ref() == r.as_ref())
        && tail.iter().all(|g| g.as_ref() == WILDCARD)
}
