//! Tag assignment for struct fields, union variants, interface methods and
//! module members.
//!
//! An explicit tag wins. An implicit tag is the previous member's tag plus
//! one, starting at 1, stepping over reserved tags. Any tag handed out twice
//! is a collision, whichever of the two members was explicit.

use std::collections::{BTreeSet, HashMap};

use crate::error::ResolveError;

const RESERVED: &str = "<reserved>";

pub(crate) struct TagAllocator<'a> {
    owner: &'a str,
    reserved: BTreeSet<u16>,
    used: HashMap<u16, String>,
    last: u16,
}

impl<'a> TagAllocator<'a> {
    pub(crate) fn new(owner: &'a str, reserved: &[u16]) -> Self {
        Self {
            owner,
            reserved: reserved.iter().copied().collect(),
            used: HashMap::new(),
            last: 0,
        }
    }

    /// Assign the tag for the next member in declaration order.
    pub(crate) fn assign(
        &mut self,
        member: &str,
        explicit: Option<u16>,
    ) -> Result<u16, ResolveError> {
        let tag = match explicit {
            Some(0) => return Err(self.invalid(member, 0)),
            Some(tag) => {
                if self.reserved.contains(&tag) {
                    return Err(self.collision(tag, RESERVED, member));
                }
                tag
            }
            None => {
                let mut next = u32::from(self.last) + 1;
                while let Ok(candidate) = u16::try_from(next) {
                    if !self.reserved.contains(&candidate) {
                        break;
                    }
                    next += 1;
                }
                u16::try_from(next).map_err(|_| self.invalid(member, next))?
            }
        };

        if let Some(first) = self.used.get(&tag) {
            return Err(self.collision(tag, first, member));
        }
        self.used.insert(tag, member.to_string());
        self.last = tag;
        Ok(tag)
    }

    fn invalid(&self, member: &str, tag: u32) -> ResolveError {
        ResolveError::InvalidTag {
            owner: self.owner.to_string(),
            member: member.to_string(),
            tag,
        }
    }

    fn collision(&self, tag: u16, first: &str, second: &str) -> ResolveError {
        ResolveError::TagCollision {
            owner: self.owner.to_string(),
            tag,
            first: first.to_string(),
            second: second.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign_all(
        reserved: &[u16],
        members: &[(&str, Option<u16>)],
    ) -> Result<Vec<u16>, ResolveError> {
        let mut alloc = TagAllocator::new("T", reserved);
        members
            .iter()
            .map(|(name, tag)| alloc.assign(name, *tag))
            .collect()
    }

    #[test]
    fn test_implicit_tags_follow_declaration_order() {
        let tags = assign_all(&[], &[("a", None), ("b", None), ("c", None)]).unwrap();
        assert_eq!(tags, vec![1, 2, 3]);
    }

    #[test]
    fn test_implicit_tags_continue_after_explicit() {
        let tags = assign_all(&[], &[("a", None), ("b", Some(10)), ("c", None)]).unwrap();
        assert_eq!(tags, vec![1, 10, 11]);
    }

    #[test]
    fn test_gaps_before_explicit_tags_are_not_filled() {
        let tags = assign_all(&[], &[("a", Some(5)), ("b", None)]).unwrap();
        assert_eq!(tags, vec![5, 6]);
    }

    #[test]
    fn test_implicit_tag_follows_previous_member() {
        let tags = assign_all(&[], &[("a", Some(5)), ("b", Some(2)), ("c", None)]).unwrap();
        assert_eq!(tags, vec![5, 2, 3]);
    }

    #[test]
    fn test_reserved_tags_are_skipped() {
        let tags = assign_all(&[2, 3], &[("a", None), ("b", None)]).unwrap();
        assert_eq!(tags, vec![1, 4]);
    }

    #[test]
    fn test_explicit_reuse_by_later_implicit_collides() {
        let err = assign_all(&[], &[("a", Some(2)), ("b", Some(1)), ("c", None)]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::TagCollision {
                owner: "T".into(),
                tag: 2,
                first: "a".into(),
                second: "c".into(),
            }
        );
    }

    #[test]
    fn test_explicit_reserved_tag_collides() {
        let err = assign_all(&[4], &[("a", Some(4))]).unwrap_err();
        assert!(matches!(err, ResolveError::TagCollision { tag: 4, .. }));
    }

    #[test]
    fn test_tag_zero_is_invalid() {
        let err = assign_all(&[], &[("a", Some(0))]).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidTag { tag: 0, .. }));
    }

    #[test]
    fn test_implicit_overflow_is_invalid() {
        let err = assign_all(&[], &[("a", Some(u16::MAX)), ("b", None)]).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidTag { tag: 65536, .. }));
    }
}
